// ── Port discovery ──
//
// Resolves a device identity to its ordered port entities. Runs as a
// one-shot task; the card guards it with a latch and tags it with a
// configuration generation so superseded results are ignored.

use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::error::DiscoveryFailure;
use crate::host::DeviceDirectory;
use crate::integration::{CPU_SENTINEL, INTEGRATION_PLATFORM, SWITCH_DOMAIN};
use crate::model::{DeviceEntry, EntityEntry, EntityId, StateSnapshot};

/// Everything a discovery run needs, captured when it is started.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub generation: u64,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub snapshot: StateSnapshot,
}

/// Ordered port entities for one configuration generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    pub generation: u64,
    pub entity_ids: Vec<EntityId>,
}

/// Run discovery. Failures are logged and produce an empty result.
pub async fn discover<D: DeviceDirectory>(directory: &D, request: DiscoveryRequest) -> DiscoveryResult {
    let generation = request.generation;
    let entity_ids = match resolve(directory, &request).await {
        Ok(ids) => {
            info!(generation, ports = ids.len(), "port discovery finished");
            ids
        }
        Err(failure) => {
            warn!(generation, error = %failure, "port discovery failed");
            Vec::new()
        }
    };
    DiscoveryResult {
        generation,
        entity_ids,
    }
}

async fn resolve<D: DeviceDirectory>(
    directory: &D,
    request: &DiscoveryRequest,
) -> Result<Vec<EntityId>, DiscoveryFailure> {
    let device_id = match (&request.device_id, &request.device_name) {
        (Some(id), _) => id.clone(),
        (None, Some(name)) => {
            let devices = directory
                .list_devices()
                .await
                .map_err(DiscoveryFailure::DeviceQuery)?;
            let Some(id) = resolve_device_id(&devices, name) else {
                info!(device_name = %name, "no device matches the configured name");
                return Ok(Vec::new());
            };
            id.to_owned()
        }
        (None, None) => return Ok(Vec::new()),
    };

    let entities = directory
        .list_entities()
        .await
        .map_err(DiscoveryFailure::EntityQuery)?;
    let ids = select_candidates(&entities, &device_id, &request.snapshot);
    debug!(device_id = %device_id, candidates = ids.len(), "selected port entities");
    Ok(ids)
}

/// First device whose name or user-assigned name equals `name` exactly.
pub fn resolve_device_id<'a>(devices: &'a [DeviceEntry], name: &str) -> Option<&'a str> {
    devices
        .iter()
        .find(|device| device.matches_name(name))
        .map(|device| device.id.as_str())
}

/// Registry filter, state join, sentinel exclusion and ordering.
pub fn select_candidates(
    entities: &[EntityEntry],
    device_id: &str,
    snapshot: &StateSnapshot,
) -> Vec<EntityId> {
    let mut candidates: Vec<(EntityId, Option<f64>)> = entities
        .iter()
        .filter(|entry| entry.device_id.as_deref() == Some(device_id))
        .filter(|entry| entry.platform == INTEGRATION_PLATFORM)
        .filter(|entry| entry.entity_id.domain() == Some(SWITCH_DOMAIN))
        .filter_map(|entry| {
            let state = snapshot.get(entry.entity_id.as_str())?;
            let is_cpu = state
                .interface_name()
                .is_some_and(|name| name.trim().eq_ignore_ascii_case(CPU_SENTINEL));
            (!is_cpu).then(|| (entry.entity_id.clone(), state.port_index()))
        })
        .collect();

    candidates.sort_by(|(a_id, a_idx), (b_id, b_idx)| compare_ports((a_id, *a_idx), (b_id, *b_idx)));
    candidates.into_iter().map(|(id, _)| id).collect()
}

/// Total order over `(entity id, numeric index)`.
///
/// Two indexed ports compare by index, ties by id. Indexed ports sort
/// before unindexed ones. Two unindexed ports compare by id.
///
/// On mixed input this departs from a pairwise "lexical unless both are
/// indexed" rule, which is not transitive: an indexed port never sorts
/// after an unindexed one, whatever their ids.
pub fn compare_ports(a: (&EntityId, Option<f64>), b: (&EntityId, Option<f64>)) -> Ordering {
    match (a.1, b.1) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.0.cmp(b.0)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.0.cmp(b.0),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::CoreError;
    use crate::model::EntityState;
    use pretty_assertions::assert_eq;

    // ── Fakes ────────────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeDirectory {
        devices: Vec<DeviceEntry>,
        entities: Vec<EntityEntry>,
        fail_entities: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl DeviceDirectory for FakeDirectory {
        async fn list_devices(&self) -> Result<Vec<DeviceEntry>, CoreError> {
            self.calls.lock().unwrap().push("devices");
            Ok(self.devices.clone())
        }

        async fn list_entities(&self) -> Result<Vec<EntityEntry>, CoreError> {
            self.calls.lock().unwrap().push("entities");
            if self.fail_entities {
                return Err(CoreError::Disconnected);
            }
            Ok(self.entities.clone())
        }
    }

    fn device(id: &str, name: &str) -> DeviceEntry {
        DeviceEntry {
            id: id.into(),
            name: Some(name.into()),
            name_by_user: None,
        }
    }

    fn port_entity(id: &str, device: &str) -> EntityEntry {
        EntityEntry {
            entity_id: EntityId::from(id),
            device_id: Some(device.into()),
            platform: INTEGRATION_PLATFORM.into(),
        }
    }

    fn snapshot(entries: &[(&str, Option<i64>, Option<&str>)]) -> StateSnapshot {
        entries
            .iter()
            .map(|(id, index, name)| {
                let mut state = EntityState::new("on");
                if let Some(index) = index {
                    state = state.with_attribute("Index", *index);
                }
                if let Some(name) = name {
                    state = state.with_attribute("Name", *name);
                }
                (EntityId::from(*id), state)
            })
            .collect()
    }

    fn ids(result: &[EntityId]) -> Vec<&str> {
        result.iter().map(EntityId::as_str).collect()
    }

    // ── Pure helpers ─────────────────────────────────────────────────

    #[test]
    fn orders_by_numeric_index() {
        let entities = vec![
            port_entity("switch.c", "d1"),
            port_entity("switch.a", "d1"),
            port_entity("switch.b", "d1"),
        ];
        let snap = snapshot(&[
            ("switch.c", Some(3), None),
            ("switch.a", Some(1), None),
            ("switch.b", Some(2), None),
        ]);
        let result = select_candidates(&entities, "d1", &snap);
        assert_eq!(ids(&result), ["switch.a", "switch.b", "switch.c"]);
    }

    #[test]
    fn index_beats_lexical_order() {
        let entities = vec![port_entity("switch.a", "d1"), port_entity("switch.b", "d1")];
        let snap = snapshot(&[("switch.a", Some(10), None), ("switch.b", Some(2), None)]);
        assert_eq!(ids(&select_candidates(&entities, "d1", &snap)), ["switch.b", "switch.a"]);
    }

    #[test]
    fn orders_lexically_without_index() {
        let entities = vec![
            port_entity("switch.port_b", "d1"),
            port_entity("switch.port_a", "d1"),
            port_entity("switch.port_c", "d1"),
        ];
        let snap = snapshot(&[
            ("switch.port_b", None, None),
            ("switch.port_a", None, None),
            ("switch.port_c", None, None),
        ]);
        let result = select_candidates(&entities, "d1", &snap);
        assert_eq!(ids(&result), ["switch.port_a", "switch.port_b", "switch.port_c"]);
    }

    #[test]
    fn mixed_input_is_deterministic() {
        let entities = vec![
            port_entity("switch.z", "d1"),
            port_entity("switch.m", "d1"),
            port_entity("switch.a", "d1"),
            port_entity("switch.k", "d1"),
        ];
        let snap = snapshot(&[
            ("switch.z", Some(1), None),
            ("switch.m", None, None),
            ("switch.a", None, None),
            ("switch.k", Some(1), None),
        ]);
        let first = select_candidates(&entities, "d1", &snap);
        let mut reversed = entities.clone();
        reversed.reverse();
        let second = select_candidates(&reversed, "d1", &snap);
        assert_eq!(first, second);
        assert_eq!(ids(&first), ["switch.k", "switch.z", "switch.a", "switch.m"]);
    }

    #[test]
    fn excludes_cpu_in_any_case() {
        let entities = vec![
            port_entity("switch.cpu1", "d1"),
            port_entity("switch.cpu2", "d1"),
            port_entity("switch.cpu3", "d1"),
            port_entity("switch.gi1", "d1"),
        ];
        let snap = snapshot(&[
            ("switch.cpu1", Some(1), Some("cpu")),
            ("switch.cpu2", Some(2), Some("CPU")),
            ("switch.cpu3", Some(3), Some("Cpu")),
            ("switch.gi1", Some(4), Some("Gi1/0/1")),
        ]);
        assert_eq!(ids(&select_candidates(&entities, "d1", &snap)), ["switch.gi1"]);
    }

    #[test]
    fn filters_device_platform_domain_and_state() {
        let mut other_platform = port_entity("switch.other", "d1");
        other_platform.platform = "tplink".into();
        let entities = vec![
            port_entity("switch.mine", "d1"),
            port_entity("switch.foreign", "d2"),
            other_platform,
            port_entity("sensor.mine_traffic", "d1"),
            port_entity("switch.stateless", "d1"),
        ];
        let snap = snapshot(&[
            ("switch.mine", None, None),
            ("switch.foreign", None, None),
            ("switch.other", None, None),
            ("sensor.mine_traffic", None, None),
        ]);
        assert_eq!(ids(&select_candidates(&entities, "d1", &snap)), ["switch.mine"]);
    }

    #[test]
    fn comparator_is_antisymmetric() {
        let a = EntityId::from("a");
        let b = EntityId::from("b");
        let samples = [None, Some(1.0), Some(2.0)];
        for x in samples {
            for y in samples {
                let ab = compare_ports((&a, x), (&b, y));
                let ba = compare_ports((&b, y), (&a, x));
                assert_eq!(ab, ba.reverse());
            }
        }
    }

    // ── Async resolution ─────────────────────────────────────────────

    #[tokio::test]
    async fn resolves_device_name_then_entities() {
        let directory = FakeDirectory {
            devices: vec![device("d0", "Other"), device("d1", "SW1")],
            entities: vec![port_entity("switch.gi2", "d1"), port_entity("switch.gi1", "d1")],
            ..FakeDirectory::default()
        };
        let request = DiscoveryRequest {
            generation: 4,
            device_id: None,
            device_name: Some("SW1".into()),
            snapshot: snapshot(&[("switch.gi1", Some(1), None), ("switch.gi2", Some(2), None)]),
        };
        let result = discover(&directory, request).await;
        assert_eq!(result.generation, 4);
        assert_eq!(ids(&result.entity_ids), ["switch.gi1", "switch.gi2"]);
        assert_eq!(*directory.calls.lock().unwrap(), ["devices", "entities"]);
    }

    #[tokio::test]
    async fn device_id_skips_device_query() {
        let directory = FakeDirectory {
            entities: vec![port_entity("switch.gi1", "d1")],
            ..FakeDirectory::default()
        };
        let request = DiscoveryRequest {
            generation: 1,
            device_id: Some("d1".into()),
            device_name: Some("ignored".into()),
            snapshot: snapshot(&[("switch.gi1", None, None)]),
        };
        let result = discover(&directory, request).await;
        assert_eq!(ids(&result.entity_ids), ["switch.gi1"]);
        assert_eq!(*directory.calls.lock().unwrap(), ["entities"]);
    }

    #[tokio::test]
    async fn unknown_device_name_yields_empty_result() {
        let directory = FakeDirectory::default();
        let request = DiscoveryRequest {
            generation: 1,
            device_id: None,
            device_name: Some("SW1".into()),
            snapshot: StateSnapshot::default(),
        };
        assert!(discover(&directory, request).await.entity_ids.is_empty());
    }

    #[tokio::test]
    async fn query_failure_yields_empty_result() {
        let directory = FakeDirectory {
            fail_entities: true,
            ..FakeDirectory::default()
        };
        let request = DiscoveryRequest {
            generation: 2,
            device_id: Some("d1".into()),
            device_name: None,
            snapshot: StateSnapshot::default(),
        };
        let result = discover(&directory, request).await;
        assert_eq!(result.generation, 2);
        assert!(result.entity_ids.is_empty());
    }
}
