//! Wire types shared by the REST and WebSocket surfaces.
//!
//! Field names follow the JSON Home Assistant emits. Anything we do not
//! model explicitly is kept in an `extra` map so nothing is silently lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── States ───────────────────────────────────────────────────────────

/// One entry of `GET /api/states` (and of `new_state` in events).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateObject {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

// ── Registries ───────────────────────────────────────────────────────

/// Row of `config/device_registry/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRegistryEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_by_user: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub sw_version: Option<String>,
    #[serde(default)]
    pub disabled_by: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Row of `config/entity_registry/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRegistryEntry {
    pub entity_id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub disabled_by: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Events ───────────────────────────────────────────────────────────

/// Payload of a `state_changed` event.
///
/// `new_state` is `None` when the entity was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangedEvent {
    pub entity_id: String,
    #[serde(default)]
    pub old_state: Option<StateObject>,
    #[serde(default)]
    pub new_state: Option<StateObject>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_object_keeps_attributes() {
        let raw = json!({
            "entity_id": "switch.core_gi1_0_1",
            "state": "on",
            "attributes": { "Index": 1, "Name": "Gi1/0/1", "Alias": "uplink" },
            "last_changed": "2026-03-01T10:00:00+00:00",
            "last_updated": "2026-03-01T10:00:00+00:00",
            "context": { "id": "01HX" }
        });
        let state: StateObject = serde_json::from_value(raw).unwrap();
        assert_eq!(state.entity_id, "switch.core_gi1_0_1");
        assert_eq!(state.attributes["Name"], "Gi1/0/1");
        assert!(state.last_changed.is_some());
    }

    #[test]
    fn entity_registry_entry_tolerates_missing_device() {
        let raw = json!({
            "entity_id": "sun.sun",
            "platform": "sun",
            "config_entry_id": "abc",
            "device_id": null
        });
        let entry: EntityRegistryEntry = serde_json::from_value(raw).unwrap();
        assert!(entry.device_id.is_none());
        assert_eq!(entry.extra["config_entry_id"], "abc");
    }

    #[test]
    fn state_changed_removal_has_no_new_state() {
        let raw = json!({
            "entity_id": "switch.core_gi1_0_2",
            "old_state": { "entity_id": "switch.core_gi1_0_2", "state": "off" },
            "new_state": null
        });
        let event: StateChangedEvent = serde_json::from_value(raw).unwrap();
        assert!(event.new_state.is_none());
        assert_eq!(event.old_state.unwrap().state, "off");
    }
}
