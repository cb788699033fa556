// ── Port card ──
//
// The card instance a host owns. It holds the normalized config, the
// latest snapshot, the dialog and the discovery latch, and is mutated
// only from the host's UI loop. Async work (discovery, actions) happens
// outside; completions come back through `apply_discovery` and
// `finish_action`.

pub mod dialog;
pub mod layout;
pub mod normalize;
pub mod reconcile;
pub mod render;
pub mod view;

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::discovery::{DiscoveryRequest, DiscoveryResult};
use crate::error::ConfigurationError;
use crate::gateway::{ActionOutcome, PortAction};
use crate::model::{CardConfig, DiscoveryPhase, LayoutKind, ResolvedPort, StateSnapshot};
use crate::registry::CardDescriptor;

pub use dialog::{DialogController, DialogState};
pub use layout::select_layout;
pub use normalize::normalize;
pub use reconcile::reconcile;
pub use render::render;
pub use view::{CardBody, CardView, DialogView, Interaction, PortMarker, PortTile};

/// Card type string hosts use to refer to this card.
pub const CARD_TYPE: &str = "snmp-switch-manager-card";

const IMAGE_CARD_ROWS: u32 = 8;
const TILES_PER_ROW: usize = 4;

/// One switch-port panel.
#[derive(Debug, Default)]
pub struct PortCard {
    config: Option<CardConfig>,
    snapshot: StateSnapshot,
    dialog: DialogController,
    generation: u64,
    discovery_attempted: bool,
}

impl PortCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry entry for this card type.
    pub fn descriptor() -> CardDescriptor {
        CardDescriptor {
            card_type: CARD_TYPE,
            name: "SNMP Switch Manager Card",
            description: "Live port panel for SNMP-managed switches with toggle and description editing",
        }
    }

    /// Smallest configuration that normalizes cleanly.
    pub fn stub_config() -> Value {
        json!({
            "type": format!("custom:{CARD_TYPE}"),
            "title": "Switch",
            "ports": ["switch.port_1", "switch.port_2"],
        })
    }

    // ── Inputs ───────────────────────────────────────────────────────

    /// Replace the configuration. On error the previous configuration
    /// stays in place and the error goes to the host.
    pub fn on_config_change(&mut self, raw: &Value) -> Result<(), ConfigurationError> {
        let config = normalize(raw)?;
        self.generation += 1;
        self.discovery_attempted = false;
        debug!(
            generation = self.generation,
            ports = config.ports.len(),
            layout = %config.layout,
            "card configuration applied"
        );
        self.config = Some(config);
        Ok(())
    }

    /// Take a new snapshot. Returns a discovery request the first time
    /// a discovery-mode configuration sees state.
    pub fn on_state_change(&mut self, snapshot: StateSnapshot) -> Option<DiscoveryRequest> {
        self.snapshot = snapshot;

        let config = self.config.as_ref()?;
        if config.discovery != DiscoveryPhase::Pending || self.discovery_attempted {
            return None;
        }
        self.discovery_attempted = true;
        info!(
            generation = self.generation,
            device_id = config.device_id.as_deref().unwrap_or(""),
            device_name = config.device_name.as_deref().unwrap_or(""),
            "starting port discovery"
        );
        Some(DiscoveryRequest {
            generation: self.generation,
            device_id: config.device_id.clone(),
            device_name: config.device_name.clone(),
            snapshot: self.snapshot.clone(),
        })
    }

    /// Apply a discovery completion. Results from a superseded
    /// configuration are ignored. Returns whether anything changed.
    pub fn apply_discovery(&mut self, result: DiscoveryResult) -> bool {
        if result.generation != self.generation {
            debug!(
                result_generation = result.generation,
                current = self.generation,
                "ignoring stale discovery result"
            );
            return false;
        }
        let Some(config) = self.config.take() else {
            return false;
        };
        self.config = Some(config.with_discovered_ports(result.entity_ids));
        true
    }

    // ── Interactions ─────────────────────────────────────────────────

    /// Route a user interaction. Dialog open/close is immediate; confirmed
    /// actions come back as a [`PortAction`] for the host to execute.
    pub fn dispatch(&mut self, interaction: Interaction) -> Option<PortAction> {
        match interaction {
            Interaction::OpenDialog { entity_id } => {
                self.dialog.open(entity_id);
                None
            }
            Interaction::CloseDialog => {
                self.dialog.close();
                None
            }
            Interaction::Toggle {
                entity_id,
                desired_on,
            } => {
                let toggleable = self
                    .snapshot
                    .get(entity_id.as_str())
                    .is_some_and(|state| state.status().is_toggleable());
                if !toggleable || !self.dialog.begin_action(&entity_id) {
                    return None;
                }
                Some(PortAction::Toggle {
                    entity_id,
                    desired_on,
                })
            }
            Interaction::SetDescription { entity_id, text } => {
                if !self.snapshot.contains(entity_id.as_str())
                    || !self.dialog.begin_action(&entity_id)
                {
                    return None;
                }
                Some(PortAction::SetDescription { entity_id, text })
            }
        }
    }

    /// Gateway completion: the dialog closes regardless of the outcome.
    pub fn finish_action(&mut self, outcome: &ActionOutcome) {
        self.dialog.complete_action(outcome.action.entity_id());
    }

    // ── Outputs ──────────────────────────────────────────────────────

    pub fn config(&self) -> Option<&CardConfig> {
        self.config.as_ref()
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    pub fn dialog_state(&self) -> &DialogState {
        self.dialog.state()
    }

    /// Whether a confirmed action is still running.
    pub fn is_busy(&self) -> bool {
        self.dialog.is_busy()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn resolved_ports(&self) -> Vec<ResolvedPort> {
        self.config
            .as_ref()
            .map(|config| reconcile(&config.ports, &self.snapshot))
            .unwrap_or_default()
    }

    /// Render the current view; `None` until a configuration is applied.
    pub fn render(&self) -> Option<CardView> {
        let config = self.config.as_ref()?;
        let ports = reconcile(&config.ports, &self.snapshot);
        Some(render(config, &ports, &self.snapshot, self.dialog.state()))
    }

    /// Height estimate in rows: a header plus one row per four tiles for
    /// grid layout, a fixed block for image layout.
    pub fn card_size(&self) -> u32 {
        let Some(config) = self.config.as_ref() else {
            return 1;
        };
        let ports = reconcile(&config.ports, &self.snapshot);
        match select_layout(config, &ports) {
            LayoutKind::Image if !ports.is_empty() => IMAGE_CARD_ROWS,
            _ => {
                let rows = ports.len().div_ceil(TILES_PER_ROW).max(1);
                u32::try_from(rows).map_or(u32::MAX, |rows| rows.saturating_add(1))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{EntityId, EntityState, PortStatus};
    use pretty_assertions::assert_eq;

    fn snapshot(entries: &[(&str, &str)]) -> StateSnapshot {
        entries
            .iter()
            .map(|(id, state)| (EntityId::from(*id), EntityState::new(*state)))
            .collect()
    }

    fn configured(raw: &Value) -> PortCard {
        let mut card = PortCard::new();
        card.on_config_change(raw).unwrap();
        card
    }

    #[test]
    fn renders_nothing_before_config() {
        assert!(PortCard::new().render().is_none());
    }

    #[test]
    fn stub_config_is_valid() {
        let card = configured(&PortCard::stub_config());
        assert_eq!(card.config().unwrap().ports.len(), 2);
    }

    #[test]
    fn invalid_config_keeps_previous() {
        let mut card = configured(&json!({ "ports": ["p1"] }));
        let err = card.on_config_change(&json!({ "ports": [] })).unwrap_err();
        assert_eq!(err, ConfigurationError::NoPorts);
        assert_eq!(card.config().unwrap().ports.len(), 1);
        assert_eq!(card.generation(), 1);
    }

    #[test]
    fn discovery_requested_once_per_config() {
        let mut card = configured(&json!({ "device_name": "SW1" }));
        let request = card.on_state_change(StateSnapshot::default()).unwrap();
        assert_eq!(request.device_name.as_deref(), Some("SW1"));
        assert!(card.on_state_change(StateSnapshot::default()).is_none());
        assert!(card.on_state_change(StateSnapshot::default()).is_none());

        card.on_config_change(&json!({ "device_id": "d1" })).unwrap();
        let again = card.on_state_change(StateSnapshot::default()).unwrap();
        assert_eq!(again.device_id.as_deref(), Some("d1"));
        assert_eq!(again.generation, 2);
    }

    #[test]
    fn configured_ports_never_request_discovery() {
        let mut card = configured(&json!({ "ports": ["p1"], "device_id": "d1" }));
        assert!(card.on_state_change(snapshot(&[("p1", "on")])).is_none());
    }

    #[test]
    fn discovery_result_replaces_port_list() {
        let mut card = configured(&json!({ "device_id": "d1", "title": "Core" }));
        let request = card.on_state_change(snapshot(&[("switch.a", "on")])).unwrap();
        assert!(card.apply_discovery(DiscoveryResult {
            generation: request.generation,
            entity_ids: vec![EntityId::from("switch.a")],
        }));

        let view = card.render().unwrap();
        assert_eq!(view.title.as_deref(), Some("Core"));
        let CardBody::Grid { tiles } = view.body else {
            panic!("expected grid");
        };
        assert_eq!(tiles.len(), 1);
        assert_eq!(card.config().unwrap().discovery, DiscoveryPhase::Complete);
    }

    #[test]
    fn stale_discovery_result_is_ignored() {
        let mut card = configured(&json!({ "device_id": "d1" }));
        let request = card.on_state_change(StateSnapshot::default()).unwrap();
        card.on_config_change(&json!({ "ports": ["p1"] })).unwrap();
        assert!(!card.apply_discovery(DiscoveryResult {
            generation: request.generation,
            entity_ids: vec![EntityId::from("switch.a")],
        }));
        assert_eq!(card.config().unwrap().ports[0].entity_id.as_str(), "p1");
    }

    #[test]
    fn device_name_scenario_shows_empty_state() {
        let mut card = configured(&json!({ "device_name": "SW1" }));
        let request = card.on_state_change(StateSnapshot::default()).unwrap();
        let view = card.render().unwrap();
        assert!(matches!(view.body, CardBody::Empty { .. }));

        card.apply_discovery(DiscoveryResult {
            generation: request.generation,
            entity_ids: Vec::new(),
        });
        let view = card.render().unwrap();
        assert_eq!(
            view.body,
            CardBody::Empty {
                message: render::EMPTY_NOTHING_DISCOVERED.into()
            }
        );
    }

    #[test]
    fn toggle_flow_closes_dialog_after_completion() {
        let mut card = configured(&json!({ "ports": ["p1"] }));
        card.on_state_change(snapshot(&[("p1", "on")]));

        assert!(card.dispatch(Interaction::OpenDialog { entity_id: "p1".into() }).is_none());
        let action = card
            .dispatch(Interaction::Toggle {
                entity_id: "p1".into(),
                desired_on: false,
            })
            .unwrap();
        assert!(card.is_busy());
        assert!(card.dialog_state().is_open_for(&"p1".into()));

        card.finish_action(&ActionOutcome {
            action,
            error: Some("HTTP 500".into()),
        });
        assert_eq!(*card.dialog_state(), DialogState::Closed);
        assert!(!card.is_busy());
    }

    #[test]
    fn toggle_is_unavailable_for_missing_or_unknown_entity() {
        let mut card = configured(&json!({ "ports": ["p1", "p2"] }));
        card.on_state_change(snapshot(&[("p2", "unavailable")]));

        card.dispatch(Interaction::OpenDialog { entity_id: "p1".into() });
        assert!(card
            .dispatch(Interaction::Toggle { entity_id: "p1".into(), desired_on: true })
            .is_none());

        card.dispatch(Interaction::OpenDialog { entity_id: "p2".into() });
        assert!(card
            .dispatch(Interaction::Toggle { entity_id: "p2".into(), desired_on: true })
            .is_none());
        assert!(!card.is_busy());
    }

    #[test]
    fn dialog_survives_snapshot_without_entity() {
        let mut card = configured(&json!({ "ports": ["p1"] }));
        card.on_state_change(snapshot(&[("p1", "on")]));
        card.dispatch(Interaction::OpenDialog { entity_id: "p1".into() });

        card.on_state_change(StateSnapshot::default());
        let view = card.render().unwrap();
        let dialog = view.dialog.unwrap();
        assert_eq!(dialog.title, "p1");
        assert!(dialog.toggle.is_none());
        assert!(matches!(view.body, CardBody::Empty { .. }));
    }

    #[test]
    fn config_push_keeps_dialog_open() {
        let mut card = configured(&json!({ "ports": ["p1"] }));
        card.dispatch(Interaction::OpenDialog { entity_id: "p1".into() });
        card.on_config_change(&json!({ "ports": ["p1", "p2"] })).unwrap();
        assert!(card.dialog_state().is_open_for(&"p1".into()));
    }

    #[test]
    fn dialog_view_and_dispatch_agree_on_dropped_port() {
        let mut card = configured(&json!({ "ports": ["p1", "p2"] }));
        card.on_state_change(snapshot(&[("p1", "on"), ("p2", "on")]));
        card.dispatch(Interaction::OpenDialog { entity_id: "p2".into() });
        card.on_config_change(&json!({ "ports": ["p1"] })).unwrap();

        let dialog = card.render().unwrap().dialog.unwrap();
        assert_eq!(dialog.status, Some(PortStatus::On));
        let toggle = dialog.toggle.unwrap();

        assert_eq!(
            card.dispatch(toggle.interaction),
            Some(PortAction::Toggle { entity_id: "p2".into(), desired_on: false })
        );
    }

    #[test]
    fn card_size_tracks_layout() {
        let mut card = configured(&json!({ "ports": ["a", "b", "c", "d", "e"] }));
        card.on_state_change(snapshot(&[("a", "on"), ("b", "on"), ("c", "on"), ("d", "on"), ("e", "on")]));
        assert_eq!(card.card_size(), 3);

        let mut image = configured(&json!({ "image": "bg.png", "ports": [{ "entity": "a", "x": 1, "y": 1 }] }));
        image.on_state_change(snapshot(&[("a", "on")]));
        assert_eq!(image.card_size(), IMAGE_CARD_ROWS);
    }
}
