//! Pure renderer: `(CardConfig, ResolvedPort[], StateSnapshot, DialogState) → CardView`.

use std::sync::Arc;

use crate::model::{
    CardConfig, DiscoveryPhase, EntityId, LayoutKind, PortStatus, ResolvedPort, StateSnapshot,
};

use super::dialog::DialogState;
use super::layout::select_layout;
use super::view::{
    CardBody, CardView, DescriptionEditor, DetailRow, DialogView, Interaction, PortMarker,
    PortTile, ToggleAction,
};

pub const EMPTY_DISCOVERING: &str = "Discovering ports for this device...";
pub const EMPTY_NOTHING_DISCOVERED: &str = "No ports found for this device.";
pub const EMPTY_NO_STATE: &str = "No port state available for the configured ports.";

/// Render a card. Identical inputs give identical trees.
///
/// The open dialog resolves its entity against `snapshot`, not `ports`:
/// an entity dropped from the configuration but still reported stays
/// actionable.
pub fn render(
    config: &CardConfig,
    ports: &[ResolvedPort],
    snapshot: &StateSnapshot,
    dialog: &DialogState,
) -> CardView {
    let body = if ports.is_empty() {
        CardBody::Empty {
            message: empty_message(config.discovery).to_owned(),
        }
    } else {
        match (select_layout(config, ports), config.image.as_deref()) {
            (LayoutKind::Image, Some(image)) => CardBody::Image {
                image: image.to_owned(),
                marker_size: config.marker_size,
                markers: markers(config, ports),
            },
            _ => CardBody::Grid {
                tiles: ports.iter().map(tile).collect(),
            },
        }
    };

    let dialog = dialog.entity_id().map(|entity_id| {
        let port = ports
            .iter()
            .find(|p| &p.entity_id == entity_id)
            .cloned()
            .or_else(|| unconfigured_port(entity_id, snapshot));
        dialog_view(entity_id, port.as_ref())
    });

    CardView {
        title: config.title.clone(),
        body,
        dialog,
    }
}

fn empty_message(phase: DiscoveryPhase) -> &'static str {
    match phase {
        DiscoveryPhase::Pending => EMPTY_DISCOVERING,
        DiscoveryPhase::Complete => EMPTY_NOTHING_DISCOVERED,
        DiscoveryPhase::Disabled => EMPTY_NO_STATE,
    }
}

fn tile(port: &ResolvedPort) -> PortTile {
    let status = port.status();
    PortTile {
        entity_id: port.entity_id.clone(),
        name: port.display_name(),
        status,
        color: status.color(),
        description: port
            .entity_state
            .description()
            .filter(|d| !d.trim().is_empty())
            .map(str::to_owned),
        on_click: Interaction::OpenDialog {
            entity_id: port.entity_id.clone(),
        },
    }
}

fn markers(config: &CardConfig, ports: &[ResolvedPort]) -> Vec<PortMarker> {
    ports
        .iter()
        .enumerate()
        .filter_map(|(position, port)| {
            let (x, y) = port.position()?;
            let status = port.status();
            Some(PortMarker {
                entity_id: port.entity_id.clone(),
                x,
                y,
                size: config.marker_size,
                label: marker_label(port, position),
                status,
                color: status.color(),
                on_click: Interaction::OpenDialog {
                    entity_id: port.entity_id.clone(),
                },
            })
        })
        .collect()
}

/// Explicit label, else the port index attribute, else the 1-based position.
fn marker_label(port: &ResolvedPort, position: usize) -> String {
    port.label
        .as_ref()
        .map(ToString::to_string)
        .or_else(|| port.entity_state.port_label())
        .unwrap_or_else(|| (position + 1).to_string())
}

/// A reported entity outside the configured ports: no position, no label.
fn unconfigured_port(entity_id: &EntityId, snapshot: &StateSnapshot) -> Option<ResolvedPort> {
    snapshot.get(entity_id.as_str()).map(|state| ResolvedPort {
        entity_id: entity_id.clone(),
        entity_state: Arc::clone(state),
        x: None,
        y: None,
        label: None,
    })
}

fn dialog_view(entity_id: &EntityId, port: Option<&ResolvedPort>) -> DialogView {
    let on_close = Interaction::CloseDialog;

    // Stale reference: bare identifier, nothing actionable.
    let Some(port) = port else {
        return DialogView {
            entity_id: entity_id.clone(),
            title: entity_id.to_string(),
            status: None,
            description: None,
            details: Vec::new(),
            toggle: None,
            editor: None,
            on_close,
        };
    };

    let state = &port.entity_state;
    let status = port.status();
    let description = state.description().map(str::to_owned);

    let toggle = status.is_toggleable().then(|| {
        let desired_on = status != PortStatus::On;
        ToggleAction {
            label: if desired_on { "Turn on" } else { "Turn off" },
            interaction: Interaction::Toggle {
                entity_id: entity_id.clone(),
                desired_on,
            },
        }
    });

    let details = [
        ("Interface", state.interface_name().map(str::to_owned)),
        ("Port", state.port_label()),
        ("Admin", state.admin_status()),
        ("Oper", state.oper_status()),
        ("Speed", state.speed()),
        ("VLAN", state.vlan_id()),
        ("IP", state.ip_address()),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|value| DetailRow { label, value }))
    .collect();

    DialogView {
        entity_id: entity_id.clone(),
        title: port.display_name(),
        status: Some(status),
        editor: Some(DescriptionEditor {
            initial: description.clone().unwrap_or_default(),
        }),
        description,
        details,
        toggle,
        on_close,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::card::normalize::normalize;
    use crate::card::reconcile::reconcile;
    use crate::model::EntityState;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render_json(raw: &serde_json::Value, snapshot: &StateSnapshot, dialog: &DialogState) -> CardView {
        let config = normalize(raw).unwrap();
        let ports = reconcile(&config.ports, snapshot);
        render(&config, &ports, snapshot, dialog)
    }

    #[test]
    fn grid_scenario_two_tiles() {
        let snapshot = StateSnapshot::from_json(&json!({
            "p1": { "state": "on" },
            "p2": { "state": "off" }
        }));
        let view = render_json(
            &json!({ "ports": ["p1", "p2"], "layout": "grid" }),
            &snapshot,
            &DialogState::Closed,
        );

        let CardBody::Grid { tiles } = &view.body else {
            panic!("expected grid, got {:?}", view.body);
        };
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].status, PortStatus::On);
        assert_eq!(tiles[0].color, PortStatus::On.color());
        assert_eq!(tiles[1].status, PortStatus::Off);
        assert_eq!(tiles[1].color, PortStatus::Off.color());
    }

    #[test]
    fn image_scenario_one_marker() {
        let snapshot = StateSnapshot::from_json(&json!({ "p1": { "state": "on" } }));
        let view = render_json(
            &json!({ "ports": [{ "entity": "p1", "x": 10, "y": 20 }], "image": "bg.png" }),
            &snapshot,
            &DialogState::Closed,
        );

        let CardBody::Image { image, markers, marker_size } = &view.body else {
            panic!("expected image, got {:?}", view.body);
        };
        assert_eq!(image, "bg.png");
        assert_eq!(*marker_size, 26.0);
        assert_eq!(markers.len(), 1);
        assert_eq!((markers[0].x, markers[0].y), (10.0, 20.0));
        assert_eq!(markers[0].label, "1");
    }

    #[test]
    fn marker_label_prefers_label_then_index() {
        let snapshot = StateSnapshot::from_json(&json!({
            "p1": { "state": "on", "attributes": { "Index": 17 } },
            "p2": { "state": "on", "attributes": { "Index": 18 } }
        }));
        let view = render_json(
            &json!({
                "image": "bg.png",
                "ports": [
                    { "entity": "p1", "x": 1, "y": 1, "label": "WAN" },
                    { "entity": "p2", "x": 2, "y": 2 }
                ]
            }),
            &snapshot,
            &DialogState::Closed,
        );
        let CardBody::Image { markers, .. } = &view.body else {
            panic!("expected image layout");
        };
        assert_eq!(markers[0].label, "WAN");
        assert_eq!(markers[1].label, "18");
    }

    #[test]
    fn tiles_show_friendly_name_and_description() {
        let snapshot = StateSnapshot::from_json(&json!({
            "p1": { "state": "unavailable", "attributes": { "friendly_name": "Core 1", "Alias": "uplink" } }
        }));
        let view = render_json(&json!({ "ports": ["p1"] }), &snapshot, &DialogState::Closed);
        let CardBody::Grid { tiles } = &view.body else {
            panic!("expected grid");
        };
        assert_eq!(tiles[0].name, "Core 1");
        assert_eq!(tiles[0].description.as_deref(), Some("uplink"));
        assert_eq!(tiles[0].status, PortStatus::Unknown);
    }

    #[test]
    fn every_tile_opens_its_own_dialog() {
        let snapshot = StateSnapshot::from_json(&json!({
            "p1": { "state": "on" }, "p2": { "state": "off" }
        }));
        let view = render_json(&json!({ "ports": ["p1", "p2"] }), &snapshot, &DialogState::Closed);
        let targets: Vec<_> = view
            .interactions()
            .into_iter()
            .map(|i| i.entity_id().unwrap().as_str())
            .collect();
        assert_eq!(targets, ["p1", "p2"]);
    }

    #[test]
    fn empty_state_messages() {
        let empty = StateSnapshot::default();
        let configured = render_json(&json!({ "ports": ["p1"] }), &empty, &DialogState::Closed);
        assert_eq!(
            configured.body,
            CardBody::Empty { message: EMPTY_NO_STATE.into() }
        );

        let discovering =
            render_json(&json!({ "device_name": "SW1" }), &empty, &DialogState::Closed);
        assert_eq!(
            discovering.body,
            CardBody::Empty { message: EMPTY_DISCOVERING.into() }
        );
    }

    #[test]
    fn dialog_for_present_entity_has_actions() {
        let snapshot = StateSnapshot::from_json(&json!({
            "p1": { "state": "on", "attributes": {
                "Name": "Gi1/0/1", "Index": 1, "Alias": "uplink", "Speed": 1_000_000_000_u64
            } }
        }));
        let view = render_json(
            &json!({ "ports": ["p1"] }),
            &snapshot,
            &DialogState::OpenFor(EntityId::from("p1")),
        );
        let dialog = view.dialog.unwrap();
        assert_eq!(dialog.status, Some(PortStatus::On));
        let toggle = dialog.toggle.unwrap();
        assert_eq!(toggle.label, "Turn off");
        assert_eq!(
            toggle.interaction,
            Interaction::Toggle { entity_id: EntityId::from("p1"), desired_on: false }
        );
        assert_eq!(dialog.editor.unwrap().initial, "uplink");
        assert!(dialog.details.iter().any(|r| r.label == "Speed" && r.value == "1.0 Gbps"));
    }

    #[test]
    fn dialog_for_unknown_status_has_no_toggle() {
        let snapshot = StateSnapshot::from_json(&json!({ "p1": { "state": "unavailable" } }));
        let view = render_json(
            &json!({ "ports": ["p1"] }),
            &snapshot,
            &DialogState::OpenFor(EntityId::from("p1")),
        );
        let dialog = view.dialog.unwrap();
        assert!(dialog.toggle.is_none());
        assert!(dialog.editor.is_some());
    }

    #[test]
    fn dialog_survives_entity_disappearing() {
        let dialog = DialogState::OpenFor(EntityId::from("p1"));
        let view = render_json(&json!({ "ports": ["p1", "p2"] }), &StateSnapshot::default(), &dialog);
        let dialog_view = view.dialog.unwrap();
        assert_eq!(dialog_view.title, "p1");
        assert!(dialog_view.toggle.is_none());
        assert!(dialog_view.editor.is_none());
        assert!(dialog_view.status.is_none());
    }

    #[test]
    fn dialog_for_unconfigured_but_reported_entity_stays_actionable() {
        let snapshot = StateSnapshot::from_json(&json!({
            "p1": { "state": "on" },
            "p2": { "state": "on", "attributes": { "friendly_name": "Core 2" } }
        }));
        let view = render_json(
            &json!({ "ports": ["p1"] }),
            &snapshot,
            &DialogState::OpenFor(EntityId::from("p2")),
        );
        let dialog = view.dialog.unwrap();
        assert_eq!(dialog.title, "Core 2");
        assert_eq!(dialog.status, Some(PortStatus::On));
        assert!(dialog.editor.is_some());
        assert_eq!(
            dialog.toggle.unwrap().interaction,
            Interaction::Toggle { entity_id: EntityId::from("p2"), desired_on: false }
        );
    }

    #[test]
    fn render_is_idempotent() {
        let snapshot: StateSnapshot = [
            (EntityId::from("p1"), EntityState::new("on").with_attribute("Index", 1)),
            (EntityId::from("p2"), EntityState::new("weird")),
        ]
        .into_iter()
        .collect();
        let raw = json!({ "image": "bg.png", "ports": [
            { "entity": "p1", "x": 5, "y": 5 }, { "entity": "p2", "x": 6, "y": 6 }
        ] });
        let dialog = DialogState::OpenFor(EntityId::from("p2"));
        let config = normalize(&raw).unwrap();
        let ports = reconcile(&config.ports, &snapshot);
        let first = render(&config, &ports, &snapshot, &dialog);
        let second = render(&config, &ports, &snapshot, &dialog);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
