//! Port listing and view-tree rendering.

use serde::Serialize;
use tabled::Tabled;

use switchdeck_core::{CardBody, CardView, Interaction, PortStatus, ResolvedPort};

use crate::cli::{CardArgs, GlobalOpts, RenderArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Rows ────────────────────────────────────────────────────────────

/// One resolved port, as printed by `ports`.
#[derive(Debug, Serialize)]
struct PortSummary {
    entity_id: String,
    name: String,
    status: PortStatus,
    state: String,
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<(f64, f64)>,
}

impl From<&ResolvedPort> for PortSummary {
    fn from(port: &ResolvedPort) -> Self {
        Self {
            entity_id: port.entity_id.to_string(),
            name: port.display_name(),
            status: port.status(),
            state: port.entity_state.state.clone(),
            description: port.entity_state.description().map(str::to_owned),
            position: port.position(),
        }
    }
}

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Entity")]
    entity_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Position")]
    position: String,
}

fn to_row(port: &PortSummary, color: bool) -> PortRow {
    PortRow {
        entity_id: port.entity_id.clone(),
        name: port.name.clone(),
        status: output::status_cell(port.status, color),
        description: port.description.clone().unwrap_or_default(),
        position: util::format_position(port.position),
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_ports(args: &CardArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let raw = config::load_card(args, global)?;
    let connection = config::build_connection_config(global)?;
    let card = util::load_card(&raw, connection, global.quiet).await?;

    let ports: Vec<PortSummary> = card.resolved_ports().iter().map(PortSummary::from).collect();

    if !global.quiet {
        if let Some(view) = card.render() {
            eprintln!("{}", heading(&view, ports.len()));
        }
    }

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &ports,
        |p| to_row(p, color),
        |p| p.entity_id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle_render(args: RenderArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let raw = config::load_card(&args.card, global)?;
    let connection = config::build_connection_config(global)?;
    let mut card = util::load_card(&raw, connection, global.quiet).await?;

    if let Some(entity_id) = args.open {
        card.dispatch(Interaction::OpenDialog {
            entity_id: entity_id.into(),
        });
    }

    let view = card.render().ok_or(CliError::NoCard)?;
    let out = output::render_single(
        &global.output,
        &view,
        |v| serde_json::to_string_pretty(v).unwrap_or_default(),
        |v| v.layout().map_or_else(|| "empty".into(), |l| l.to_string()),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// One-line summary printed above the table.
fn heading(view: &CardView, port_count: usize) -> String {
    let title = view.title.as_deref().unwrap_or("Switch ports");
    match &view.body {
        CardBody::Empty { message } => format!("{title}: {message}"),
        CardBody::Grid { .. } => format!("{title} (grid, {port_count} ports)"),
        CardBody::Image { image, .. } => {
            format!("{title} (image {image}, {port_count} ports)")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchdeck_core::{EntityId, EntityState, PortCard, StateSnapshot};

    fn card() -> PortCard {
        let mut card = PortCard::new();
        card.on_config_change(&json!({
            "title": "Core",
            "ports": [{ "entity": "switch.gi1", "x": 10, "y": 20 }, "switch.gi2"]
        }))
        .unwrap();
        card.on_state_change(
            [
                (
                    EntityId::from("switch.gi1"),
                    EntityState::new("on").with_attribute("Alias", "uplink"),
                ),
                (EntityId::from("switch.gi2"), EntityState::new("off")),
            ]
            .into_iter()
            .collect::<StateSnapshot>(),
        );
        card
    }

    #[test]
    fn summaries_carry_position_and_description() {
        let ports: Vec<PortSummary> = card().resolved_ports().iter().map(PortSummary::from).collect();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].position, Some((10.0, 20.0)));
        assert_eq!(ports[0].description.as_deref(), Some("uplink"));
        assert_eq!(ports[1].status, PortStatus::Off);

        let row = to_row(&ports[1], false);
        assert_eq!(row.status, "off");
        assert_eq!(row.position, "-");
    }

    #[test]
    fn heading_names_layout() {
        let card = card();
        let view = card.render().unwrap();
        assert_eq!(heading(&view, 2), "Core (grid, 2 ports)");
    }
}
