//! Port discovery for a switch device.

use serde::Serialize;
use tabled::Tabled;

use switchdeck_core::{Controller, CoreError, DiscoveryRequest, PortStatus, StateSnapshot};

use crate::cli::{DiscoverArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct DiscoveredPort {
    /// 1-based position in port order.
    position: usize,
    entity_id: String,
    name: Option<String>,
    status: PortStatus,
}

#[derive(Tabled)]
struct DiscoveredRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Entity")]
    entity_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn describe(snapshot: &StateSnapshot, index: usize, entity_id: &str) -> DiscoveredPort {
    let state = snapshot.get(entity_id);
    DiscoveredPort {
        position: index + 1,
        entity_id: entity_id.to_owned(),
        name: state.and_then(|s| s.friendly_name()).map(str::to_owned),
        status: state.map_or(PortStatus::Unknown, |s| s.status()),
    }
}

pub async fn handle(args: DiscoverArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut connection = config::build_connection_config(global)?;
    connection.websocket_enabled = true;

    let identity = args
        .device_id
        .clone()
        .or_else(|| args.device_name.clone())
        .unwrap_or_default();

    let ports = util::with_spinner(
        "Discovering ports...",
        global.quiet,
        Controller::oneshot(connection, |controller| async move {
            let snapshot = controller.snapshot();
            let request = DiscoveryRequest {
                generation: 0,
                device_id: args.device_id,
                device_name: args.device_name,
                snapshot: snapshot.clone(),
            };
            let result = controller.discover(request).await;
            Ok::<_, CoreError>(
                result
                    .entity_ids
                    .iter()
                    .enumerate()
                    .map(|(index, id)| describe(&snapshot, index, id.as_str()))
                    .collect::<Vec<_>>(),
            )
        }),
    )
    .await?;

    if ports.is_empty() {
        return Err(CliError::NotFound {
            resource_type: "switch ports for device".into(),
            identifier: identity,
            hint: "Check the device name or id in Settings > Devices & services. \
                   Run with -v to see why discovery found nothing."
                .into(),
        });
    }

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &ports,
        |p| DiscoveredRow {
            position: p.position,
            entity_id: p.entity_id.clone(),
            name: p.name.clone().unwrap_or_default(),
            status: output::status_cell(p.status, color),
        },
        |p| p.entity_id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
