//! Port action handlers: toggle and describe.
//!
//! Both go through the card's action gateway exactly once. Success only
//! means Home Assistant accepted the call; the new state shows up on the
//! next `ports` run.

use switchdeck_core::{Controller, CoreError, EntityId};

use crate::cli::{DescribeArgs, GlobalOpts, ToggleArgs};
use crate::config;
use crate::error::CliError;

use super::util;

pub async fn handle_toggle(args: ToggleArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let entity_id = EntityId::from(args.entity_id);
    let desired_on = args.on && !args.off;
    let connection = config::build_connection_config(global)?;

    let target = entity_id.clone();
    let result = util::with_spinner(
        "Calling Home Assistant...",
        global.quiet,
        Controller::oneshot(connection, |controller| async move {
            ensure_known(&controller, &target)?;
            Ok::<_, CoreError>(
                controller
                    .gateway()
                    .toggle_administrative_state(&target, desired_on)
                    .await,
            )
        }),
    )
    .await?;

    result.map_err(|e| CliError::ActionFailed {
        operation: "toggle",
        entity_id: entity_id.to_string(),
        message: e.to_string(),
    })?;

    if !global.quiet {
        let verb = if desired_on { "on" } else { "off" };
        eprintln!("✓ Requested {entity_id} turn {verb}");
    }
    Ok(())
}

pub async fn handle_describe(args: DescribeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let entity_id = EntityId::from(args.entity_id);
    let connection = config::build_connection_config(global)?;

    let target = entity_id.clone();
    let text = args.text;
    let result = util::with_spinner(
        "Calling Home Assistant...",
        global.quiet,
        Controller::oneshot(connection, |controller| async move {
            ensure_known(&controller, &target)?;
            Ok::<_, CoreError>(controller.gateway().set_description(&target, &text).await)
        }),
    )
    .await?;

    result.map_err(|e| CliError::ActionFailed {
        operation: "set description",
        entity_id: entity_id.to_string(),
        message: e.to_string(),
    })?;

    if !global.quiet {
        eprintln!("✓ Description of {entity_id} updated");
    }
    Ok(())
}

/// Refuse to act on entities Home Assistant does not report.
fn ensure_known(controller: &Controller, entity_id: &EntityId) -> Result<(), CoreError> {
    if controller.snapshot().contains(entity_id.as_str()) {
        Ok(())
    } else {
        Err(CoreError::NotFound {
            identifier: entity_id.to_string(),
        })
    }
}
