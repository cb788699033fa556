//! Shared helpers for command handlers.

use std::future::Future;
use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use switchdeck_core::{CardConfig, ConnectionConfig, Controller, CoreError, PortCard};

use crate::error::CliError;

/// Run a future behind a stderr spinner when attached to a terminal.
pub async fn with_spinner<F: Future>(message: &str, quiet: bool, fut: F) -> F::Output {
    if quiet || !io::stderr().is_terminal() {
        return fut.await;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.magenta} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(Duration::from_millis(80));

    let output = fut.await;
    spinner.finish_and_clear();
    output
}

/// Build a card from a raw configuration, feed it one snapshot, and
/// run discovery to completion when the card asks for it.
pub async fn load_card(
    raw: &Value,
    mut connection: ConnectionConfig,
    quiet: bool,
) -> Result<PortCard, CliError> {
    let mut card = PortCard::new();
    card.on_config_change(raw)?;

    // Registry queries only exist on the WebSocket API.
    connection.websocket_enabled = card.config().is_some_and(CardConfig::uses_discovery);

    let card = with_spinner(
        "Loading port states...",
        quiet,
        Controller::oneshot(connection, |controller| async move {
            if let Some(request) = card.on_state_change(controller.snapshot()) {
                let result = controller.discover(request).await;
                card.apply_discovery(result);
            }
            Ok::<_, CoreError>(card)
        }),
    )
    .await?;
    Ok(card)
}

/// Format a percentage coordinate pair for tables.
pub fn format_position(position: Option<(f64, f64)>) -> String {
    position.map_or_else(|| "-".into(), |(x, y)| format!("{x}%, {y}%"))
}
