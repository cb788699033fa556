//! Data bridge: connects [Controller] streams to TUI actions.
//!
//! Runs as a background task: connects, then forwards every state
//! snapshot and connection-state transition as an [`Action`] through
//! the TUI's action channel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use switchdeck_core::{ConnectionState, Controller};

use crate::action::Action;

pub async fn spawn_data_bridge(
    controller: Controller,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    if let Err(e) = controller.connect().await {
        warn!(error = %e, "failed to connect to Home Assistant");
        let _ = action_tx.send(Action::Disconnected(format!("{e}")));
        return;
    }

    let _ = action_tx.send(Action::Connected);

    let mut states = controller.states();
    let mut conn_state = controller.connection_state();

    // Push the initial snapshot so the card renders immediately
    let _ = action_tx.send(Action::StatesUpdated(states.current().clone()));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(snapshot) = states.changed() => {
                debug!(entities = snapshot.len(), "dispatching StatesUpdated");
                let _ = action_tx.send(Action::StatesUpdated(snapshot));
            }
            Ok(()) = conn_state.changed() => {
                let state = conn_state.borrow_and_update().clone();
                match state {
                    ConnectionState::Connected => {
                        let _ = action_tx.send(Action::Connected);
                    }
                    ConnectionState::Disconnected => {
                        let _ = action_tx.send(Action::Disconnected("disconnected".into()));
                    }
                    ConnectionState::Reconnecting { .. } => {
                        let _ = action_tx.send(Action::Reconnecting);
                    }
                    ConnectionState::Failed => {
                        let _ = action_tx.send(Action::Disconnected("connection failed".into()));
                    }
                    ConnectionState::Connecting => {}
                }
            }
        }
    }

    controller.disconnect().await;
    debug!("data bridge shut down");
}
