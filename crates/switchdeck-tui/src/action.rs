//! All possible UI actions. Actions are the sole mechanism for state mutation.

use switchdeck_core::{ActionOutcome, DiscoveryResult, Interaction, StateSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Transient message shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    Tick,
    Render,
    Resize(u16, u16),
    ToggleHelp,

    // ── Connection ──
    Connected,
    Reconnecting,
    Disconnected(String),

    // ── Data ──
    StatesUpdated(StateSnapshot),
    DiscoveryFinished(DiscoveryResult),
    PortActionFinished(ActionOutcome),

    // ── Card ──
    Card(Interaction),

    Notify(Notification),
}
