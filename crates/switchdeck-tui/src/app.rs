//! Application core: event loop, card ownership, action dispatch.
//!
//! The [`PortCard`] lives here and is only ever touched from the event
//! loop. Discovery and port actions run as spawned tasks and report back
//! through the action channel.

use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use switchdeck_core::{ActionOutcome, Controller, DiscoveryRequest, PortAction, PortCard};

use crate::action::{Action, Notification, NotificationLevel};
use crate::component::Component;
use crate::data_bridge::spawn_data_bridge;
use crate::event::{Event, EventReader};
use crate::theme;
use crate::tui::Tui;
use crate::widgets::port_dialog::PortDialog;
use crate::widgets::port_panel::PortPanel;

/// Ticks a notification stays in the status bar (4 Hz tick).
const NOTIFICATION_TICKS: u16 = 20;

/// Connection status as seen by the TUI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Offline,
    Connecting,
    Connected,
    Reconnecting,
    Disconnected(String),
}

/// Top-level application state and event loop.
pub struct App {
    controller: Option<Controller>,
    card: PortCard,
    panel: PortPanel,
    dialog: PortDialog,
    running: bool,
    connection_status: ConnectionStatus,
    notification: Option<(Notification, u16)>,
    help_visible: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    cancel: CancellationToken,
}

impl App {
    /// Build the app around an optional controller and a raw card config.
    /// A rejected config is reported in the status bar; the card then
    /// shows nothing until a valid one arrives.
    pub fn new(controller: Option<Controller>, card_config: &Value) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let mut card = PortCard::new();
        let notification = card.on_config_change(card_config).err().map(|e| {
            warn!(error = %e, "card configuration rejected");
            (
                Notification {
                    message: e.to_string(),
                    level: NotificationLevel::Error,
                },
                u16::MAX,
            )
        });

        let mut app = Self {
            controller,
            card,
            panel: PortPanel::new(),
            dialog: PortDialog::new(),
            running: true,
            connection_status: ConnectionStatus::default(),
            notification,
            help_visible: false,
            action_tx,
            action_rx,
            cancel: CancellationToken::new(),
        };
        app.refresh_views();
        app
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        if let Some(controller) = self.controller.clone() {
            self.connection_status = ConnectionStatus::Connecting;
            tokio::spawn(spawn_data_bridge(
                controller,
                self.action_tx.clone(),
                self.cancel.clone(),
            ));
        }

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(action) = self.handle_mouse_event(mouse)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.cancel.cancel();
        events.stop();
        info!("TUI event loop ended");
        Ok(())
    }

    /// Global keys first, then the dialog if open, else the panel.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        if (key.modifiers, key.code) == (KeyModifiers::CONTROL, KeyCode::Char('c')) {
            return Ok(Some(Action::Quit));
        }

        if self.dialog.is_open() {
            return self.dialog.handle_key_event(key);
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('q')) => Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('?')) => Ok(Some(Action::ToggleHelp)),
            (KeyModifiers::NONE, KeyCode::Char('r')) => {
                self.spawn_refresh();
                Ok(None)
            }
            _ => self.panel.handle_key_event(key),
        }
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        if self.help_visible || self.dialog.is_open() {
            return Ok(None);
        }
        self.panel.handle_mouse_event(mouse)
    }

    /// Process a single action: update the card and propagate to widgets.
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::Connected => self.connection_status = ConnectionStatus::Connected,
            Action::Reconnecting => self.connection_status = ConnectionStatus::Reconnecting,
            Action::Disconnected(reason) => {
                self.connection_status = ConnectionStatus::Disconnected(reason.clone());
            }

            Action::StatesUpdated(snapshot) => {
                if let Some(request) = self.card.on_state_change(snapshot.clone()) {
                    self.spawn_discovery(request);
                }
                self.refresh_views();
            }

            Action::DiscoveryFinished(result) => {
                if self.card.apply_discovery(result.clone()) {
                    debug!(ports = result.entity_ids.len(), "discovered ports applied");
                    self.refresh_views();
                }
            }

            Action::Card(interaction) => {
                if let Some(port_action) = self.card.dispatch(interaction.clone()) {
                    self.spawn_port_action(port_action);
                }
                self.refresh_views();
            }

            Action::PortActionFinished(outcome) => {
                self.card.finish_action(outcome);
                self.notify(outcome_notification(outcome));
                self.refresh_views();
            }

            Action::Notify(notification) => self.notify(notification.clone()),

            Action::Tick => {
                if let Some((_, remaining)) = self.notification.as_mut() {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        self.notification = None;
                    }
                }
                self.dialog.update(action)?;
            }

            Action::Render | Action::Resize(..) => {}
        }

        Ok(())
    }

    fn notify(&mut self, notification: Notification) {
        self.notification = Some((notification, NOTIFICATION_TICKS));
    }

    /// Re-render the card and hand the slices to the widgets.
    fn refresh_views(&mut self) {
        let view = self.card.render();
        let dialog = view.as_ref().and_then(|v| v.dialog.clone());
        self.dialog.set_view(dialog, self.card.is_busy());
        self.panel.set_view(view);
    }

    // ── Background work ─────────────────────────────────────────────

    fn spawn_discovery(&self, request: DiscoveryRequest) {
        let Some(controller) = self.controller.clone() else {
            return;
        };
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = controller.discover(request).await;
            let _ = tx.send(Action::DiscoveryFinished(result));
        });
    }

    fn spawn_port_action(&self, port_action: PortAction) {
        let Some(controller) = self.controller.clone() else {
            let outcome = ActionOutcome {
                action: port_action,
                error: Some("not connected to Home Assistant".into()),
            };
            let _ = self.action_tx.send(Action::PortActionFinished(outcome));
            return;
        };
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let outcome = controller.gateway().execute(port_action).await;
            let _ = tx.send(Action::PortActionFinished(outcome));
        });
    }

    fn spawn_refresh(&self) {
        let Some(controller) = self.controller.clone() else {
            return;
        };
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = controller.full_refresh().await {
                let _ = tx.send(Action::Notify(Notification {
                    message: format!("refresh failed: {e}"),
                    level: NotificationLevel::Error,
                }));
            }
        });
    }

    // ── Rendering ───────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let [content_area, status_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);

        self.panel.render(frame, content_area);
        self.dialog.render(frame, content_area);
        self.render_status_bar(frame, status_area);

        if self.help_visible {
            Self::render_help_overlay(frame, area);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let connection_indicator = match &self.connection_status {
            ConnectionStatus::Connected => {
                Span::styled("● connected", Style::default().fg(theme::SUCCESS_GREEN))
            }
            ConnectionStatus::Offline => {
                Span::styled("○ offline", Style::default().fg(theme::DIM_WHITE))
            }
            ConnectionStatus::Disconnected(_) => {
                Span::styled("○ disconnected", Style::default().fg(theme::ERROR_RED))
            }
            ConnectionStatus::Reconnecting => {
                Span::styled("◐ reconnecting", Style::default().fg(theme::ELECTRIC_YELLOW))
            }
            ConnectionStatus::Connecting => {
                Span::styled("◐ connecting", Style::default().fg(theme::ELECTRIC_YELLOW))
            }
        };

        let mut spans = vec![Span::raw(" "), connection_indicator];

        let message = match (&self.notification, &self.connection_status) {
            (Some((notification, _)), _) => Some(notification.clone()),
            (None, ConnectionStatus::Disconnected(reason)) => Some(Notification {
                message: reason.clone(),
                level: NotificationLevel::Error,
            }),
            _ => None,
        };
        if let Some(notification) = message {
            let color = match notification.level {
                NotificationLevel::Info => theme::NEON_CYAN,
                NotificationLevel::Error => theme::ERROR_RED,
            };
            spans.push(Span::styled(" │ ", theme::key_hint()));
            spans.push(Span::styled(notification.message, Style::default().fg(color)));
        }

        spans.push(Span::styled(" │ ? help  r refresh  q quit", theme::key_hint()));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_help_overlay(frame: &mut Frame, area: Rect) {
        let help_width = 50u16.min(area.width.saturating_sub(4));
        let help_height = 16u16.min(area.height.saturating_sub(2));
        let help_area = Rect::new(
            area.x + area.width.saturating_sub(help_width) / 2,
            area.y + area.height.saturating_sub(help_height) / 2,
            help_width,
            help_height,
        );

        frame.render_widget(Clear, help_area);
        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
            .style(Style::default().bg(theme::BG_DARK));
        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let row = |key: &'static str, label: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
                Span::styled(label, theme::key_hint()),
            ])
        };

        let help_text = vec![
            Line::from(Span::styled("  Ports", Style::default().fg(theme::NEON_CYAN))),
            row("h/j/k/l", "Move selection"),
            row("g/G", "First / last port"),
            row("Enter", "Open port dialog"),
            row("click", "Open port dialog"),
            Line::from(""),
            Line::from(Span::styled("  Dialog", Style::default().fg(theme::NEON_CYAN))),
            row("t", "Turn port on / off"),
            row("e", "Edit description"),
            row("Esc", "Close"),
            Line::from(""),
            row("r", "Refresh states"),
            row("q", "Quit"),
        ];
        frame.render_widget(Paragraph::new(help_text), inner);
    }
}

fn outcome_notification(outcome: &ActionOutcome) -> Notification {
    let entity_id = outcome.action.entity_id();
    match &outcome.error {
        None => {
            let what = match &outcome.action {
                PortAction::Toggle { desired_on: true, .. } => "turn on requested",
                PortAction::Toggle { desired_on: false, .. } => "turn off requested",
                PortAction::SetDescription { .. } => "description updated",
            };
            Notification {
                message: format!("{entity_id}: {what}"),
                level: NotificationLevel::Info,
            }
        }
        Some(error) => Notification {
            message: format!("{entity_id}: {error}"),
            level: NotificationLevel::Error,
        },
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use switchdeck_core::{DialogState, EntityId, EntityState, Interaction, StateSnapshot};

    fn open(entity_id: &str) -> Action {
        Action::Card(Interaction::OpenDialog {
            entity_id: entity_id.into(),
        })
    }

    fn snapshot() -> StateSnapshot {
        [
            (EntityId::from("switch.gi1"), EntityState::new("on")),
            (EntityId::from("switch.gi2"), EntityState::new("off")),
        ]
        .into_iter()
        .collect()
    }

    fn drain(app: &mut App) {
        while let Ok(action) = app.action_rx.try_recv() {
            app.process_action(&action).unwrap();
        }
    }

    #[test]
    fn invalid_config_is_reported() {
        let app = App::new(None, &json!({ "ports": "switch.gi1" }));
        let (notification, _) = app.notification.clone().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert!(app.card.config().is_none());
    }

    #[test]
    fn toggle_without_controller_closes_dialog_with_error() {
        let mut app = App::new(None, &json!({ "ports": ["switch.gi1", "switch.gi2"] }));
        app.process_action(&Action::StatesUpdated(snapshot())).unwrap();
        app.process_action(&open("switch.gi1")).unwrap();
        assert!(app.dialog.is_open());

        app.process_action(&Action::Card(Interaction::Toggle {
            entity_id: "switch.gi1".into(),
            desired_on: false,
        }))
        .unwrap();
        drain(&mut app);

        assert_eq!(*app.card.dialog_state(), DialogState::Closed);
        assert!(!app.dialog.is_open());
        let (notification, _) = app.notification.clone().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert!(notification.message.starts_with("switch.gi1"));
    }

    #[test]
    fn quit_key_ignored_while_dialog_open() {
        let mut app = App::new(None, &json!({ "ports": ["switch.gi1"] }));
        app.process_action(&Action::StatesUpdated(snapshot())).unwrap();
        app.process_action(&open("switch.gi1")).unwrap();

        let action = app.handle_key_event(KeyCode::Char('q').into()).unwrap();
        assert!(matches!(action, Some(Action::Card(Interaction::CloseDialog))));
        app.process_action(&action.unwrap()).unwrap();
        assert!(!app.dialog.is_open());
        assert!(app.running);
    }

    #[test]
    fn notifications_expire() {
        let mut app = App::new(None, &json!({ "ports": ["switch.gi1"] }));
        app.notify(Notification {
            message: "hello".into(),
            level: NotificationLevel::Info,
        });
        for _ in 0..NOTIFICATION_TICKS {
            app.process_action(&Action::Tick).unwrap();
        }
        assert!(app.notification.is_none());
    }
}
