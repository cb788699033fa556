//! Port dialog overlay: details, toggle, and description editing.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use throbber_widgets_tui::{Throbber, ThrobberState};

use switchdeck_core::{DialogView, Interaction};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::status_indicator::status_span;

const DIALOG_WIDTH: u16 = 56;

#[derive(Default)]
pub struct PortDialog {
    view: Option<DialogView>,
    busy: bool,
    /// Description buffer while the editor is open.
    editing: Option<String>,
    throbber_state: ThrobberState,
}

impl PortDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.view.is_some()
    }

    /// Take the dialog slice of a fresh render. The edit buffer survives
    /// re-renders for the same entity and is dropped otherwise.
    pub fn set_view(&mut self, view: Option<DialogView>, busy: bool) {
        let same_entity = matches!(
            (&self.view, &view),
            (Some(old), Some(new)) if old.entity_id == new.entity_id
        );
        if !same_entity || view.as_ref().is_some_and(|v| v.editor.is_none()) {
            self.editing = None;
        }
        self.view = view;
        self.busy = busy;
    }

    fn handle_editing_key(&mut self, key: KeyEvent, view: &DialogView) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.editing = None;
                None
            }
            KeyCode::Enter => {
                let text = self.editing.take().unwrap_or_default();
                Some(Action::Card(Interaction::SetDescription {
                    entity_id: view.entity_id.clone(),
                    text,
                }))
            }
            KeyCode::Backspace => {
                if let Some(buffer) = self.editing.as_mut() {
                    buffer.pop();
                }
                None
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(buffer) = self.editing.as_mut() {
                    buffer.clear();
                }
                None
            }
            KeyCode::Char(c) => {
                if let Some(buffer) = self.editing.as_mut() {
                    buffer.push(c);
                }
                None
            }
            _ => None,
        }
    }

    fn body_lines(view: &DialogView) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        match view.status {
            Some(status) => lines.push(Line::from(vec![
                Span::styled("Status       ", theme::key_hint()),
                status_span(status),
            ])),
            None => lines.push(Line::from(Span::styled(
                "This port is no longer reported by Home Assistant.",
                Style::default().fg(theme::ELECTRIC_YELLOW),
            ))),
        }

        for row in &view.details {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<13}", row.label), theme::key_hint()),
                Span::styled(row.value.clone(), theme::text()),
            ]));
        }

        if view.status.is_some() {
            lines.push(Line::from(vec![
                Span::styled("Description  ", theme::key_hint()),
                Span::styled(
                    view.description.clone().unwrap_or_else(|| "(none)".into()),
                    theme::text(),
                ),
            ]));
        }
        lines
    }

    fn hint_line(&self, view: &DialogView) -> Line<'static> {
        let mut spans = Vec::new();
        let mut hint = |key: &str, label: &str| {
            spans.push(Span::styled(format!(" {key} "), theme::key_hint_key()));
            spans.push(Span::styled(format!("{label} "), theme::key_hint()));
        };

        if self.editing.is_some() {
            hint("Enter", "save");
            hint("Esc", "cancel");
        } else {
            if let Some(toggle) = &view.toggle {
                hint("t", toggle.label);
            }
            if view.editor.is_some() {
                hint("e", "edit description");
            }
            hint("Esc", "close");
        }
        Line::from(spans)
    }
}

impl Component for PortDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let Some(view) = self.view.clone() else {
            return Ok(None);
        };
        if self.busy {
            return Ok(None);
        }
        if self.editing.is_some() {
            return Ok(self.handle_editing_key(key, &view));
        }

        let action = match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Some(Action::Card(view.on_close.clone())),
            KeyCode::Char('t') => view
                .toggle
                .as_ref()
                .map(|toggle| Action::Card(toggle.interaction.clone())),
            KeyCode::Char('e') => {
                self.editing = view.editor.as_ref().map(|editor| editor.initial.clone());
                None
            }
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if matches!(action, Action::Tick) && self.busy {
            self.throbber_state.calc_next();
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let Some(view) = &self.view else {
            return;
        };

        let body = Self::body_lines(view);
        let body_height = u16::try_from(body.len()).unwrap_or(u16::MAX);
        let editor_height = if self.editing.is_some() { 3 } else { 0 };
        let height = body_height
            .saturating_add(editor_height)
            .saturating_add(4)
            .min(area.height);
        let width = DIALOG_WIDTH.min(area.width);
        let popup = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        );

        frame.render_widget(Clear, popup);
        let block = Block::default()
            .title(Span::styled(format!(" {} ", view.title), theme::title_style()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
            .style(Style::default().bg(theme::BG_DARK));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let [body_area, editor_area, _, footer_area] = Layout::vertical([
            Constraint::Length(body_height),
            Constraint::Length(editor_height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(inner);

        frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: false }), body_area);

        if let Some(buffer) = &self.editing {
            let input = Block::default()
                .title(Span::styled(" Description ", theme::key_hint()))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme::ELECTRIC_PURPLE));
            let input_inner = input.inner(editor_area);
            frame.render_widget(input, editor_area);
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(buffer.clone(), theme::text()),
                    Span::styled("▏", Style::default().fg(theme::NEON_CYAN)),
                ])),
                input_inner,
            );
        }

        if self.busy {
            let throbber = Throbber::default()
                .label(" Applying...")
                .style(Style::default().fg(theme::NEON_CYAN))
                .throbber_style(Style::default().fg(theme::ELECTRIC_PURPLE));
            frame.render_stateful_widget(throbber, footer_area, &mut self.throbber_state.clone());
        } else {
            frame.render_widget(Paragraph::new(self.hint_line(view)), footer_area);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use switchdeck_core::{EntityId, EntityState, PortCard, StateSnapshot};

    fn dialog_for(state: &str) -> DialogView {
        let mut card = PortCard::new();
        card.on_config_change(&json!({ "ports": ["switch.gi1"] })).unwrap();
        card.on_state_change(
            [(
                EntityId::from("switch.gi1"),
                EntityState::new(state).with_attribute("Alias", "uplink"),
            )]
            .into_iter()
            .collect::<StateSnapshot>(),
        );
        card.dispatch(Interaction::OpenDialog {
            entity_id: "switch.gi1".into(),
        });
        card.render().unwrap().dialog.unwrap()
    }

    fn press(dialog: &mut PortDialog, code: KeyCode) -> Option<Action> {
        dialog.handle_key_event(code.into()).unwrap()
    }

    #[test]
    fn toggle_key_emits_toggle_interaction() {
        let mut dialog = PortDialog::new();
        dialog.set_view(Some(dialog_for("on")), false);
        let Some(Action::Card(interaction)) = press(&mut dialog, KeyCode::Char('t')) else {
            panic!("expected toggle");
        };
        assert_eq!(
            interaction,
            Interaction::Toggle {
                entity_id: "switch.gi1".into(),
                desired_on: false
            }
        );
    }

    #[test]
    fn unknown_status_has_no_toggle() {
        let mut dialog = PortDialog::new();
        dialog.set_view(Some(dialog_for("unavailable")), false);
        assert!(press(&mut dialog, KeyCode::Char('t')).is_none());
    }

    #[test]
    fn editor_starts_prefilled_and_submits() {
        let mut dialog = PortDialog::new();
        dialog.set_view(Some(dialog_for("off")), false);
        press(&mut dialog, KeyCode::Char('e'));
        assert_eq!(dialog.editing.as_deref(), Some("uplink"));

        for _ in 0.."uplink".len() {
            press(&mut dialog, KeyCode::Backspace);
        }
        for c in "core".chars() {
            press(&mut dialog, KeyCode::Char(c));
        }
        let Some(Action::Card(interaction)) = press(&mut dialog, KeyCode::Enter) else {
            panic!("expected submit");
        };
        assert_eq!(
            interaction,
            Interaction::SetDescription {
                entity_id: "switch.gi1".into(),
                text: "core".into()
            }
        );
        assert!(dialog.editing.is_none());
    }

    #[test]
    fn busy_dialog_ignores_keys() {
        let mut dialog = PortDialog::new();
        dialog.set_view(Some(dialog_for("on")), true);
        assert!(press(&mut dialog, KeyCode::Char('t')).is_none());
        assert!(press(&mut dialog, KeyCode::Esc).is_none());
    }

    #[test]
    fn escape_closes() {
        let mut dialog = PortDialog::new();
        dialog.set_view(Some(dialog_for("on")), false);
        assert!(matches!(
            press(&mut dialog, KeyCode::Esc),
            Some(Action::Card(Interaction::CloseDialog))
        ));
    }
}
