//! Port panel: grid tiles or positioned markers, with a selection
//! cursor and mouse hit-testing.

use std::cell::Cell;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};

use switchdeck_core::card::view::{PortMarker, PortTile};
use switchdeck_core::{CardBody, CardView, Interaction};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::status_indicator::{status_span, status_symbol};

const TILE_WIDTH: u16 = 24;
const TILE_HEIGHT: u16 = 4;

#[derive(Default)]
pub struct PortPanel {
    view: Option<CardView>,
    selected: usize,
    /// Body area from the last render, for mouse hit-testing.
    body_area: Cell<Rect>,
}

impl PortPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_view(&mut self, view: Option<CardView>) {
        self.view = view;
        let count = self.targets().len();
        if self.selected >= count {
            self.selected = count.saturating_sub(1);
        }
    }

    fn targets(&self) -> Vec<&Interaction> {
        self.view
            .as_ref()
            .map(CardView::interactions)
            .unwrap_or_default()
    }

    fn select_offset(&mut self, delta: isize) {
        let count = self.targets().len();
        if count == 0 {
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(count - 1);
    }

    fn grid_columns(&self) -> isize {
        let columns = (self.body_area.get().width / TILE_WIDTH).max(1);
        isize::from(i16::try_from(columns).unwrap_or(i16::MAX))
    }

    fn activate(&self, index: usize) -> Option<Action> {
        self.targets()
            .get(index)
            .map(|interaction| Action::Card((*interaction).clone()))
    }

    /// Index of the tile or marker under a screen cell.
    fn hit_test(&self, column: u16, row: u16) -> Option<usize> {
        let area = self.body_area.get();
        let view = self.view.as_ref()?;
        let rects = match &view.body {
            CardBody::Empty { .. } => return None,
            CardBody::Grid { tiles } => tile_rects(area, tiles.len()),
            CardBody::Image { markers, .. } => marker_rects(area, markers),
        };
        rects
            .iter()
            .position(|rect| rect.contains((column, row).into()))
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render_tiles(&self, frame: &mut Frame, area: Rect, tiles: &[PortTile]) {
        for (index, (tile, rect)) in tiles.iter().zip(tile_rects(area, tiles.len())).enumerate() {
            let border = if index == self.selected {
                theme::border_focused()
            } else {
                theme::border_default()
            };
            let name_style = if index == self.selected {
                theme::selected()
            } else {
                theme::title_style()
            };

            let block = Block::default()
                .title(Span::styled(format!(" {} ", tile.name), name_style))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border);

            let mut lines = vec![Line::from(status_span(tile.status))];
            if let Some(description) = &tile.description {
                lines.push(Line::from(Span::styled(description.clone(), theme::key_hint())));
            }

            let inner = block.inner(rect);
            frame.render_widget(block, rect);
            frame.render_widget(Paragraph::new(lines), inner);
        }
    }

    fn render_markers(&self, frame: &mut Frame, area: Rect, image: &str, markers: &[PortMarker]) {
        // Caption first; markers on the bottom row paint over it.
        let caption_row = Rect::new(area.x, area.bottom().saturating_sub(1), area.width, 1.min(area.height));
        frame.render_widget(
            Paragraph::new(Span::styled(format!("{image} "), theme::key_hint()))
                .alignment(Alignment::Right),
            caption_row,
        );

        for (index, (marker, rect)) in markers.iter().zip(marker_rects(area, markers)).enumerate() {
            let mut style = Style::default()
                .fg(theme::BG_DARK)
                .bg(theme::status_color(marker.status));
            if index == self.selected {
                style = theme::selected();
            }
            let text = format!("{}{}", status_symbol(marker.status), marker.label);
            frame.render_widget(Paragraph::new(Span::styled(text, style)), rect);
        }
    }
}

impl Component for PortPanel {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let grid = matches!(
            self.view.as_ref().map(|v| &v.body),
            Some(CardBody::Grid { .. })
        );
        let row_step = if grid { self.grid_columns() } else { 1 };

        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.select_offset(-1),
            KeyCode::Right | KeyCode::Char('l') => self.select_offset(1),
            KeyCode::Up | KeyCode::Char('k') => self.select_offset(-row_step),
            KeyCode::Down | KeyCode::Char('j') => self.select_offset(row_step),
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => {
                self.selected = self.targets().len().saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => return Ok(self.activate(self.selected)),
            _ => {}
        }
        Ok(None)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return Ok(None);
        }
        let Some(index) = self.hit_test(mouse.column, mouse.row) else {
            return Ok(None);
        };
        self.selected = index;
        Ok(self.activate(index))
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = self
            .view
            .as_ref()
            .and_then(|v| v.title.clone())
            .unwrap_or_else(|| "Switch".into());

        let block = Block::default()
            .title(Span::styled(format!(" {title} "), theme::title_style()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.body_area.set(inner);

        let Some(view) = &self.view else {
            frame.render_widget(
                Paragraph::new(Span::styled("No card configuration", theme::key_hint()))
                    .alignment(Alignment::Center),
                inner,
            );
            return;
        };

        match &view.body {
            CardBody::Empty { message } => {
                frame.render_widget(
                    Paragraph::new(Span::styled(message.clone(), theme::text()))
                        .alignment(Alignment::Center)
                        .wrap(Wrap { trim: true }),
                    inner,
                );
            }
            CardBody::Grid { tiles } => self.render_tiles(frame, inner, tiles),
            CardBody::Image { image, markers, .. } => {
                self.render_markers(frame, inner, image, markers);
            }
        }
    }
}

// ── Geometry ─────────────────────────────────────────────────────────

/// Tile rectangles in reading order. Tiles that would overflow the
/// bottom edge are not placed.
pub(crate) fn tile_rects(area: Rect, count: usize) -> Vec<Rect> {
    let columns = (area.width / TILE_WIDTH).max(1);
    let mut rects = Vec::with_capacity(count);
    let (mut column, mut row) = (0u16, 0u16);

    for _ in 0..count {
        let x = area.x.saturating_add(column.saturating_mul(TILE_WIDTH));
        let y = area.y.saturating_add(row.saturating_mul(TILE_HEIGHT));
        if y.saturating_add(TILE_HEIGHT) > area.bottom() {
            break;
        }
        let width = TILE_WIDTH.min(area.right().saturating_sub(x));
        rects.push(Rect::new(x, y, width, TILE_HEIGHT));

        column += 1;
        if column == columns {
            column = 0;
            row += 1;
        }
    }
    rects
}

/// Cell for a percentage position inside `area`. Out-of-range
/// percentages are pinned to the nearest edge.
#[allow(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn marker_cell(area: Rect, x: f64, y: f64) -> (u16, u16) {
    let scale = |percent: f64, span: u16| -> u16 {
        let max = f64::from(span.saturating_sub(1));
        (percent.clamp(0.0, 100.0) / 100.0 * max).round() as u16
    };
    (
        area.x.saturating_add(scale(x, area.width)),
        area.y.saturating_add(scale(y, area.height)),
    )
}

/// One-row marker rectangles, centered on each marker's cell and kept
/// inside `area`.
pub(crate) fn marker_rects(area: Rect, markers: &[PortMarker]) -> Vec<Rect> {
    markers
        .iter()
        .map(|marker| {
            let (column, row) = marker_cell(area, marker.x, marker.y);
            let label_width = u16::try_from(marker.label.chars().count())
                .unwrap_or(u16::MAX)
                .saturating_add(1);
            let width = label_width.min(area.width);
            let x = column
                .saturating_sub(width / 2)
                .max(area.x)
                .min(area.right().saturating_sub(width));
            Rect::new(x, row, width, 1)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ratatui::{Terminal, backend::TestBackend};
    use serde_json::json;
    use switchdeck_core::{EntityId, EntityState, PortCard, StateSnapshot};

    fn card_view(raw: &serde_json::Value, states: &[(&str, &str)]) -> CardView {
        let mut card = PortCard::new();
        card.on_config_change(raw).unwrap();
        let snapshot: StateSnapshot = states
            .iter()
            .map(|(id, state)| (EntityId::from(*id), EntityState::new(*state)))
            .collect();
        card.on_state_change(snapshot);
        card.render().unwrap()
    }

    #[test]
    fn tiles_wrap_by_width_and_stop_at_bottom() {
        let rects = tile_rects(Rect::new(0, 0, 50, 8), 5);
        assert_eq!(rects.len(), 4);
        assert_eq!(rects[1], Rect::new(TILE_WIDTH, 0, TILE_WIDTH, TILE_HEIGHT));
        assert_eq!(rects[2], Rect::new(0, TILE_HEIGHT, TILE_WIDTH, TILE_HEIGHT));
    }

    #[test]
    fn marker_cells_scale_and_clamp() {
        let area = Rect::new(10, 5, 101, 21);
        assert_eq!(marker_cell(area, 0.0, 0.0), (10, 5));
        assert_eq!(marker_cell(area, 50.0, 50.0), (60, 15));
        assert_eq!(marker_cell(area, 250.0, -3.0), (110, 5));
    }

    #[test]
    fn keyboard_selection_activates_port() {
        let mut panel = PortPanel::new();
        panel.set_view(Some(card_view(
            &json!({ "ports": ["p1", "p2"] }),
            &[("p1", "on"), ("p2", "off")],
        )));

        panel.handle_key_event(KeyCode::Right.into()).unwrap();
        let action = panel.handle_key_event(KeyCode::Enter.into()).unwrap();
        let Some(Action::Card(Interaction::OpenDialog { entity_id })) = action else {
            panic!("expected open-dialog action");
        };
        assert_eq!(entity_id.as_str(), "p2");
    }

    #[test]
    fn click_on_marker_opens_its_dialog() {
        let mut panel = PortPanel::new();
        panel.set_view(Some(card_view(
            &json!({ "image": "rack.png", "ports": [
                { "entity": "p1", "x": 0, "y": 0 },
                { "entity": "p2", "x": 100, "y": 100 }
            ] }),
            &[("p1", "on"), ("p2", "off")],
        )));

        let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.area();
                panel.render(frame, area);
            })
            .unwrap();

        let body = panel.body_area.get();
        let rects = marker_rects(body, match &panel.view.as_ref().unwrap().body {
            CardBody::Image { markers, .. } => markers,
            _ => panic!("expected image layout"),
        });
        let target = rects[1];
        let action = panel
            .handle_mouse_event(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: target.x,
                row: target.y,
                modifiers: crossterm::event::KeyModifiers::NONE,
            })
            .unwrap();
        assert!(matches!(
            action,
            Some(Action::Card(Interaction::OpenDialog { ref entity_id })) if entity_id.as_str() == "p2"
        ));
    }

    #[test]
    fn renders_empty_state_message() {
        let mut panel = PortPanel::new();
        panel.set_view(Some(card_view(&json!({ "ports": ["p1"] }), &[])));

        let mut terminal = Terminal::new(TestBackend::new(70, 6)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.area();
                panel.render(frame, area);
            })
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect();
        assert!(text.contains("No port state available"));
    }
}
