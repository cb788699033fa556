//! Port status indicator: ●/○/? with the card's status colors.

use ratatui::style::Style;
use ratatui::text::Span;
use switchdeck_core::PortStatus;

use crate::theme;

pub fn status_symbol(status: PortStatus) -> &'static str {
    match status {
        PortStatus::On => "●",
        PortStatus::Off => "○",
        PortStatus::Unknown => "?",
    }
}

/// Returns a styled `Span` with the status dot and its label.
pub fn status_span(status: PortStatus) -> Span<'static> {
    Span::styled(
        format!("{} {status}", status_symbol(status)),
        Style::default().fg(theme::status_color(status)),
    )
}
