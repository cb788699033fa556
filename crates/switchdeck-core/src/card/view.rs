//! The view tree produced by the renderer.
//!
//! Hosts paint this tree; they never inspect card internals. Every
//! interactive element carries an [`Interaction`] keyed by entity id,
//! which the host feeds back into [`PortCard::dispatch`](super::PortCard::dispatch).

use serde::Serialize;

use crate::model::{EntityId, LayoutKind, PortStatus};

/// Root of a rendered card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub title: Option<String>,
    pub body: CardBody,
    pub dialog: Option<DialogView>,
}

impl CardView {
    /// Layout actually used for this render, `None` for the empty state.
    pub fn layout(&self) -> Option<LayoutKind> {
        match self.body {
            CardBody::Empty { .. } => None,
            CardBody::Grid { .. } => Some(LayoutKind::Grid),
            CardBody::Image { .. } => Some(LayoutKind::Image),
        }
    }

    /// Every port-level interaction in paint order.
    pub fn interactions(&self) -> Vec<&Interaction> {
        match &self.body {
            CardBody::Empty { .. } => Vec::new(),
            CardBody::Grid { tiles } => tiles.iter().map(|t| &t.on_click).collect(),
            CardBody::Image { markers, .. } => markers.iter().map(|m| &m.on_click).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardBody {
    Empty {
        message: String,
    },
    Grid {
        tiles: Vec<PortTile>,
    },
    Image {
        image: String,
        marker_size: f64,
        markers: Vec<PortMarker>,
    },
}

/// One grid tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortTile {
    pub entity_id: EntityId,
    pub name: String,
    pub status: PortStatus,
    pub color: &'static str,
    pub description: Option<String>,
    pub on_click: Interaction,
}

/// One marker over the background image, positioned in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortMarker {
    pub entity_id: EntityId,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub label: String,
    pub status: PortStatus,
    pub color: &'static str,
    pub on_click: Interaction,
}

// ── Dialog ──────────────────────────────────────────────────────────

/// The modal detail/edit dialog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogView {
    pub entity_id: EntityId,
    pub title: String,
    /// `None` when the entity has vanished from the snapshot.
    pub status: Option<PortStatus>,
    pub description: Option<String>,
    pub details: Vec<DetailRow>,
    pub toggle: Option<ToggleAction>,
    pub editor: Option<DescriptionEditor>,
    pub on_close: Interaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleAction {
    pub label: &'static str,
    pub interaction: Interaction,
}

/// Description editor, prefilled with the current text. The host turns
/// the submitted text into [`Interaction::SetDescription`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionEditor {
    pub initial: String,
}

// ── Interactions ────────────────────────────────────────────────────

/// Everything a user can do to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Interaction {
    OpenDialog { entity_id: EntityId },
    CloseDialog,
    Toggle { entity_id: EntityId, desired_on: bool },
    SetDescription { entity_id: EntityId, text: String },
}

impl Interaction {
    pub fn entity_id(&self) -> Option<&EntityId> {
        match self {
            Self::OpenDialog { entity_id }
            | Self::Toggle { entity_id, .. }
            | Self::SetDescription { entity_id, .. } => Some(entity_id),
            Self::CloseDialog => None,
        }
    }
}
