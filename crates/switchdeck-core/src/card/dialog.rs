//! Dialog controller: `Closed | OpenFor(entity)`.
//!
//! Open and close are synchronous. Confirmed actions keep the dialog
//! open until the gateway reports back, then close it.

use serde::Serialize;

use crate::model::EntityId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "entity_id", rename_all = "snake_case")]
pub enum DialogState {
    #[default]
    Closed,
    OpenFor(EntityId),
}

impl DialogState {
    pub fn entity_id(&self) -> Option<&EntityId> {
        match self {
            Self::Closed => None,
            Self::OpenFor(id) => Some(id),
        }
    }

    pub fn is_open_for(&self, entity_id: &EntityId) -> bool {
        self.entity_id() == Some(entity_id)
    }
}

/// Dialog state plus the single action that may be in flight.
#[derive(Debug, Clone, Default)]
pub struct DialogController {
    state: DialogState,
    in_flight: Option<EntityId>,
}

impl DialogController {
    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn open(&mut self, entity_id: EntityId) {
        self.state = DialogState::OpenFor(entity_id);
    }

    pub fn close(&mut self) {
        self.state = DialogState::Closed;
    }

    /// Whether a confirmed action for `entity_id` is still running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Mark an action as started. Only one action runs at a time and only
    /// for the entity the dialog is open for.
    pub fn begin_action(&mut self, entity_id: &EntityId) -> bool {
        if self.in_flight.is_some() || !self.state.is_open_for(entity_id) {
            return false;
        }
        self.in_flight = Some(entity_id.clone());
        true
    }

    /// Gateway completion: close the dialog if it still belongs to the
    /// entity the action was for.
    pub fn complete_action(&mut self, entity_id: &EntityId) {
        if self.in_flight.as_ref() == Some(entity_id) {
            self.in_flight = None;
        }
        if self.state.is_open_for(entity_id) {
            self.close();
        }
    }
}
