// ── Action gateway ──
//
// The two mutating operations a card can issue. Both go through the
// host's service-call interface, are attempted once, and report back an
// `ActionOutcome` whatever happens. The next state push is the only
// confirmation.

use serde_json::json;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::host::ServiceCaller;
use crate::integration::{INTEGRATION_PLATFORM, SET_DESCRIPTION_SERVICE, SWITCH_DOMAIN};
use crate::model::EntityId;

/// A confirmed dialog action, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortAction {
    Toggle { entity_id: EntityId, desired_on: bool },
    SetDescription { entity_id: EntityId, text: String },
}

impl PortAction {
    pub fn entity_id(&self) -> &EntityId {
        match self {
            Self::Toggle { entity_id, .. } | Self::SetDescription { entity_id, .. } => entity_id,
        }
    }
}

/// Completion report for a [`PortAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: PortAction,
    /// Error text when the service call failed.
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Issues port actions through a [`ServiceCaller`].
#[derive(Debug, Clone)]
pub struct ActionGateway<S> {
    caller: S,
}

impl<S: ServiceCaller> ActionGateway<S> {
    pub fn new(caller: S) -> Self {
        Self { caller }
    }

    /// `switch.turn_on` / `switch.turn_off` for one entity.
    pub async fn toggle_administrative_state(
        &self,
        entity_id: &EntityId,
        desired_on: bool,
    ) -> Result<(), CoreError> {
        let service = if desired_on { "turn_on" } else { "turn_off" };
        debug!(entity_id = %entity_id, service, "toggling port");
        self.caller
            .call_service(SWITCH_DOMAIN, service, json!({ "entity_id": entity_id }))
            .await
    }

    /// `snmp_switch_manager.set_port_description`.
    pub async fn set_description(&self, entity_id: &EntityId, text: &str) -> Result<(), CoreError> {
        debug!(entity_id = %entity_id, "setting port description");
        self.caller
            .call_service(
                INTEGRATION_PLATFORM,
                SET_DESCRIPTION_SERVICE,
                json!({ "entity_id": entity_id, "description": text }),
            )
            .await
    }

    /// Run an action once. Failures are logged, never retried.
    pub async fn execute(&self, action: PortAction) -> ActionOutcome {
        let result = match &action {
            PortAction::Toggle {
                entity_id,
                desired_on,
            } => self.toggle_administrative_state(entity_id, *desired_on).await,
            PortAction::SetDescription { entity_id, text } => {
                self.set_description(entity_id, text).await
            }
        };

        let error = result.err().map(|e| {
            warn!(entity_id = %action.entity_id(), error = %e, "port action failed");
            e.to_string()
        });
        ActionOutcome { action, error }
    }
}
