// ── Wire → domain conversions ──
//
// Maps `switchdeck_api` wire types onto the core model. Fields the engine
// never reads are dropped here.

use switchdeck_api::{DeviceRegistryEntry, EntityRegistryEntry, StateObject};

use crate::model::{DeviceEntry, EntityEntry, EntityId, EntityState};

impl From<DeviceRegistryEntry> for DeviceEntry {
    fn from(raw: DeviceRegistryEntry) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            name_by_user: raw.name_by_user,
        }
    }
}

impl From<EntityRegistryEntry> for EntityEntry {
    fn from(raw: EntityRegistryEntry) -> Self {
        Self {
            entity_id: EntityId::from(raw.entity_id),
            device_id: raw.device_id,
            platform: raw.platform,
        }
    }
}

impl From<StateObject> for EntityState {
    fn from(raw: StateObject) -> Self {
        Self {
            state: raw.state,
            attributes: raw.attributes,
        }
    }
}

/// Split a state object into its id and state.
pub fn state_entry(raw: StateObject) -> (EntityId, EntityState) {
    let id = EntityId::from(raw.entity_id.as_str());
    (id, EntityState::from(raw))
}
