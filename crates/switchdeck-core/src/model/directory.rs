// ── Registry records ──
//
// The subset of Home Assistant's device and entity registries that port
// discovery reads.

use serde::{Deserialize, Serialize};

use super::entity_id::EntityId;

/// One device from the device registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    pub name: Option<String>,
    pub name_by_user: Option<String>,
}

impl DeviceEntry {
    /// Exact match against either the integration-assigned or the
    /// user-assigned name.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name) || self.name_by_user.as_deref() == Some(name)
    }
}

/// One entity from the entity registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEntry {
    pub entity_id: EntityId,
    pub device_id: Option<String>,
    pub platform: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: Option<&str>, by_user: Option<&str>) -> DeviceEntry {
        DeviceEntry {
            id: "dev1".into(),
            name: name.map(String::from),
            name_by_user: by_user.map(String::from),
        }
    }

    #[test]
    fn matches_either_name_exactly() {
        assert!(device(Some("SW1"), None).matches_name("SW1"));
        assert!(device(Some("switch"), Some("SW1")).matches_name("SW1"));
        assert!(!device(Some("sw1"), None).matches_name("SW1"));
    }
}
