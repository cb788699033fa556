// ── Entity state and snapshots ──
//
// `EntityState` is the typed view of one `{ state, attributes }` record.
// Attribute probing goes through the accessor layer below; every accessor
// documents the keys it tries, newest spelling first.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity_id::EntityId;
use super::port::PortStatus;

// ── Attribute keys ──────────────────────────────────────────────────

const FRIENDLY_NAME_KEYS: &[&str] = &["friendly_name"];
const DESCRIPTION_KEYS: &[&str] = &["Alias", "description"];
const PORT_INDEX_KEYS: &[&str] = &["Index", "index", "port"];
const INTERFACE_NAME_KEYS: &[&str] = &["Name", "name"];
const ADMIN_STATUS_KEYS: &[&str] = &["Admin", "admin_status"];
const OPER_STATUS_KEYS: &[&str] = &["Oper", "oper_status"];
const SPEED_KEYS: &[&str] = &["Speed", "speed"];
const VLAN_KEYS: &[&str] = &["VLAN ID", "vlan_id"];
const IP_KEYS: &[&str] = &["IP", "ip_cidr_str", "ip_address"];

// ── EntityState ─────────────────────────────────────────────────────

/// Live state of one entity as pushed by the host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityState {
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: Map::new(),
        }
    }

    /// Builder-style attribute insert, mostly for tests and fixtures.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Parse one `{ state, attributes }` record. A missing or non-string
    /// `state` makes the record unusable; non-object attributes are dropped.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let state = obj.get("state")?.as_str()?.to_owned();
        let attributes = obj
            .get("attributes")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Some(Self { state, attributes })
    }

    /// Three-way status classification of the primary state.
    pub fn status(&self) -> PortStatus {
        PortStatus::classify(&self.state)
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// First present, non-null attribute among `keys`.
    pub fn attribute(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.attributes.get(*key))
            .find(|value| !value.is_null())
    }

    /// First attribute among `keys` rendered as display text. Strings,
    /// numbers and booleans qualify; structured values do not.
    pub fn attribute_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.attributes.get(*key))
            .find_map(scalar_text)
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.attribute(FRIENDLY_NAME_KEYS)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Port description (`ifAlias`).
    pub fn description(&self) -> Option<&str> {
        DESCRIPTION_KEYS
            .iter()
            .filter_map(|key| self.attributes.get(*key))
            .find_map(Value::as_str)
    }

    /// Numeric port index: a number or a numeric string, finite only.
    pub fn port_index(&self) -> Option<f64> {
        PORT_INDEX_KEYS
            .iter()
            .filter_map(|key| self.attributes.get(*key))
            .find_map(number_like)
    }

    /// Port index as display text, numeric or not (`"Gi1/0/1"` style ids).
    pub fn port_label(&self) -> Option<String> {
        self.attribute_text(PORT_INDEX_KEYS)
    }

    /// Interface name (`ifName`).
    pub fn interface_name(&self) -> Option<&str> {
        INTERFACE_NAME_KEYS
            .iter()
            .filter_map(|key| self.attributes.get(*key))
            .find_map(Value::as_str)
    }

    pub fn admin_status(&self) -> Option<String> {
        self.attribute_text(ADMIN_STATUS_KEYS)
    }

    pub fn oper_status(&self) -> Option<String> {
        self.attribute_text(OPER_STATUS_KEYS)
    }

    /// Link speed. Numeric values are bits per second and get a unit.
    pub fn speed(&self) -> Option<String> {
        let value = self.attribute(SPEED_KEYS)?;
        match value {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).map(format_bps),
            other => scalar_text(other),
        }
    }

    pub fn vlan_id(&self) -> Option<String> {
        self.attribute_text(VLAN_KEYS)
    }

    pub fn ip_address(&self) -> Option<String> {
        self.attribute_text(IP_KEYS)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Numbers and numeric strings, finite only.
pub(crate) fn number_like(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn format_bps(bps: f64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e9, "Gbps"), (1e6, "Mbps"), (1e3, "Kbps")];
    for (scale, unit) in UNITS {
        if bps >= scale {
            return format!("{:.1} {unit}", bps / scale);
        }
    }
    format!("{bps} bps")
}

// ── StateSnapshot ───────────────────────────────────────────────────

/// Complete, immutable set of entity states at one point in time.
///
/// Cheap to clone: the map lives behind an `Arc` and is replaced
/// wholesale, never edited in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    entries: Arc<HashMap<EntityId, Arc<EntityState>>>,
}

impl StateSnapshot {
    pub fn new(entries: HashMap<EntityId, Arc<EntityState>>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Build from a JSON object `entity_id → { state, attributes }`.
    ///
    /// Total: anything that is not an object yields an empty snapshot and
    /// malformed records are skipped.
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        obj.iter()
            .filter_map(|(id, record)| {
                EntityState::from_json(record).map(|state| (EntityId::from(id.as_str()), state))
            })
            .collect()
    }

    pub fn get(&self, entity_id: &str) -> Option<&Arc<EntityState>> {
        self.entries.get(entity_id)
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entries.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Arc<EntityState>)> {
        self.entries.iter()
    }
}

impl FromIterator<(EntityId, EntityState)> for StateSnapshot {
    fn from_iter<I: IntoIterator<Item = (EntityId, EntityState)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(id, state)| (id, Arc::new(state)))
                .collect(),
        )
    }
}
