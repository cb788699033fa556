//! Raw card configuration → [`CardConfig`].
//!
//! The raw form is whatever the host stored: YAML or JSON decoded into a
//! `serde_json::Value`. Normalization is pure and runs in full on every
//! configuration push.

use serde_json::{Map, Value};

use crate::error::ConfigurationError;
use crate::model::state::number_like;
use crate::model::{
    CardConfig, DEFAULT_MARKER_SIZE, DiscoveryPhase, LayoutKind, PortConfig, PortLabel,
};

/// Normalize a raw configuration mapping.
pub fn normalize(raw: &Value) -> Result<CardConfig, ConfigurationError> {
    let obj = raw.as_object().ok_or(ConfigurationError::NotAnObject)?;

    let title = optional_string(obj, "title")?;
    let image = optional_string(obj, "image")?;
    let device_id = optional_string(obj, "device_id")?;
    let device_name = optional_string(obj, "device_name")?;

    let ports = match port_source(obj) {
        Some((field, value)) => normalize_ports(field, value)?,
        None => Vec::new(),
    };

    let discovery = if !ports.is_empty() {
        DiscoveryPhase::Disabled
    } else if device_id.is_some() || device_name.is_some() {
        DiscoveryPhase::Pending
    } else {
        return Err(ConfigurationError::NoPorts);
    };

    let marker_size = obj
        .get("marker_size")
        .and_then(number_like)
        .filter(|size| *size > 0.0)
        .unwrap_or(DEFAULT_MARKER_SIZE);

    let layout = obj
        .get("layout")
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse::<LayoutKind>().ok())
        .unwrap_or_else(|| auto_layout(&ports));

    Ok(CardConfig {
        title,
        image,
        layout,
        marker_size,
        ports,
        device_id,
        device_name,
        discovery,
    })
}

/// Default layout: image only when there is at least one port and every
/// port sits inside the percentage box.
pub fn auto_layout(ports: &[PortConfig]) -> LayoutKind {
    if !ports.is_empty() && ports.iter().all(PortConfig::has_percentage_position) {
        LayoutKind::Image
    } else {
        LayoutKind::Grid
    }
}

/// `ports` wins over the historical `entities` whenever it is present.
fn port_source(obj: &Map<String, Value>) -> Option<(&'static str, &Value)> {
    ["ports", "entities"]
        .into_iter()
        .find_map(|field| obj.get(field).filter(|v| !v.is_null()).map(|v| (field, v)))
}

fn normalize_ports(field: &'static str, value: &Value) -> Result<Vec<PortConfig>, ConfigurationError> {
    let entries = value
        .as_array()
        .ok_or(ConfigurationError::InvalidPorts { field })?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| normalize_entry(index, entry))
        .collect()
}

fn normalize_entry(index: usize, entry: &Value) -> Result<PortConfig, ConfigurationError> {
    match entry {
        Value::String(id) => non_empty(id)
            .map(PortConfig::new)
            .ok_or(ConfigurationError::MissingEntity { index }),
        Value::Object(obj) => {
            let entity_id = ["entity", "entity_id"]
                .into_iter()
                .filter_map(|key| obj.get(key).and_then(Value::as_str))
                .find_map(non_empty)
                .ok_or(ConfigurationError::MissingEntity { index })?;

            Ok(PortConfig {
                entity_id: entity_id.into(),
                x: obj.get("x").and_then(number_like),
                y: obj.get("y").and_then(number_like),
                label: obj.get("label").and_then(label),
            })
        }
        _ => Err(ConfigurationError::InvalidEntry { index }),
    }
}

fn label(value: &Value) -> Option<PortLabel> {
    match value {
        Value::String(s) => Some(PortLabel::Text(s.clone())),
        Value::Number(n) => Some(PortLabel::Number(n.clone())),
        _ => None,
    }
}

/// Blank strings are absent; anything else passes through untouched.
fn non_empty(s: &str) -> Option<&str> {
    (!s.trim().is_empty()).then_some(s)
}

/// `null` and blank strings count as absent; other non-strings are errors.
fn optional_string(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ConfigurationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(non_empty(s).map(str::to_owned)),
        Some(_) => Err(ConfigurationError::InvalidField { field }),
    }
}
