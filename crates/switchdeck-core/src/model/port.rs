// ── Port configuration and derived port types ──

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::entity_id::EntityId;
use super::state::EntityState;

/// Default marker diameter for image layout, in pixels.
pub const DEFAULT_MARKER_SIZE: f64 = 26.0;

// ── PortLabel ───────────────────────────────────────────────────────

/// Explicit label as configured: free text or a number, passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortLabel {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for PortLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ── PortConfig ──────────────────────────────────────────────────────

/// One configured port. Coordinates are percentages of the image box and
/// are only ever `Some` when finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortConfig {
    pub entity_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<PortLabel>,
}

impl PortConfig {
    pub fn new(entity_id: impl Into<EntityId>) -> Self {
        Self {
            entity_id: entity_id.into(),
            x: None,
            y: None,
            label: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x).filter(|v| v.is_finite());
        self.y = Some(y).filter(|v| v.is_finite());
        self
    }

    pub fn labelled(mut self, label: PortLabel) -> Self {
        self.label = Some(label);
        self
    }

    /// Both coordinates present and inside the `[0, 100]` percentage box.
    pub fn has_percentage_position(&self) -> bool {
        matches!((self.x, self.y), (Some(x), Some(y))
            if (0.0..=100.0).contains(&x) && (0.0..=100.0).contains(&y))
    }
}

// ── LayoutKind ──────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LayoutKind {
    #[default]
    Grid,
    Image,
}

// ── DiscoveryPhase ──────────────────────────────────────────────────

/// Where the port list of a card came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPhase {
    /// Ports were configured explicitly.
    #[default]
    Disabled,
    /// No ports configured; waiting for the discovery result.
    Pending,
    /// Discovery finished (possibly with nothing found).
    Complete,
}

// ── CardConfig ──────────────────────────────────────────────────────

/// Canonical card configuration produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    pub title: Option<String>,
    pub image: Option<String>,
    pub layout: LayoutKind,
    pub marker_size: f64,
    pub ports: Vec<PortConfig>,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub discovery: DiscoveryPhase,
}

impl CardConfig {
    pub fn has_device_identity(&self) -> bool {
        self.device_id.is_some() || self.device_name.is_some()
    }

    /// True while the port list is expected to come from discovery.
    pub fn uses_discovery(&self) -> bool {
        self.discovery != DiscoveryPhase::Disabled
    }

    /// Replace the (empty) port list with discovered entity ids.
    pub fn with_discovered_ports(mut self, entity_ids: Vec<EntityId>) -> Self {
        self.ports = entity_ids.into_iter().map(PortConfig::new).collect();
        self.discovery = DiscoveryPhase::Complete;
        self
    }
}

// ── PortStatus ──────────────────────────────────────────────────────

/// Three-way status classification, the single source of truth for
/// colour and state text in every layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PortStatus {
    On,
    Off,
    Unknown,
}

impl PortStatus {
    /// Case-sensitive on the literals `"on"` and `"off"`.
    pub fn classify(state: &str) -> Self {
        match state {
            "on" => Self::On,
            "off" => Self::Off,
            _ => Self::Unknown,
        }
    }

    /// Marker / indicator colour as a hex RGB string.
    pub fn color(self) -> &'static str {
        match self {
            Self::On => "#2e7d32",
            Self::Off => "#c62828",
            Self::Unknown => "#9e9e9e",
        }
    }

    /// Whether an administrative toggle makes sense from this status.
    pub fn is_toggleable(self) -> bool {
        matches!(self, Self::On | Self::Off)
    }
}

// ── ResolvedPort ────────────────────────────────────────────────────

/// A configured port joined with its live state. Only exists for ports
/// present in the current snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPort {
    pub entity_id: EntityId,
    pub entity_state: Arc<EntityState>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub label: Option<PortLabel>,
}

impl ResolvedPort {
    pub fn status(&self) -> PortStatus {
        self.entity_state.status()
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }

    /// Label, then friendly name, then the raw entity id.
    pub fn display_name(&self) -> String {
        if let Some(label) = &self.label {
            return label.to_string();
        }
        self.entity_state
            .friendly_name()
            .map_or_else(|| self.entity_id.to_string(), str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn classification_is_case_sensitive() {
        assert_eq!(PortStatus::classify("on"), PortStatus::On);
        assert_eq!(PortStatus::classify("off"), PortStatus::Off);
        assert_eq!(PortStatus::classify("ON"), PortStatus::Unknown);
        assert_eq!(PortStatus::classify("Off"), PortStatus::Unknown);
        assert_eq!(PortStatus::classify("unavailable"), PortStatus::Unknown);
        assert_eq!(PortStatus::classify(""), PortStatus::Unknown);
    }

    #[test]
    fn every_status_has_distinct_colour() {
        let colours: std::collections::HashSet<_> =
            PortStatus::iter().map(PortStatus::color).collect();
        assert_eq!(colours.len(), 3);
    }

    #[test]
    fn layout_parses_case_insensitively() {
        assert_eq!("IMAGE".parse::<LayoutKind>().ok(), Some(LayoutKind::Image));
        assert_eq!("grid".parse::<LayoutKind>().ok(), Some(LayoutKind::Grid));
        assert!("masonry".parse::<LayoutKind>().is_err());
    }

    #[test]
    fn non_finite_coordinates_are_dropped() {
        let port = PortConfig::new("p1").at(f64::NAN, 10.0);
        assert_eq!(port.x, None);
        assert_eq!(port.y, Some(10.0));
        assert!(!port.has_percentage_position());
    }

    #[test]
    fn display_name_fallback_chain() {
        let state = Arc::new(EntityState::new("on").with_attribute("friendly_name", "Uplink"));
        let mut port = ResolvedPort {
            entity_id: EntityId::from("switch.p1"),
            entity_state: state,
            x: None,
            y: None,
            label: Some(PortLabel::Text("U1".into())),
        };
        assert_eq!(port.display_name(), "U1");
        port.label = None;
        assert_eq!(port.display_name(), "Uplink");
        port.entity_state = Arc::new(EntityState::new("on"));
        assert_eq!(port.display_name(), "switch.p1");
    }
}
