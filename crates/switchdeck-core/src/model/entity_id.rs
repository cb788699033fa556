// ── Entity identity ──
//
// Home Assistant entity ids are `<domain>.<object_id>` strings. The
// newtype keeps them distinct from free text and exposes the domain.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical identifier for a Home Assistant entity (`switch.core_gi1_0_1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix before the first `.`, or `None` for ids without one.
    pub fn domain(&self) -> Option<&str> {
        self.0.split_once('.').map(|(domain, _)| domain)
    }

    /// Everything after the first `.`.
    pub fn object_id(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, object)| object)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_is_prefix_before_first_dot() {
        let id = EntityId::from("switch.core.gi1_0_1");
        assert_eq!(id.domain(), Some("switch"));
        assert_eq!(id.object_id(), Some("core.gi1_0_1"));
    }

    #[test]
    fn id_without_dot_has_no_domain() {
        assert_eq!(EntityId::from("p1").domain(), None);
    }

    #[test]
    fn orders_lexically() {
        let mut ids = vec![EntityId::from("switch.b"), EntityId::from("switch.a")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "switch.a");
    }
}
