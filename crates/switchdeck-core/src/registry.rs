// ── Card registry ──
//
// Host-wide list of card types a dashboard can offer. Populated once at
// process start by `register_builtin_cards`; the engine itself never
// touches it.

use serde::Serialize;
use tracing::{debug, warn};

use crate::card::PortCard;

/// How a card type presents itself to a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardDescriptor {
    #[serde(rename = "type")]
    pub card_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Default)]
pub struct CardRegistry {
    cards: Vec<CardDescriptor>,
}

impl CardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a card type. Re-registering a type keeps the first entry.
    pub fn register(&mut self, descriptor: CardDescriptor) -> bool {
        if self.get(descriptor.card_type).is_some() {
            warn!(card_type = descriptor.card_type, "card type already registered");
            return false;
        }
        debug!(card_type = descriptor.card_type, "registered card type");
        self.cards.push(descriptor);
        true
    }

    pub fn get(&self, card_type: &str) -> Option<&CardDescriptor> {
        self.cards.iter().find(|card| card.card_type == card_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardDescriptor> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Register every card this crate ships.
pub fn register_builtin_cards(registry: &mut CardRegistry) {
    registry.register(PortCard::descriptor());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CARD_TYPE;

    #[test]
    fn builtin_registration_is_idempotent() {
        let mut registry = CardRegistry::new();
        register_builtin_cards(&mut registry);
        register_builtin_cards(&mut registry);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(CARD_TYPE).map(|c| c.name), Some("SNMP Switch Manager Card"));
    }
}
