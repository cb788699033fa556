//! Card registry listing.

use tabled::Tabled;

use switchdeck_core::{CardDescriptor, CardRegistry, register_builtin_cards};

use crate::cli::GlobalOpts;
use crate::output;

#[derive(Tabled)]
struct CardRow {
    #[tabled(rename = "Type")]
    card_type: &'static str,
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Description")]
    description: &'static str,
}

impl From<&CardDescriptor> for CardRow {
    fn from(card: &CardDescriptor) -> Self {
        Self {
            card_type: card.card_type,
            name: card.name,
            description: card.description,
        }
    }
}

pub fn handle(global: &GlobalOpts) {
    let mut registry = CardRegistry::new();
    register_builtin_cards(&mut registry);

    let cards: Vec<CardDescriptor> = registry.iter().cloned().collect();
    let out = output::render_list(&global.output, &cards, |c| CardRow::from(c), |c| {
        c.card_type.to_owned()
    });
    output::print_output(&out, global.quiet);
}
