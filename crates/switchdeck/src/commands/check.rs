//! Offline card configuration check.

use switchdeck_core::{CardConfig, PortCard};

use crate::cli::{CheckArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

fn detail(cfg: &CardConfig) -> String {
    let mut lines = vec![
        format!("Title:       {}", cfg.title.as_deref().unwrap_or("-")),
        format!("Layout:      {}", cfg.layout),
        format!("Image:       {}", cfg.image.as_deref().unwrap_or("-")),
        format!("Marker size: {}px", cfg.marker_size),
    ];
    if cfg.uses_discovery() {
        lines.push(format!(
            "Discovery:   device {}",
            cfg.device_id
                .as_deref()
                .or(cfg.device_name.as_deref())
                .unwrap_or("-")
        ));
    } else {
        lines.push(format!("Ports:       {}", cfg.ports.len()));
        for port in &cfg.ports {
            let position = match (port.x, port.y) {
                (Some(x), Some(y)) => format!(" @ {x}%, {y}%"),
                _ => String::new(),
            };
            let label = port
                .label
                .as_ref()
                .map(|l| format!(" ({l})"))
                .unwrap_or_default();
            lines.push(format!("  - {}{label}{position}", port.entity_id));
        }
    }
    lines.join("\n")
}

pub fn handle(args: &CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let raw = if args.stub {
        PortCard::stub_config()
    } else {
        config::load_card(&args.card, global)?
    };

    let mut card = PortCard::new();
    card.on_config_change(&raw)?;
    let cfg = card.config().ok_or(CliError::NoCard)?;

    let out = output::render_single(&global.output, cfg, detail, |c| {
        c.ports
            .iter()
            .map(|p| p.entity_id.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&out, global.quiet);
    if !global.quiet {
        eprintln!("✓ Card configuration is valid (about {} rows)", card.card_size());
    }
    Ok(())
}
