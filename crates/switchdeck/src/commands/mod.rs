//! Command dispatch: bridges CLI args -> card engine -> output formatting.

pub mod actions;
pub mod cards;
pub mod check;
pub mod config_cmd;
pub mod discover;
pub mod ports;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that needs a Home Assistant connection.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Ports(args) => ports::handle_ports(&args, global).await,
        Command::Render(args) => ports::handle_render(args, global).await,
        Command::Toggle(args) => actions::handle_toggle(args, global).await,
        Command::Describe(args) => actions::handle_describe(args, global).await,
        Command::Discover(args) => discover::handle(args, global).await,
        Command::Check(_) | Command::Cards | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Validation {
                field: "command".into(),
                reason: "handled without a connection".into(),
            })
        }
    }
}
