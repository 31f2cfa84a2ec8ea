//! Homeegram playback.

use homee_core::{Command, Session};

use crate::cli::{GlobalOpts, PlayArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(session: &Session, args: &PlayArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let command = Command::PlayHomeegram {
        homeegram: args.homeegram,
    };
    if !session.execute(&command) {
        return Err(CliError::NotSent {
            command: command.to_string(),
        });
    }
    session.flush().await;

    tracing::info!(homeegram = args.homeegram, "homeegram triggered");
    output::print_output(&format!("Played homeegram {}", args.homeegram), global.quiet);
    Ok(())
}
