//! Command dispatch: bridges CLI args -> session -> output formatting.

pub mod config_cmd;
pub mod groups;
pub mod info;
pub mod nodes;
pub mod play;
pub mod set;
pub mod users;
pub mod util;
pub mod watch;

use homee_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a hub-bound command to the appropriate handler.
///
/// Every handler connects, does its work, and disconnects before returning.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => return watch::handle(session, &args, global).await,
        Command::Config(_) => {
            return Err(CliError::Validation {
                field: "command".into(),
                reason: "config commands do not use a hub connection".into(),
            });
        }
        _ => {}
    }

    let task = util::connect(session, global.timeout).await?;
    let result = match cmd {
        Command::Nodes(args) => nodes::handle(session, args, global).await,
        Command::Groups(args) => groups::handle(session, args, global),
        Command::Users => users::handle(session, global),
        Command::Info => info::handle(session, global),
        Command::Set(args) => set::handle(session, &args, global).await,
        Command::Play(args) => play::handle(session, &args, global).await,
        Command::Watch(_) | Command::Config(_) => Ok(()),
    };
    util::shutdown(session, task).await;
    result
}
