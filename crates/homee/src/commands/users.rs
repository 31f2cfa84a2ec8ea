//! User listing.

use std::sync::Arc;

use tabled::Tabled;

use homee_core::{Session, User};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: i64,
    #[tabled(rename = "Devices")]
    devices: String,
}

impl From<&Arc<User>> for UserRow {
    fn from(u: &Arc<User>) -> Self {
        let connected = u.devices.iter().filter(|d| d.connected).count();
        Self {
            id: u.id,
            username: u.username.clone(),
            name: format!("{} {}", u.forename, u.surname).trim().to_owned(),
            role: u.role,
            devices: format!("{}/{} online", connected, u.devices.len()),
        }
    }
}

#[allow(clippy::unnecessary_wraps)]
pub fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let snap = session.store().users_snapshot();
    let rendered = output::render_list(
        &global.output,
        snap.as_slice(),
        |u| UserRow::from(u),
        |u| u.username.clone(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
