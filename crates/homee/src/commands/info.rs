//! Hub overview: settings, entity counts, and the active warning.

use std::sync::Arc;

use serde::Serialize;

use homee_core::{Session, Settings, Warning};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct HubInfo {
    settings: Arc<Settings>,
    nodes: usize,
    groups: usize,
    relationships: usize,
    users: usize,
    warning: Option<Arc<Warning>>,
}

fn detail(info: &HubInfo, color: bool) -> String {
    let s = &info.settings;
    let mut lines = vec![
        format!(
            "{} {}",
            output::label("Hub:          ", color),
            output::accent(&s.homee_name, color)
        ),
        format!("{} {}", output::label("Version:      ", color), s.version),
        format!("{} {}", output::label("UID:          ", color), s.uid),
        format!("{} {}", output::label("Timezone:     ", color), s.timezone),
        format!(
            "{} {} nodes, {} groups, {} relationships, {} users",
            output::label("Entities:     ", color),
            info.nodes,
            info.groups,
            info.relationships,
            info.users
        ),
    ];
    if let Some(ref w) = info.warning {
        lines.push(format!(
            "{} {}",
            output::label("Warning:      ", color),
            output::warn(&format!("[{}] {}", w.code, w.description), color)
        ));
    }
    lines.join("\n")
}

#[allow(clippy::unnecessary_wraps)]
pub fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let store = session.store();
    let info = HubInfo {
        settings: store.settings(),
        nodes: store.node_count(),
        groups: store.group_count(),
        relationships: store.relationship_count(),
        users: store.user_count(),
        warning: store.warning(),
    };

    let color = output::should_color(&global.color);
    let rendered = output::render_single(&global.output, &info, |i| detail(i, color), |i| {
        i.settings.uid.clone()
    });
    output::print_output(&rendered, global.quiet);
    Ok(())
}
