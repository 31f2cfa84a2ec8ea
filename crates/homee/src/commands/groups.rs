//! Group command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use homee_core::{Group, Node, Session};

use crate::cli::{GlobalOpts, GroupsArgs, GroupsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: i64,
    #[tabled(rename = "Nodes")]
    nodes: usize,
}

impl From<&Arc<Group>> for GroupRow {
    fn from(g: &Arc<Group>) -> Self {
        Self {
            id: g.id,
            name: g.name.clone(),
            category: g.category,
            nodes: g.nodes.len(),
        }
    }
}

#[derive(Serialize)]
struct GroupDetail<'a> {
    #[serde(flatten)]
    group: &'a Group,
    nodes: Vec<Arc<Node>>,
}

fn detail(g: &GroupDetail<'_>, color: bool) -> String {
    let mut lines = vec![
        format!("{} {}", output::label("ID:      ", color), g.group.id),
        format!(
            "{} {}",
            output::label("Name:    ", color),
            output::accent(&g.group.name, color)
        ),
        format!("{} {}", output::label("Category:", color), g.group.category),
        output::label("Members:", color),
    ];
    if g.nodes.is_empty() {
        lines.push("  (none)".into());
    }
    for node in &g.nodes {
        lines.push(format!("  {:>5}  {}", node.id, node.name));
    }
    lines.join("\n")
}

pub fn handle(session: &Session, args: GroupsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    let rendered = match args.command {
        GroupsCommand::List => {
            let snap = session.store().groups_snapshot();
            output::render_list(
                &global.output,
                snap.as_slice(),
                |g| GroupRow::from(g),
                |g| g.id.to_string(),
            )
        }
        GroupsCommand::Get { group } => {
            let group = util::resolve_group(session, &group)?;
            let view = GroupDetail {
                nodes: session.store().group_nodes(group.id),
                group: &group,
            };
            output::render_single(&global.output, &view, |v| detail(v, color), |v| {
                v.nodes
                    .iter()
                    .map(|n| n.id.to_string())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
    };

    output::print_output(&rendered, global.quiet);
    Ok(())
}
