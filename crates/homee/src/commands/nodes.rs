//! Node command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use homee_core::{Attribute, Node, Session};

use crate::cli::{GlobalOpts, NodesArgs, NodesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Profile")]
    profile: i64,
    #[tabled(rename = "State")]
    state: &'static str,
    #[tabled(rename = "Attributes")]
    attributes: usize,
    #[tabled(rename = "Groups")]
    groups: String,
}

impl From<&Arc<Node>> for NodeRow {
    fn from(n: &Arc<Node>) -> Self {
        Self {
            id: n.id,
            name: n.name.clone(),
            profile: n.profile,
            state: util::node_state_label(n.state),
            attributes: n.attributes.len(),
            groups: join_ids(&n.groups),
        }
    }
}

#[derive(Tabled)]
pub(super) struct AttributeRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Type")]
    attribute_type: u32,
    #[tabled(rename = "Value")]
    current: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Editable")]
    editable: &'static str,
}

impl From<&Attribute> for AttributeRow {
    fn from(a: &Attribute) -> Self {
        Self {
            id: a.id,
            attribute_type: a.attribute_type,
            current: util::format_value(a.current_value),
            target: util::format_value(a.target_value),
            unit: a.unit.clone(),
            editable: if a.editable { "yes" } else { "no" },
        }
    }
}

/// A node plus the groups it belongs to, for structured output.
#[derive(Serialize)]
struct NodeDetail<'a> {
    #[serde(flatten)]
    node: &'a Node,
    groups: &'a [i64],
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

fn detail(n: &NodeDetail<'_>, color: bool) -> String {
    let node = n.node;
    let mut lines = vec![
        format!("{} {}", output::label("ID:        ", color), node.id),
        format!("{} {}", output::label("Name:      ", color), output::accent(&node.name, color)),
        format!("{} {}", output::label("Profile:   ", color), node.profile),
        format!(
            "{} {}",
            output::label("State:     ", color),
            util::node_state_label(node.state)
        ),
        format!("{} {}", output::label("Protocol:  ", color), node.protocol),
        format!("{} {}", output::label("Groups:    ", color), join_ids(n.groups)),
    ];
    if !node.note.is_empty() {
        lines.push(format!("{} {}", output::label("Note:      ", color), node.note));
    }
    lines.push(format!(
        "{} {}",
        output::label("Attributes:", color),
        node.attributes.len()
    ));
    lines.join("\n")
}

fn render_nodes(nodes: &[Arc<Node>], global: &GlobalOpts) -> String {
    output::render_list(
        &global.output,
        nodes,
        |n| NodeRow::from(n),
        |n| n.id.to_string(),
    )
}

/// Print the node list, then again on every change until Ctrl-C.
async fn follow(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let mut nodes = session.store().subscribe_nodes();
    output::print_output(&render_nodes(nodes.current(), global), global.quiet);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, disconnecting");
                break;
            }
            changed = nodes.changed() => {
                let Some(snap) = changed else { break };
                output::print_output(&render_nodes(&snap, global), global.quiet);
            }
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: NodesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    let rendered = match args.command {
        NodesCommand::List { follow: true } => return follow(session, global).await,
        NodesCommand::List { follow: false } => {
            render_nodes(session.store().nodes_snapshot().as_slice(), global)
        }
        NodesCommand::Get { node } => {
            let node = util::resolve_node(session, &node)?;
            let view = NodeDetail {
                node: &node,
                groups: &node.groups,
            };
            output::render_single(&global.output, &view, |v| detail(v, color), |v| {
                v.node.id.to_string()
            })
        }
        NodesCommand::Attributes { node } => {
            let node = util::resolve_node(session, &node)?;
            output::render_list(
                &global.output,
                node.attributes.as_slice(),
                |a| AttributeRow::from(a),
                |a| a.id.to_string(),
            )
        }
    };

    output::print_output(&rendered, global.quiet);
    Ok(())
}
