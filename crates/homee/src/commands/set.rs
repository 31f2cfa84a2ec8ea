//! Attribute control.

use std::time::Duration;

use tokio::sync::mpsc;

use homee_core::{Attribute, Command, HubEvent, Session};

use crate::cli::{GlobalOpts, SetArgs};
use crate::error::CliError;
use crate::output;

use super::nodes::AttributeRow;
use super::util;

pub async fn handle(session: &Session, args: &SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let node = util::resolve_node(session, &args.node)?;
    let attribute = node
        .attribute(args.attribute)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "attribute".into(),
            identifier: args.attribute.to_string(),
            list_command: format!("nodes attributes {}", node.id),
        })?;
    check_target(attribute, args.value)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let attribute_id = attribute.id;
    let subscription = session.events().subscribe_node(node.id, move |event| {
        if let HubEvent::AttributeUpdated { attribute, .. } = event {
            if attribute.id == attribute_id {
                let _ = tx.send(attribute.clone());
            }
        }
    });

    let command = Command::SetValue {
        node: node.id,
        attribute: attribute_id,
        value: args.value,
    };
    let result = if session.execute(&command) {
        if args.no_wait {
            session.flush().await;
            Ok(None)
        } else {
            wait_for_value(&mut rx, args.value, Duration::from_secs(global.timeout))
                .await
                .map(Some)
        }
    } else {
        Err(CliError::NotSent {
            command: command.to_string(),
        })
    };
    session.events().unsubscribe(subscription);

    if let Some(updated) = result? {
        let rendered = output::render_list(
            &global.output,
            std::slice::from_ref(&updated),
            |a| AttributeRow::from(a),
            |a| util::format_value(a.current_value),
        );
        output::print_output(&rendered, global.quiet);
    }
    Ok(())
}

/// Reject values the hub would refuse anyway.
fn check_target(attribute: &Attribute, value: f64) -> Result<(), CliError> {
    if !value.is_finite() {
        return Err(CliError::Validation {
            field: "value".into(),
            reason: format!("{value} is not a finite number"),
        });
    }
    if !attribute.editable {
        return Err(CliError::Validation {
            field: "attribute".into(),
            reason: format!("attribute {} is read-only", attribute.id),
        });
    }
    let bounded = attribute.maximum > attribute.minimum;
    if bounded && !(attribute.minimum..=attribute.maximum).contains(&value) {
        return Err(CliError::Validation {
            field: "value".into(),
            reason: format!(
                "{} is outside {}..={}",
                util::format_value(value),
                util::format_value(attribute.minimum),
                util::format_value(attribute.maximum)
            ),
        });
    }
    Ok(())
}

/// Wait until the hub reports the attribute at `target`.
async fn wait_for_value(
    updates: &mut mpsc::UnboundedReceiver<Attribute>,
    target: f64,
    timeout: Duration,
) -> Result<Attribute, CliError> {
    let reached = async {
        while let Some(attribute) = updates.recv().await {
            if (attribute.current_value - target).abs() < f64::EPSILON {
                return Some(attribute);
            }
        }
        None
    };

    match tokio::time::timeout(timeout, reached).await {
        Ok(Some(attribute)) => Ok(attribute),
        Ok(None) => Err(homee_core::CoreError::Disconnected.into()),
        Err(_) => Err(CliError::Timeout {
            seconds: timeout.as_secs(),
        }),
    }
}
