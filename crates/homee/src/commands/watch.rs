//! Live event stream.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use homee_core::{HubEvent, Session};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// One printed event, also the NDJSON shape for `--output json`.
#[derive(Debug, Serialize)]
struct EventLine {
    time: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    node: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribute: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    detail: String,
}

impl EventLine {
    fn from_event(event: &HubEvent) -> Self {
        let mut line = Self {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            kind: "",
            node: None,
            attribute: None,
            value: None,
            detail: String::new(),
        };
        match event {
            HubEvent::Connected { retries } => {
                line.kind = "connected";
                line.detail = format!("after {retries} retries");
            }
            HubEvent::Reconnecting { attempt } => {
                line.kind = "reconnecting";
                line.detail = format!("attempt {attempt}");
            }
            HubEvent::Disconnected { error } => {
                line.kind = "disconnected";
                line.detail = error.clone().unwrap_or_else(|| "clean close".into());
            }
            HubEvent::AttributeUpdated { node, attribute } => {
                line.kind = "attribute";
                line.node = Some(node.id);
                line.attribute = Some(attribute.id);
                line.value = Some(attribute.current_value);
                line.detail = format!(
                    "{} #{} = {}{}",
                    node.name,
                    attribute.id,
                    util::format_value(attribute.current_value),
                    attribute.unit
                );
            }
            HubEvent::Warning(warning) => {
                line.kind = "warning";
                line.detail = format!("[{}] {}", warning.code, warning.description);
            }
            HubEvent::Message(message) => {
                line.kind = "message";
                line.detail = message.to_string();
            }
            HubEvent::Error { message } => {
                line.kind = "error";
                line.detail.clone_from(message);
            }
            HubEvent::MaxRetriesReached { retries } => {
                line.kind = "gave_up";
                line.detail = format!("after {retries} retries");
            }
        }
        line
    }

    fn render(&self, format: &OutputFormat, color: bool) -> String {
        match format {
            OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(self),
            OutputFormat::Table | OutputFormat::Plain => {
                let kind = format!("{:<12}", self.kind);
                let kind = match self.kind {
                    "error" | "warning" | "gave_up" => output::warn(&kind, color),
                    _ => output::accent(&kind, color),
                };
                format!("{} {kind} {}", output::label(&self.time, color), self.detail)
            }
        }
    }
}

/// Whether `--node` / `--raw` let an event through.
fn wanted(event: &HubEvent, args: &WatchArgs) -> bool {
    match event {
        HubEvent::Message(_) => args.raw,
        HubEvent::AttributeUpdated { .. } => {
            args.node.is_none() || event.node_id() == args.node
        }
        _ => true,
    }
}

pub async fn handle(session: &Session, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut events = session.events().listen();
    let mut task = session.start();

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, disconnecting");
                break Ok(());
            }
            joined = &mut task => {
                // The session ended on its own; report why.
                return match joined {
                    Ok(result) => result.map_err(CliError::from),
                    Err(e) => Err(CliError::ConnectionFailed {
                        host: session.config().host.clone(),
                        source: Box::new(e),
                    }),
                };
            }
            received = events.recv() => match received {
                Ok(event) => {
                    if wanted(&event, args) {
                        let line = EventLine::from_event(&event);
                        output::print_output(&line.render(&global.output, color), global.quiet);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    util::shutdown(session, task).await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use homee_core::{Attribute, Node};

    fn args(node: Option<i64>, raw: bool) -> WatchArgs {
        WatchArgs { node, raw }
    }

    fn update(node_id: i64) -> HubEvent {
        let node: Node = serde_json::from_value(serde_json::json!({
            "id": node_id, "name": "Lamp%20Hall"
        }))
        .unwrap_or_else(|e| panic!("{e}"));
        let attribute: Attribute = serde_json::from_value(serde_json::json!({
            "id": 51, "node_id": node_id, "current_value": 42, "unit": "%25"
        }))
        .unwrap_or_else(|e| panic!("{e}"));
        HubEvent::AttributeUpdated {
            node: Arc::new(node),
            attribute,
        }
    }

    #[test]
    fn node_filter_applies_to_attribute_updates() {
        assert!(wanted(&update(5), &args(Some(5), false)));
        assert!(!wanted(&update(6), &args(Some(5), false)));
        assert!(wanted(&HubEvent::Connected { retries: 0 }, &args(Some(5), false)));
    }

    #[test]
    fn raw_messages_need_flag() {
        let message = HubEvent::Message(Arc::new(serde_json::json!({"all": {}})));
        assert!(!wanted(&message, &args(None, false)));
        assert!(wanted(&message, &args(None, true)));
    }

    #[test]
    fn attribute_line_shows_value_and_unit() {
        let line = EventLine::from_event(&update(5));
        assert_eq!(line.kind, "attribute");
        assert_eq!(line.detail, "Lamp Hall #51 = 42%");
        assert!(line.render(&OutputFormat::Plain, false).ends_with("Lamp Hall #51 = 42%"));

        let json = line.render(&OutputFormat::Json, false);
        assert!(json.contains(r#""node":5"#));
        assert!(json.contains(r#""value":42.0"#));
    }
}
