//! Shared helpers for command handlers.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use homee_core::{CoreError, Group, HubEvent, Node, Session};

use crate::error::CliError;

pub type SessionTask = JoinHandle<Result<(), CoreError>>;

/// Start the session and wait for the hub's full snapshot.
///
/// Fails if the session ends first or `timeout_secs` elapses; a timeout
/// reports the last connection error the session saw, if any.
pub async fn connect(session: &Session, timeout_secs: u64) -> Result<SessionTask, CliError> {
    let last_error = Arc::new(Mutex::new(None::<String>));
    let sink = Arc::clone(&last_error);
    let subscription = session.events().subscribe(move |event| {
        if let HubEvent::Error { message } = event {
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.clone());
        }
    });

    let mut task = session.start();
    let host = session.config().host.clone();

    let outcome = tokio::select! {
        () = session.wait_until_connected() => Ok(()),
        joined = &mut task => Err(match joined {
            Ok(Ok(())) => CliError::ConnectionFailed {
                host,
                source: "session ended before the snapshot arrived".into(),
            },
            Ok(Err(e)) => e.into(),
            Err(e) => CliError::ConnectionFailed { host, source: Box::new(e) },
        }),
        () = tokio::time::sleep(Duration::from_secs(timeout_secs)) => {
            session.disconnect();
            let last = last_error.lock().unwrap_or_else(PoisonError::into_inner).take();
            Err(match last {
                Some(reason) => CliError::ConnectionFailed { host, source: reason.into() },
                None => CliError::Timeout { seconds: timeout_secs },
            })
        }
    };

    session.events().unsubscribe(subscription);
    outcome.map(|()| task)
}

/// Stop the session and wait for its task to unwind.
pub async fn shutdown(session: &Session, task: SessionTask) {
    session.disconnect();
    match task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "session ended with error"),
        Err(e) => tracing::debug!(error = %e, "session task failed"),
    }
}

/// Resolve a node identifier (numeric id or case-insensitive name).
pub fn resolve_node(session: &Session, identifier: &str) -> Result<Arc<Node>, CliError> {
    let store = session.store();
    let found = match identifier.parse::<i64>() {
        Ok(id) => store.node(id),
        Err(_) => store
            .nodes_snapshot()
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(identifier))
            .cloned(),
    };
    found.ok_or_else(|| CliError::NotFound {
        resource_type: "node".into(),
        identifier: identifier.into(),
        list_command: "nodes list".into(),
    })
}

/// Resolve a group identifier (numeric id or case-insensitive name).
pub fn resolve_group(session: &Session, identifier: &str) -> Result<Arc<Group>, CliError> {
    let store = session.store();
    let found = match identifier.parse::<i64>() {
        Ok(id) => store.group(id),
        Err(_) => store
            .groups_snapshot()
            .iter()
            .find(|g| g.name.eq_ignore_ascii_case(identifier))
            .cloned(),
    };
    found.ok_or_else(|| CliError::NotFound {
        resource_type: "group".into(),
        identifier: identifier.into(),
        list_command: "groups list".into(),
    })
}

/// Human label for a node's availability state code.
pub fn node_state_label(state: i64) -> &'static str {
    match state {
        1 => "available",
        2 => "unavailable",
        3 => "updating",
        4 => "waiting for attributes",
        5 => "initializing",
        6 => "interaction required",
        7 => "password required",
        8 => "host unavailable",
        9 => "deleting",
        12 => "waiting for wakeup",
        14 => "firmware update",
        _ => "unknown",
    }
}

/// Render a float without a trailing `.0` for whole numbers.
pub fn format_value(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
