//! Inbound message routing.
//!
//! Every frame from the hub is a JSON object with a single key naming the
//! kind of payload (`{"node": {...}}`, `{"attributes": [...]}`, ...). The
//! [`Dispatcher`] decodes the payload into typed records, applies it to the
//! [`DataStore`], keeps node/group membership current, and emits events.
//!
//! Unknown kinds are logged and otherwise ignored. Attribute updates for
//! nodes the store has never seen are dropped silently; an unseen attribute
//! on a known node is reported but not stored.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use strum::{AsRefStr, EnumString};
use tracing::{debug, info, trace};

use crate::error::CoreError;
use crate::events::{EventHub, HubEvent};
use crate::gate::Gate;
use crate::model::de::lenient_list;
use crate::model::{Attribute, Device, Group, Node, Relationship, Settings, User, Warning};
use crate::store::DataStore;

/// Payload kinds the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
enum MessageKind {
    All,
    Attribute,
    Attributes,
    Device,
    Devices,
    Group,
    Groups,
    Node,
    Nodes,
    Relationship,
    Relationships,
    User,
    Users,
    Warning,
}

/// Body of an `all` message. Missing or `null` sections are treated as
/// empty, and a record that fails to decode is skipped on its own.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Snapshot {
    settings: Option<Settings>,
    #[serde(deserialize_with = "lenient_list")]
    nodes: Vec<Node>,
    #[serde(deserialize_with = "lenient_list")]
    groups: Vec<Group>,
    #[serde(deserialize_with = "lenient_list")]
    users: Vec<User>,
    #[serde(deserialize_with = "lenient_list")]
    relationships: Vec<Relationship>,
}

pub struct Dispatcher {
    store: Arc<DataStore>,
    events: EventHub,
    snapshot_ready: Gate,
}

impl Dispatcher {
    /// A dispatcher feeding `store`, for replaying captured frames.
    pub fn new(store: Arc<DataStore>, events: EventHub) -> Self {
        Self::with_gate(store, events, Gate::new())
    }

    pub(crate) fn with_gate(store: Arc<DataStore>, events: EventHub, snapshot_ready: Gate) -> Self {
        Self {
            store,
            events,
            snapshot_ready,
        }
    }

    /// Whether an `all` snapshot has been applied.
    pub fn snapshot_applied(&self) -> bool {
        self.snapshot_ready.is_open()
    }

    /// Decode one text frame and dispatch it.
    pub fn handle_text(&self, text: &str) -> Result<(), CoreError> {
        let message: Value = serde_json::from_str(text)?;
        self.handle(message)
    }

    /// Dispatch one decoded message.
    ///
    /// Returns a `Protocol` error when the message is not a single-key
    /// object or a known kind's payload does not decode.
    pub fn handle(&self, message: Value) -> Result<(), CoreError> {
        let obj = message
            .as_object()
            .ok_or_else(|| CoreError::protocol("message is not a JSON object"))?;
        let Some((key, payload)) = obj.iter().next().filter(|_| obj.len() == 1) else {
            return Err(CoreError::protocol(format!(
                "expected exactly one top-level key, found {}",
                obj.len()
            )));
        };

        match MessageKind::from_str(key) {
            Ok(kind) => {
                trace!(kind = kind.as_ref(), "dispatching message");
                self.apply(kind, payload)?;
            }
            Err(_) => info!(kind = %key, "unsupported message type"),
        }

        self.events.emit(HubEvent::Message(Arc::new(message)));
        Ok(())
    }

    fn apply(&self, kind: MessageKind, payload: &Value) -> Result<(), CoreError> {
        let store = &self.store;
        match kind {
            MessageKind::All => self.apply_snapshot(decode(kind, payload)?),
            MessageKind::Attribute => self.apply_attribute(decode(kind, payload)?),
            MessageKind::Attributes => {
                for attribute in decode::<Vec<Attribute>>(kind, payload)? {
                    self.apply_attribute(attribute);
                }
            }
            MessageKind::Device => {
                store.upsert_device(decode(kind, payload)?);
            }
            MessageKind::Devices => {
                for device in decode::<Vec<Device>>(kind, payload)? {
                    store.upsert_device(device);
                }
            }
            MessageKind::Group => {
                store.upsert_group(decode(kind, payload)?);
                store.rebuild_membership();
            }
            MessageKind::Groups => {
                store.load_groups(decode(kind, payload)?);
                store.rebuild_membership();
            }
            MessageKind::Node => {
                store.upsert_node(decode(kind, payload)?);
                store.rebuild_membership();
            }
            MessageKind::Nodes => {
                store.load_nodes(decode(kind, payload)?);
                store.rebuild_membership();
            }
            MessageKind::Relationship => {
                store.upsert_relationship(decode(kind, payload)?);
                store.rebuild_membership();
            }
            MessageKind::Relationships => {
                store.load_relationships(decode(kind, payload)?);
                store.rebuild_membership();
            }
            MessageKind::User => {
                store.upsert_user(decode(kind, payload)?);
            }
            MessageKind::Users => {
                for user in decode::<Vec<User>>(kind, payload)? {
                    store.upsert_user(user);
                }
            }
            MessageKind::Warning => {
                let warning = store.replace_warning(decode::<Warning>(kind, payload)?);
                self.events.emit(HubEvent::Warning(warning));
            }
        }
        Ok(())
    }

    fn apply_snapshot(&self, snapshot: Snapshot) {
        let store = &self.store;
        debug!(
            nodes = snapshot.nodes.len(),
            groups = snapshot.groups.len(),
            users = snapshot.users.len(),
            relationships = snapshot.relationships.len(),
            "applying full snapshot"
        );

        if let Some(settings) = snapshot.settings {
            store.replace_settings(settings);
        }
        store.load_nodes(snapshot.nodes);
        store.load_groups(snapshot.groups);
        for user in snapshot.users {
            store.upsert_user(user);
        }
        store.load_relationships(snapshot.relationships);
        store.rebuild_membership();
        store.mark_snapshot();

        self.snapshot_ready.open();
    }

    fn apply_attribute(&self, attribute: Attribute) {
        match self.store.apply_attribute(&attribute) {
            Some(node) => {
                self.events
                    .emit(HubEvent::AttributeUpdated { node, attribute });
            }
            None => debug!(
                node = attribute.node_id,
                attribute = attribute.id,
                "attribute update for unknown node"
            ),
        }
    }
}

fn decode<T: DeserializeOwned>(kind: MessageKind, payload: &Value) -> Result<T, CoreError> {
    T::deserialize(payload).map_err(|e| CoreError::Protocol {
        message: format!("invalid `{}` payload: {e}", kind.as_ref()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dispatcher() -> (Dispatcher, Arc<DataStore>, EventHub, Gate) {
        let store = Arc::new(DataStore::new());
        let events = EventHub::new();
        let gate = Gate::new();
        let d = Dispatcher::with_gate(Arc::clone(&store), events.clone(), gate.clone());
        (d, store, events, gate)
    }

    fn recorder(events: &EventHub) -> Arc<Mutex<Vec<HubEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        seen
    }

    #[test]
    fn kinds_parse_from_snake_case() {
        assert_eq!(MessageKind::from_str("relationships").unwrap(), MessageKind::Relationships);
        assert_eq!(MessageKind::from_str("all").unwrap(), MessageKind::All);
        assert!(MessageKind::from_str("homeegram").is_err());
    }

    #[test]
    fn snapshot_opens_gate_and_indexes() {
        let (d, store, _, gate) = dispatcher();
        d.handle(json!({ "all": {
            "settings": { "homee_name": "Haus" },
            "nodes": [{ "id": 1, "attributes": [] }, { "id": 2, "attributes": [] }],
            "groups": [{ "id": 10 }],
            "users": [{ "id": 1, "devices": [{ "id": 3, "user_id": 1 }] }],
            "relationships": [{ "id": 1, "node_id": 2, "group_id": 10 }]
        }}))
        .unwrap();

        assert!(gate.is_open());
        assert_eq!(store.settings().homee_name, "Haus");
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.node(2).unwrap().groups, vec![10]);
        assert_eq!(store.group(10).unwrap().nodes, vec![2]);
        assert_eq!(store.device_count(), 1);
        assert!(store.last_snapshot().is_some());
    }

    #[test]
    fn unknown_kind_is_not_an_error() {
        let (d, _, events, _) = dispatcher();
        let seen = recorder(&events);

        d.handle(json!({ "homeegram": { "id": 1 } })).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], HubEvent::Message(_)));
    }

    #[test]
    fn malformed_messages_are_protocol_errors() {
        let (d, _, events, _) = dispatcher();
        let seen = recorder(&events);

        for bad in [
            json!([1, 2]),
            json!({}),
            json!("all"),
            json!({ "node": { "name": "x" } }),
            json!({ "node": { "id": 1 }, "attribute": { "id": 2, "node_id": 1 } }),
        ] {
            assert!(matches!(d.handle(bad), Err(CoreError::Protocol { .. })));
        }
        assert!(matches!(d.handle_text("{not json"), Err(CoreError::Protocol { .. })));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn warning_replaces_and_emits() {
        let (d, store, events, _) = dispatcher();
        let seen = recorder(&events);

        d.handle(json!({ "warning": { "code": 600, "level": 1, "message": "cube lost" } }))
            .unwrap();

        assert_eq!(store.warning().unwrap().code, 600);
        let seen = seen.lock().unwrap();
        assert!(matches!(&seen[0], HubEvent::Warning(w) if w.message == "cube lost"));
        assert!(matches!(seen[1], HubEvent::Message(_)));
    }

    #[test]
    fn attribute_batch_updates_each_known_attribute() {
        let (d, store, events, _) = dispatcher();
        d.handle(json!({ "node": { "id": 1, "attributes": [
            { "id": 10, "node_id": 1, "type": 1 },
            { "id": 11, "node_id": 1, "type": 2 }
        ]}}))
        .unwrap();
        let seen = recorder(&events);

        d.handle(json!({ "attributes": [
            { "id": 10, "node_id": 1, "type": 1, "current_value": 1 },
            { "id": 11, "node_id": 1, "type": 2, "current_value": 2 },
            { "id": 12, "node_id": 1, "type": 3, "current_value": 3 }
        ]}))
        .unwrap();

        let node = store.node(1).unwrap();
        assert_eq!(node.attribute(10).unwrap().current_value, 1.0);
        assert_eq!(node.attribute(11).unwrap().current_value, 2.0);
        assert!(node.attribute(12).is_none());

        let updated: Vec<i64> = seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                HubEvent::AttributeUpdated { attribute, .. } => Some(attribute.id),
                _ => None,
            })
            .collect();
        assert_eq!(updated, vec![10, 11, 12]);
    }

    #[test]
    fn multi_key_message_is_rejected_untouched() {
        let (d, store, _, _) = dispatcher();

        let result = d.handle(json!({
            "node": { "id": 1, "attributes": [] },
            "attribute": { "id": 10, "node_id": 1 }
        }));

        assert!(matches!(result, Err(CoreError::Protocol { message }) if message.contains("found 2")));
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn snapshot_tolerates_nulls_and_bad_records() {
        let (d, store, _, gate) = dispatcher();
        d.handle(json!({ "all": {
            "settings": { "homee_name": "Haus", "timezone": null },
            "nodes": [
                { "id": 1, "name": null, "image": null, "note": null, "attributes": [
                    { "id": 10, "node_id": 1, "type": 1, "unit": null, "data": null,
                      "options": { "automations": null } }
                ]},
                { "id": 2, "image": null, "attributes": null },
                { "name": "no id" }
            ],
            "groups": [{ "id": 10, "image": null, "name": null }],
            "users": null,
            "relationships": [{ "id": 1, "node_id": 2, "group_id": 10 }]
        }}))
        .unwrap();

        assert!(gate.is_open());
        assert_eq!(store.node_count(), 2);
        let first = store.node(1).unwrap();
        assert_eq!(first.image, "");
        assert_eq!(first.attribute(10).unwrap().data, "");
        assert!(store.node(2).unwrap().attributes.is_empty());
        assert_eq!(store.group(10).unwrap().nodes, vec![2]);
        assert_eq!(store.user_count(), 0);
    }
}
