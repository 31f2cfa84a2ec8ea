// ── Central reactive data store ──
//
// In-memory mirror of the hub's entity graph. Reads are open to anyone
// holding the store; mutations are crate-private and only happen on the
// dispatch path.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use super::collection::EntityCollection;
use super::relationships::Membership;
use crate::model::{
    Attribute, Device, Group, GroupId, Node, NodeId, Relationship, Settings, User, Warning,
};
use crate::stream::EntityStream;

/// Central reactive store for all hub entities.
///
/// Thread-safe: reads are cached snapshot clones or single-shard lookups
/// in `DashMap`. Mutations are signalled to subscribers via `watch`
/// channels.
pub struct DataStore {
    pub(crate) nodes: Arc<EntityCollection<Node>>,
    pub(crate) groups: Arc<EntityCollection<Group>>,
    pub(crate) relationships: Arc<EntityCollection<Relationship>>,
    pub(crate) devices: Arc<EntityCollection<Device>>,
    pub(crate) users: Arc<EntityCollection<User>>,
    pub(crate) settings: watch::Sender<Arc<Settings>>,
    pub(crate) warning: watch::Sender<Option<Arc<Warning>>>,
    pub(crate) last_snapshot: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let (settings, _) = watch::channel(Arc::new(Settings::default()));
        let (warning, _) = watch::channel(None);
        let (last_snapshot, _) = watch::channel(None);

        Self {
            nodes: Arc::new(EntityCollection::new()),
            groups: Arc::new(EntityCollection::new()),
            relationships: Arc::new(EntityCollection::new()),
            devices: Arc::new(EntityCollection::new()),
            users: Arc::new(EntityCollection::new()),
            settings,
            warning,
            last_snapshot,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn nodes_snapshot(&self) -> Arc<Vec<Arc<Node>>> {
        self.nodes.snapshot()
    }

    pub fn groups_snapshot(&self) -> Arc<Vec<Arc<Group>>> {
        self.groups.snapshot()
    }

    pub fn relationships_snapshot(&self) -> Arc<Vec<Arc<Relationship>>> {
        self.relationships.snapshot()
    }

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.devices.snapshot()
    }

    pub fn users_snapshot(&self) -> Arc<Vec<Arc<User>>> {
        self.users.snapshot()
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.borrow().clone()
    }

    /// The most recent warning, if the hub has sent one.
    pub fn warning(&self) -> Option<Arc<Warning>> {
        self.warning.borrow().clone()
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<Arc<Node>> {
        self.nodes.get(id)
    }

    pub fn group(&self, id: GroupId) -> Option<Arc<Group>> {
        self.groups.get(id)
    }

    pub fn device(&self, id: i64) -> Option<Arc<Device>> {
        self.devices.get(id)
    }

    pub fn user(&self, id: i64) -> Option<Arc<User>> {
        self.users.get(id)
    }

    /// Nodes in a group, in membership order.
    pub fn group_nodes(&self, id: GroupId) -> Vec<Arc<Node>> {
        self.groups
            .get(id)
            .map(|g| g.nodes.iter().filter_map(|&n| self.nodes.get(n)).collect())
            .unwrap_or_default()
    }

    /// Groups a node belongs to, in membership order.
    pub fn node_groups(&self, id: NodeId) -> Vec<Arc<Group>> {
        self.nodes
            .get(id)
            .map(|n| n.groups.iter().filter_map(|&g| self.groups.get(g)).collect())
            .unwrap_or_default()
    }

    // ── Count accessors ──────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_nodes(&self) -> EntityStream<Node> {
        EntityStream::new(&self.nodes)
    }

    pub fn subscribe_groups(&self) -> EntityStream<Group> {
        EntityStream::new(&self.groups)
    }

    pub fn subscribe_relationships(&self) -> EntityStream<Relationship> {
        EntityStream::new(&self.relationships)
    }

    pub fn subscribe_devices(&self) -> EntityStream<Device> {
        EntityStream::new(&self.devices)
    }

    pub fn subscribe_users(&self) -> EntityStream<User> {
        EntityStream::new(&self.users)
    }

    pub fn subscribe_warning(&self) -> watch::Receiver<Option<Arc<Warning>>> {
        self.warning.subscribe()
    }

    // ── Metadata ─────────────────────────────────────────────────────

    /// When the last full `all` snapshot was applied.
    pub fn last_snapshot(&self) -> Option<DateTime<Utc>> {
        *self.last_snapshot.borrow()
    }

    // ── Mutations (dispatch path only) ───────────────────────────────

    pub(crate) fn upsert_node(&self, node: Node) -> bool {
        self.nodes.upsert_with(node, Node::merge)
    }

    /// Bulk-load nodes. An empty store takes them as-is; otherwise each one
    /// is merged like a single upsert.
    pub(crate) fn load_nodes(&self, nodes: Vec<Node>) {
        if self.nodes.is_empty() {
            debug!(count = nodes.len(), "loading nodes into empty store");
            self.nodes.upsert_many(nodes, |current, incoming| *current = incoming);
        } else {
            self.nodes.upsert_many(nodes, Node::merge);
        }
    }

    pub(crate) fn upsert_group(&self, group: Group) -> bool {
        self.groups.upsert_with(group, Group::merge)
    }

    pub(crate) fn load_groups(&self, groups: Vec<Group>) {
        self.groups.upsert_many(groups, Group::merge);
    }

    pub(crate) fn upsert_relationship(&self, relationship: Relationship) -> bool {
        self.relationships.upsert(relationship)
    }

    pub(crate) fn load_relationships(&self, relationships: Vec<Relationship>) {
        if self.relationships.is_empty() {
            debug!(count = relationships.len(), "loading relationships into empty store");
        }
        self.relationships
            .upsert_many(relationships, |current, incoming| *current = incoming);
    }

    pub(crate) fn upsert_device(&self, device: Device) -> bool {
        self.devices.upsert(device)
    }

    /// Upsert a user together with the devices embedded in its payload.
    pub(crate) fn upsert_user(&self, user: User) -> bool {
        self.devices
            .upsert_many(user.devices.iter().cloned(), |current, incoming| *current = incoming);
        self.users.upsert(user)
    }

    pub(crate) fn replace_settings(&self, settings: Settings) {
        self.settings.send_replace(Arc::new(settings));
    }

    pub(crate) fn replace_warning(&self, warning: Warning) -> Arc<Warning> {
        let warning = Arc::new(warning);
        self.warning.send_replace(Some(Arc::clone(&warning)));
        warning
    }

    pub(crate) fn mark_snapshot(&self) {
        self.last_snapshot.send_replace(Some(Utc::now()));
    }

    /// Apply an attribute value update to its node.
    ///
    /// Returns the node as stored afterwards, or `None` when the node is
    /// unknown. An attribute id the node does not carry is not added; the
    /// node comes back unchanged.
    pub(crate) fn apply_attribute(&self, attribute: &Attribute) -> Option<Arc<Node>> {
        let node_id = attribute.node_id;
        let node = self.nodes.get(node_id)?;
        if node.attributes.get(attribute.id).is_none() {
            debug!(node = node_id, attribute = attribute.id, "attribute not on node, not stored");
            return Some(node);
        }

        self.nodes
            .modify(node_id, |node| node.attributes.update(attribute.clone()))?;
        self.nodes.get(node_id)
    }

    /// Recompute node/group membership from the relationship list and
    /// write it onto every node and group.
    pub(crate) fn rebuild_membership(&self) -> Membership {
        let nodes: HashSet<NodeId> = self.nodes.ids().into_iter().collect();
        let groups: HashSet<GroupId> = self.groups.ids().into_iter().collect();
        let relationships = self.relationships.snapshot();

        let membership =
            Membership::compute(relationships.iter().map(|r| &**r), &nodes, &groups);

        self.nodes.update_where(
            |node| node.groups != membership.groups_of(node.id),
            |node| node.groups = membership.groups_of(node.id).to_vec(),
        );
        self.groups.update_where(
            |group| group.nodes != membership.nodes_in(group.id),
            |group| group.nodes = membership.nodes_in(group.id).to_vec(),
        );

        debug!(
            nodes = nodes.len(),
            groups = groups.len(),
            relationships = relationships.len(),
            "membership rebuilt"
        );
        membership
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
