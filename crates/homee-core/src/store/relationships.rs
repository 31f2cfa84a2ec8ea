//! Node/group membership derived from the relationship list.
//!
//! Membership is never patched incrementally. Every trigger recomputes it
//! from scratch with [`Membership::compute`], a pure function of the
//! relationships and the set of known node and group ids, and the store
//! then writes the result onto every node and group.

use std::collections::{BTreeMap, HashSet};

use crate::model::{GroupId, NodeId, Relationship};

/// Adjacency lists in both directions.
///
/// Every known node and group has an entry, possibly empty. Lists follow
/// relationship id order and contain no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    pub node_groups: BTreeMap<NodeId, Vec<GroupId>>,
    pub group_nodes: BTreeMap<GroupId, Vec<NodeId>>,
}

impl Membership {
    /// Relationships naming an unknown node or group (homeegram links,
    /// entities not yet received) are skipped.
    pub fn compute<'a>(
        relationships: impl IntoIterator<Item = &'a Relationship>,
        nodes: &HashSet<NodeId>,
        groups: &HashSet<GroupId>,
    ) -> Self {
        let mut ordered: Vec<&Relationship> = relationships.into_iter().collect();
        ordered.sort_by_key(|r| r.id);

        let mut membership = Self {
            node_groups: nodes.iter().map(|&id| (id, Vec::new())).collect(),
            group_nodes: groups.iter().map(|&id| (id, Vec::new())).collect(),
        };

        for rel in ordered {
            if !nodes.contains(&rel.node_id) || !groups.contains(&rel.group_id) {
                continue;
            }
            push_unique(membership.node_groups.entry(rel.node_id).or_default(), rel.group_id);
            push_unique(membership.group_nodes.entry(rel.group_id).or_default(), rel.node_id);
        }

        membership
    }

    pub fn groups_of(&self, node: NodeId) -> &[GroupId] {
        self.node_groups.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn nodes_in(&self, group: GroupId) -> &[NodeId] {
        self.group_nodes.get(&group).map_or(&[], Vec::as_slice)
    }
}

fn push_unique(list: &mut Vec<i64>, id: i64) {
    if !list.contains(&id) {
        list.push(id);
    }
}
