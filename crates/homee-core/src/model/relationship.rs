use serde::{Deserialize, Serialize};

use super::{Entity, GroupId, HomeegramId, NodeId, RelationshipId};

/// Links a node (or a homeegram) to a group. The only source of
/// node/group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    #[serde(default)]
    pub node_id: NodeId,
    #[serde(default)]
    pub group_id: GroupId,
    #[serde(default)]
    pub homeegram_id: Option<HomeegramId>,
    #[serde(default)]
    pub order: i64,
}

impl Entity for Relationship {
    fn id(&self) -> i64 {
        self.id
    }
}
