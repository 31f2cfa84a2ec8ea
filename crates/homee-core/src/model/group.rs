use serde::{Deserialize, Serialize};

use super::de::{nullable, percent_decoded};
use super::{Entity, GroupId, NodeId};

/// A named collection of nodes (a room, a floor, a scene target).
///
/// Membership lives in the relationship list; `nodes` is filled in by the
/// store's indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub image: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub added: i64,
    #[serde(default)]
    pub state: i64,
    #[serde(default)]
    pub category: i64,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub phonetic_name: String,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub note: String,
    #[serde(default)]
    pub services: i64,
    #[serde(default)]
    pub owner: i64,
    #[serde(skip)]
    pub nodes: Vec<NodeId>,
}

impl Group {
    /// Replace the payload, carrying the derived node list over.
    pub(crate) fn merge(&mut self, mut incoming: Group) {
        incoming.nodes = std::mem::take(&mut self.nodes);
        *self = incoming;
    }
}

impl Entity for Group {
    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_and_ignores_payload_nodes() {
        let g: Group = serde_json::from_value(json!({
            "id": 3, "name": "Erdgeschoss", "category": 1, "nodes": [1, 2]
        }))
        .unwrap();

        assert_eq!(g.name, "Erdgeschoss");
        assert!(g.nodes.is_empty());
    }
}
