use serde::{Deserialize, Serialize};

use super::de::{nullable, percent_decoded};
use super::{Attribute, AttributeId, AttributeType, Attributes, Entity, GroupId, NodeId};

/// A controllable/observable device-like entity exposed by the hub.
///
/// `groups` is derived from the relationship list by the store's indexer
/// and is never read from the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub name: String,
    #[serde(default)]
    pub profile: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub image: String,
    #[serde(default)]
    pub favorite: i64,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub protocol: i64,
    #[serde(default)]
    pub routing: i64,
    /// Availability state.
    #[serde(default)]
    pub state: i64,
    #[serde(default)]
    pub state_changed: i64,
    #[serde(default)]
    pub added: i64,
    #[serde(default)]
    pub history: i64,
    #[serde(default)]
    pub cube_type: i64,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub note: String,
    #[serde(default)]
    pub services: i64,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub phonetic_name: String,
    #[serde(default)]
    pub owner: i64,
    #[serde(default)]
    pub security: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub attributes: Attributes,
    #[serde(skip)]
    pub groups: Vec<GroupId>,
}

impl Node {
    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.get(id)
    }

    pub fn attribute_by_type(&self, attribute_type: AttributeType) -> Option<&Attribute> {
        self.attributes.by_type(attribute_type)
    }

    /// Replace this node's payload with a newer one from the hub.
    ///
    /// Scalar fields are overwritten, attributes merged by id, and the
    /// derived group list carried over until the next index rebuild.
    pub(crate) fn merge(&mut self, mut incoming: Node) {
        let mut attributes = std::mem::take(&mut self.attributes);
        attributes.merge(std::mem::take(&mut incoming.attributes).into_vec());

        incoming.attributes = attributes;
        incoming.groups = std::mem::take(&mut self.groups);
        *self = incoming;
    }
}

impl Entity for Node {
    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(payload: serde_json::Value) -> Node {
        serde_json::from_value(payload).unwrap()
    }

    #[test]
    fn decodes_node_with_attributes() {
        let n = node(json!({
            "id": 7, "name": "Wohnzimmer%20Lampe", "profile": 10, "state": 1,
            "attributes": [
                { "id": 70, "node_id": 7, "type": 1, "current_value": 1 },
                { "id": 71, "node_id": 7, "type": 2, "current_value": 80 }
            ]
        }));

        assert_eq!(n.name, "Wohnzimmer Lampe");
        assert_eq!(n.attributes.len(), 2);
        assert_eq!(n.attribute_by_type(2).unwrap().id, 71);
        assert!(n.groups.is_empty());
    }

    #[test]
    fn merge_keeps_groups_and_unseen_attributes() {
        let mut current = node(json!({
            "id": 7, "name": "Old",
            "attributes": [
                { "id": 70, "node_id": 7, "type": 1, "current_value": 0 },
                { "id": 71, "node_id": 7, "type": 2, "current_value": 10 }
            ]
        }));
        current.groups = vec![3];

        current.merge(node(json!({
            "id": 7, "name": "New",
            "attributes": [
                { "id": 71, "node_id": 7, "type": 2, "current_value": 55 },
                { "id": 72, "node_id": 7, "type": 3, "current_value": 1 }
            ]
        })));

        assert_eq!(current.name, "New");
        assert_eq!(current.groups, vec![3]);
        assert_eq!(current.attributes.len(), 3);
        assert_eq!(current.attribute(71).unwrap().current_value, 55.0);
        assert_eq!(current.attribute_by_type(3).unwrap().id, 72);
        assert_eq!(current.attribute_by_type(1).unwrap().id, 70);
    }
}
