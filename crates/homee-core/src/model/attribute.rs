// ── Attributes ──
//
// A single measurable/settable property of a node, plus the indexed
// list a node keeps them in.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::de::{flexible_bool, nullable, percent_decoded};
use super::{AttributeId, AttributeType, NodeId};

/// One property of a node (brightness, on/off, temperature, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub node_id: NodeId,
    /// Numbered from 1 when a node has several attributes of one type.
    #[serde(default)]
    pub instance: i64,
    #[serde(default)]
    pub minimum: f64,
    #[serde(default)]
    pub maximum: f64,
    #[serde(default)]
    pub current_value: f64,
    /// Only meaningful when changing the value; read `current_value` instead.
    #[serde(default)]
    pub target_value: f64,
    #[serde(default)]
    pub last_value: f64,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub unit: String,
    #[serde(default)]
    pub step_value: f64,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub editable: bool,
    #[serde(rename = "type", default)]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub state: i64,
    #[serde(default)]
    pub last_changed: i64,
    #[serde(default)]
    pub changed_by: i64,
    #[serde(default)]
    pub changed_by_id: i64,
    #[serde(default)]
    pub based_on: i64,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub name: String,
    /// Free-form data string; may itself be URI encoded.
    #[serde(default, deserialize_with = "nullable")]
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<AttributeOptions>,
}

/// Optional per-attribute metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeOptions {
    /// Attribute types this attribute can observe.
    #[serde(deserialize_with = "nullable")]
    pub can_observe: Vec<AttributeType>,
    /// Attribute ids this attribute observes.
    #[serde(deserialize_with = "nullable")]
    pub observes: Vec<AttributeId>,
    /// Attribute ids observing this attribute.
    #[serde(deserialize_with = "nullable")]
    pub observed_by: Vec<AttributeId>,
    #[serde(deserialize_with = "nullable")]
    pub automations: Vec<String>,
    /// `{day, week, month, stepped}` history settings, kept as sent.
    pub history: Option<serde_json::Value>,
    #[serde(deserialize_with = "flexible_bool")]
    pub reverse_control_ui: bool,
}

// ── Attributes ──────────────────────────────────────────────────────

/// A node's attribute list with an attribute-type index.
///
/// The index is rebuilt on every mutation so it always mirrors the list.
/// When several attributes share a type, the last one in list order wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    list: Vec<Attribute>,
    by_type: HashMap<AttributeType, usize>,
}

impl Attributes {
    pub fn get(&self, id: AttributeId) -> Option<&Attribute> {
        self.list.iter().find(|a| a.id == id)
    }

    pub fn by_type(&self, attribute_type: AttributeType) -> Option<&Attribute> {
        self.by_type
            .get(&attribute_type)
            .and_then(|&idx| self.list.get(idx))
    }

    /// The type index as `type -> attribute id`.
    pub fn type_index(&self) -> HashMap<AttributeType, AttributeId> {
        self.by_type
            .iter()
            .filter_map(|(&ty, &idx)| self.list.get(idx).map(|a| (ty, a.id)))
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.list.iter()
    }

    pub fn as_slice(&self) -> &[Attribute] {
        &self.list
    }

    pub fn into_vec(self) -> Vec<Attribute> {
        self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Replace the attribute with the same id. Returns `false` (and leaves
    /// the list untouched) if the node has no such attribute.
    pub(crate) fn update(&mut self, attribute: Attribute) -> bool {
        let Some(slot) = self.list.iter_mut().find(|a| a.id == attribute.id) else {
            return false;
        };
        *slot = attribute;
        self.reindex();
        true
    }

    /// Merge a full attribute list from a node payload: known ids are
    /// replaced, unknown ids appended, nothing is removed.
    pub(crate) fn merge(&mut self, incoming: Vec<Attribute>) {
        for attribute in incoming {
            match self.list.iter_mut().find(|a| a.id == attribute.id) {
                Some(slot) => *slot = attribute,
                None => self.list.push(attribute),
            }
        }
        self.reindex();
    }

    fn reindex(&mut self) {
        self.by_type.clear();
        for (idx, attribute) in self.list.iter().enumerate() {
            self.by_type.insert(attribute.attribute_type, idx);
        }
    }
}

impl From<Vec<Attribute>> for Attributes {
    fn from(list: Vec<Attribute>) -> Self {
        let mut attributes = Self {
            list: Vec::with_capacity(list.len()),
            by_type: HashMap::new(),
        };
        // Route through merge so duplicate ids in one payload collapse.
        attributes.merge(list);
        attributes
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.list.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Attribute>::deserialize(deserializer).map(Self::from)
    }
}
