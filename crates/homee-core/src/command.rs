// ── Outbound commands ──
//
// The hub accepts a small text grammar on the push channel. Every typed
// command renders to exactly one frame via `Display`.

use std::fmt;

use crate::model::{AttributeId, HomeegramId, NodeId};

/// A request the session can send to the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Request the full entity snapshot.
    GetAll,
    GetNode { node: NodeId },
    GetAttribute { node: NodeId, attribute: AttributeId },
    /// Set an attribute's target value.
    SetValue {
        node: NodeId,
        attribute: AttributeId,
        value: f64,
    },
    PlayHomeegram { homeegram: HomeegramId },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetAll => f.write_str("GET:all"),
            Self::GetNode { node } => write!(f, "GET:/nodes/{node}/"),
            Self::GetAttribute { node, attribute } => {
                write!(f, "GET:/nodes/{node}/attributes/{attribute}")
            }
            Self::SetValue {
                node,
                attribute,
                value,
            } => write!(
                f,
                "PUT:/nodes/{node}/attributes/{attribute}?target_value={value}"
            ),
            Self::PlayHomeegram { homeegram } => write!(f, "PUT:homeegrams/{homeegram}?play=1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_wire_grammar() {
        assert_eq!(Command::GetAll.to_string(), "GET:all");
        assert_eq!(Command::GetNode { node: 5 }.to_string(), "GET:/nodes/5/");
        assert_eq!(
            Command::GetAttribute {
                node: 5,
                attribute: 12
            }
            .to_string(),
            "GET:/nodes/5/attributes/12"
        );
        assert_eq!(
            Command::SetValue {
                node: 5,
                attribute: 12,
                value: 1.0
            }
            .to_string(),
            "PUT:/nodes/5/attributes/12?target_value=1"
        );
        assert_eq!(
            Command::SetValue {
                node: 5,
                attribute: 12,
                value: 21.5
            }
            .to_string(),
            "PUT:/nodes/5/attributes/12?target_value=21.5"
        );
        assert_eq!(
            Command::PlayHomeegram { homeegram: 3 }.to_string(),
            "PUT:homeegrams/3?play=1"
        );
    }
}
