// ── Domain model ──
//
// Typed records for every entity the hub pushes. Payloads are decoded
// straight into these structs at ingestion time; URL-encoded text fields
// are decoded on the way in so consumers only ever see plain strings.

pub mod attribute;
pub mod group;
pub mod node;
pub mod relationship;
pub mod settings;
pub mod user;
pub mod warning;

pub(crate) mod de;

// ── Identity ────────────────────────────────────────────────────────

pub type NodeId = i64;
pub type AttributeId = i64;
pub type GroupId = i64;
pub type RelationshipId = i64;
pub type UserId = i64;
pub type DeviceId = i64;
pub type HomeegramId = i64;

/// Numeric attribute type code (brightness, on/off, temperature, ...).
pub type AttributeType = u32;

/// Anything the store keys by a numeric id.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> i64;
}

// ── Re-exports ──────────────────────────────────────────────────────

pub use attribute::{Attribute, AttributeOptions, Attributes};
pub use group::Group;
pub use node::Node;
pub use relationship::Relationship;
pub use settings::Settings;
pub use user::{Device, User};
pub use warning::Warning;
