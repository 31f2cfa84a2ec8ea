// ── Reactive data store ──
//
// Concurrent entity storage with push-based change notification, plus the
// indexer that derives node/group membership from relationships.

pub(crate) mod collection;
mod data_store;
pub mod relationships;

pub use data_store::DataStore;
pub use relationships::Membership;
