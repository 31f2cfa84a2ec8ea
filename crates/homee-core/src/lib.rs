//! Session lifecycle, entity mirror, and event surface for the homee hub.
//!
//! This crate sits between `homee-api` (wire transport) and consumers such
//! as the `homee` CLI:
//!
//! - **[`Session`]** — Owns one hub connection: [`run()`](Session::run)
//!   acquires a token, opens the push channel, and keeps reconnecting with
//!   linear backoff until stopped or out of retries. Outbound commands go
//!   through a bounded queue drained by the send loop.
//!
//! - **[`DataStore`]** — Reactive in-memory mirror of nodes, attributes,
//!   groups, relationships, users, devices, settings and the current
//!   warning, built on `EntityCollection<T>` (`DashMap` + `watch`).
//!   Node/group membership is re-derived from relationships on every change.
//!
//! - **[`Dispatcher`]** — Routes each inbound frame by its single top-level
//!   key and applies it to the store.
//!
//! - **[`EventHub`]** — Synchronous callbacks with explicit
//!   [`Subscription`] handles, plus a broadcast channel for async consumers.
//!
//! - **Domain model** ([`model`]) — Typed records decoded straight from the
//!   hub's JSON.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
mod gate;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::HubConfig;
pub use dispatch::Dispatcher;
pub use error::CoreError;
pub use events::{EventHub, HubEvent, Subscription};
pub use session::{ConnectionState, Session};
pub use store::{DataStore, Membership};
pub use stream::EntityStream;

pub use model::{
    Attribute, AttributeId, AttributeType, Attributes, Device, Group, GroupId, HomeegramId, Node,
    NodeId, Relationship, Settings, User, Warning,
};
