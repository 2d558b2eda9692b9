//! Append-only storage for order event streams.
//!
//! Every order owns one stream keyed by its [`OrderId`]. Appends are atomic
//! and guarded by an expected [`Version`], which is what makes a status change
//! and its audit record land together or not at all.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::OrderId;
pub use error::{EventStoreError, Result};
pub use event::{EventId, RecordedEvent, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{EventStore, EventStoreExt};
