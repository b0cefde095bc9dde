//! Persistence Adapters
//!
//! Snapshot files for the in-memory registries. State lives in memory;
//! snapshots are taken and restored explicitly at the boundary.

mod json_snapshot;

pub use json_snapshot::{JsonSnapshotStore, SnapshotError};
