//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - `clock`: wall clock and a manual clock for deterministic tests
//! - `alerts`: tracing, in-memory and no-op alert sinks
//! - `venue/`: in-memory paper venue
//! - `persistence/`: JSON snapshot store for ledger and risk state

pub mod alerts;
pub mod clock;
pub mod persistence;
pub mod venue;

pub use alerts::{InMemoryAlertSink, LogAlertSink, NoOpAlertSink};
pub use clock::{ManualClock, SystemClock};
pub use persistence::{JsonSnapshotStore, SnapshotError};
pub use venue::PaperVenue;
