//! Venue Adapters
//!
//! Only an in-memory paper venue ships with the engine; real exchange
//! connectors implement `VenuePort` outside this crate.

mod paper;

pub use paper::PaperVenue;
