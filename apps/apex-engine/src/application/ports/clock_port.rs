//! Clock Port (Driven Port)
//!
//! Single time source for scheduling decisions so tests can drive a virtual
//! clock instead of sleeping.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}
