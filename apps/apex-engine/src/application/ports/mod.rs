//! Application Ports (Driven)
//!
//! Interfaces the core uses to reach the outside world. Adapters live in
//! [`crate::infrastructure`].

mod alert_port;
mod clock_port;
mod venue_port;

pub use alert_port::{Alert, AlertError, AlertKind, AlertSeverity, AlertSink, dispatch_alert};
pub use clock_port::Clock;
pub use venue_port::{Balance, Fees, Ticker, VenueError, VenuePort};

#[cfg(test)]
pub use alert_port::MockAlertSink;
