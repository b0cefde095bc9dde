//! Routing Bounded Context
//!
//! Pure scoring of venue snapshots. Data collection and order placement
//! happen in the application layer's smart router; everything here works on
//! a consistent set of [`VenueQuote`]s.

mod arbitrage;
mod decision;
mod errors;
mod health;
mod priority;
mod scoring;

pub use arbitrage::{ArbitrageOpportunity, find_arbitrage};
pub use decision::{RoutingDecision, VenueScore};
pub use errors::RoutingError;
pub use health::VenueHealth;
pub use priority::RoutingPriority;
pub use scoring::{ScoringParams, VenueQuote, rank_venues, score_venue};
