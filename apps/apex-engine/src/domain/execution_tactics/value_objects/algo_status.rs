//! Algorithm status and kind.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an execution algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlgoStatus {
    /// Registered, not started.
    Pending,
    /// Generating slices.
    Running,
    /// Temporarily not generating slices.
    Paused,
    /// Total amount executed.
    Completed,
    /// Stopped on request.
    Cancelled,
    /// Stopped after a failure.
    Error,
}

impl AlgoStatus {
    /// True once no further slices will ever be generated.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }
}

impl fmt::Display for AlgoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Which slicing algorithm an execution runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgoKind {
    /// Time-weighted average price.
    Twap,
    /// Volume-weighted average price.
    Vwap,
    /// Percentage of volume.
    Pov,
}

impl AlgoKind {
    /// Lowercase label used in child order metadata.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Twap => "twap",
            Self::Vwap => "vwap",
            Self::Pov => "pov",
        }
    }
}

impl fmt::Display for AlgoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
