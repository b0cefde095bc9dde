//! Execution tactic errors.

use thiserror::Error;

use super::value_objects::AlgoStatus;
use crate::domain::order_execution::OrderError;

/// Errors that can occur while configuring or driving an execution algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TacticError {
    /// Invalid tactic configuration.
    #[error("invalid tactic configuration: {message}")]
    InvalidConfiguration {
        /// Error message.
        message: String,
    },

    /// No execution registered under the id.
    #[error("execution not found: {execution_id}")]
    NotFound {
        /// Execution identifier.
        execution_id: String,
    },

    /// Operation not allowed in the current status.
    #[error("cannot {action} execution in status {status}")]
    InvalidState {
        /// Current status.
        status: AlgoStatus,
        /// Attempted action.
        action: &'static str,
    },

    /// Child order could not be built.
    #[error(transparent)]
    Order(#[from] OrderError),
}

impl TacticError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_display() {
        let err = TacticError::InvalidState {
            status: AlgoStatus::Completed,
            action: "pause",
        };
        assert_eq!(err.to_string(), "cannot pause execution in status COMPLETED");
    }
}
