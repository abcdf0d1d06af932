//! Error types for the LazyFlock simulation engine.

use thiserror::Error;

/// Errors raised by configuration validation and by the episode API.
///
/// Configuration variants are fatal and surface before any simulation step
/// runs. Action variants reject a single `step` call and leave the episode
/// state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlockError {
    /// The agent-count pool is empty, inverted, or holds counts below 2
    #[error("Invalid agent pool: {0}")]
    InvalidAgentPool(String),

    /// Range-limited communication combined with a fixed topology
    #[error("Incompatible topology: {0}")]
    IncompatibleTopology(String),

    /// Star topology needs a hub and at least one leaf
    #[error("Star topology requires at least 2 active agents, got {active}")]
    StarTooSmall { active: usize },

    /// Task, boundary, env mode or action type that is not implemented
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Any other out-of-domain configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Action vector length does not match the arena capacity
    #[error("Action must have length {expected}, got {got}")]
    ActionShape { expected: usize, got: usize },

    /// Action element is NaN or infinite
    #[error("Action element {index} is not finite")]
    NonFiniteAction { index: usize },

    /// Inconsistent dimensions passed to a scenario replay
    #[error("Scenario shape error: {0}")]
    ScenarioShape(String),

    /// Recording could not be serialized or written
    #[error("Export failed: {0}")]
    Export(String),

    /// `step` called before the first `reset`
    #[error("Episode not started; call reset() first")]
    EpisodeNotStarted,

    /// `step` called after the episode reached DONE
    #[error("Episode finished at step {0}; call reset() to start a new one")]
    EpisodeFinished(usize),
}

impl FlockError {
    /// Creates an invalid-config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Creates an unsupported-feature error.
    pub fn unsupported(what: impl std::fmt::Display) -> Self {
        Self::Unsupported(what.to_string())
    }

    /// Returns true for errors that are raised before simulation starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidAgentPool(_)
                | Self::IncompatibleTopology(_)
                | Self::StarTooSmall { .. }
                | Self::Unsupported(_)
                | Self::InvalidConfig(_)
        )
    }
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, FlockError>;
