//! Error types for the census node.

use std::time::Duration;

use census_control::SignalDropped;
use census_model::LeaveReason;
use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a census node.
#[derive(Debug, Error)]
pub enum Error {
    /// An environment variable holds a value that cannot be used.
    #[error("invalid value {value:?} for {var}")]
    Config { var: &'static str, value: String },

    /// The consensus did not confirm a graceful leave in time.
    #[error("leave with reason {reason} not confirmed within {waited:?}")]
    StuckLeave { reason: LeaveReason, waited: Duration },

    /// Population error
    #[error("population error: {0}")]
    Population(#[from] census_population::Error),

    /// Registry error
    #[error("registry error: {0}")]
    Registry(#[from] census_registry::Error),

    /// The leave signal was dropped without firing.
    #[error(transparent)]
    Signal(#[from] SignalDropped),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
