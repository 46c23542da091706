//! Error types for the simulation engine.
//!
//! Each failure family gets its own enum so callers can tell configuration
//! mistakes apart from simulated transport failures and verification
//! results. [`MockError`] unifies them for the public entry points.

use std::sync::Arc;
use std::time::Duration;

/// Raised while configuring matchers, behaviors and setups.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot add matcher '{added}': conflicts with existing matcher '{existing}'")]
    ConflictingMatcher { added: String, existing: String },
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),
    #[error("Value out of range for {name}: {value}")]
    OutOfRange { name: &'static str, value: String },
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),
    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("Invalid response content: {0}")]
    InvalidContent(String),
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Raised when a matched setup cannot produce a response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No response configured for setup: {setup}")]
    NoResponseConfigured { setup: String },
}

/// An intentional failure produced by a setup instead of a response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SimulatedFailure {
    #[error("{0}")]
    Thrown(Arc<dyn std::error::Error + Send + Sync>),
    #[error("The request timed out after {0:?}")]
    Timeout(Duration),
    #[error("The request was cancelled")]
    Cancelled,
}

/// Raised by verification calls only.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Expected request to have been sent {expected}{reason}, but was sent {actual} time(s).\nMatching: {matching}")]
    CountMismatch {
        expected: String,
        actual: usize,
        matching: String,
        reason: String,
    },
    #[error("There are {count} unfulfilled expectations:\n{setups}")]
    Unsatisfied { count: usize, setups: String },
    #[error("There are {count} unverified requests:\n{requests}")]
    UnverifiedRequests { count: usize, requests: String },
}

/// Misuse of the rate-limited stream or I/O failure while reading content.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    #[error("Unsupported stream operation: {0}")]
    Unsupported(String),
    #[error("Stream I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Unified error returned from the engine surface.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Simulated(#[from] SimulatedFailure),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl MockError {
    /// Whether this error is a timeout or cancellation, real or simulated.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            MockError::Simulated(SimulatedFailure::Timeout(_) | SimulatedFailure::Cancelled)
        )
    }
}
