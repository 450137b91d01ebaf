//! Resolver error types and result alias.
//!
//! Resolution is deliberately tolerant: transport, parse, and policy errors
//! are per-branch or per-chain and prune only the offending path. The
//! variants here exist so the pruning sites can log something meaningful,
//! not so callers can abort — the worst outcome of resolution is an empty
//! chain set.

use std::sync::Arc;

use fedtrust_statement::{PolicyError, StatementError};
use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Errors that can occur while obtaining and processing entity statements.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolverError {
    /// The obtainer could not produce statement bytes (unreachable host,
    /// non-success status, malformed response).
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<BoxError>,
    },

    /// The obtained bytes are not a well-formed entity statement.
    #[error("statement parse error: {0}")]
    Parse(#[from] StatementError),

    /// Metadata policies along a chain could not be merged or applied.
    #[error("metadata policy error: {0}")]
    Policy(#[from] PolicyError),

    /// A trust chain with no statements was handed to a chain consumer.
    #[error("empty trust chain")]
    EmptyChain,
}

impl ResolverError {
    /// Creates a transport error with no source.
    pub fn transport(message: impl Into<String>) -> Self {
        ResolverError::Transport { message: message.into(), source: None }
    }
}

impl From<reqwest::Error> for ResolverError {
    fn from(err: reqwest::Error) -> Self {
        ResolverError::Transport { message: err.to_string(), source: Some(Arc::new(err)) }
    }
}
