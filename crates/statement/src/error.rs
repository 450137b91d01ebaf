//! Statement and metadata-policy error types.
//!
//! This module defines errors that can occur while parsing signed entity
//! statements and while merging or applying metadata policies.

use thiserror::Error;

/// Errors produced while decoding a signed entity statement.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatementError {
    /// Malformed signed token - cannot be decoded.
    #[error("invalid token format: {0}")]
    InvalidTokenFormat(String),

    /// Required claim is missing or empty.
    #[error("missing claim: {0}")]
    MissingClaim(String),

    /// Algorithm not in allowed list.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A verification key could not be used.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl From<jsonwebtoken::errors::Error> for StatementError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => {
                StatementError::InvalidTokenFormat("invalid JWS structure".into())
            },
            ErrorKind::InvalidAlgorithm => {
                StatementError::UnsupportedAlgorithm("algorithm not supported".into())
            },
            _ => StatementError::InvalidTokenFormat(format!("JWS error: {}", err)),
        }
    }
}

/// Errors produced while combining or applying metadata policies.
///
/// A policy error on a trust chain means the chain is discarded during
/// filtering; it never aborts resolution as a whole.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PolicyError {
    /// Two policies along a chain specify irreconcilable operators.
    #[error("conflicting '{operator}' policies for claim '{claim}'")]
    Conflict {
        /// The metadata claim the operators apply to.
        claim: String,
        /// The policy operator that could not be combined.
        operator: &'static str,
    },

    /// A metadata value violates the merged policy.
    #[error("claim '{claim}' violates '{operator}' policy")]
    Violation {
        /// The metadata claim that failed the check.
        claim: String,
        /// The policy operator that was violated.
        operator: &'static str,
    },

    /// A claim marked essential is absent after policy application.
    #[error("essential claim '{claim}' is absent")]
    EssentialClaimAbsent {
        /// The missing claim.
        claim: String,
    },

    /// A metadata partition is not a JSON object and cannot take a policy.
    #[error("invalid metadata partition: {0}")]
    InvalidPartition(String),
}

/// Result type alias for statement operations.
pub type Result<T> = std::result::Result<T, StatementError>;
