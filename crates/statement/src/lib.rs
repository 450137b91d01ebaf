//! # fedtrust Entity Statements
//!
//! Data model for OpenID-Federation entity statements: parsing, claims,
//! verification key sets, metadata, and metadata policies.
//!
//! This crate provides:
//! - **Statement parsing**: compact-JWS decoding with extra-claim
//!   round-tripping, separate from signature verification
//! - **Signature verification**: key-set based, `kid`-aware, with a strict
//!   algorithm allowlist
//! - **Metadata policies**: operator combination and application along a
//!   trust chain
//! - **Set algebra**: the sequence operations metadata policies are
//!   expressed over
//!
//! ## Example
//!
//! ```no_run
//! use fedtrust_statement::parse_entity_statement;
//!
//! # fn example(token: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let stmt = parse_entity_statement(token)?;
//! println!("{} about {}", stmt.issuer(), stmt.subject());
//!
//! // Verification happens later, once the trusted keys are known.
//! let trusted = stmt.verify(stmt.jwks());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Statement and policy error types.
pub mod error;
/// Verification key sets.
pub mod jwks;
/// Entity metadata partitioned by entity type.
pub mod metadata;
/// Metadata policy combination and application.
pub mod policy;
/// Set algebra over plain sequences.
pub mod set_ops;
/// Entity statement parsing and verification.
pub mod statement;
/// Signing algorithm validation.
pub mod validation;

#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

// Re-export key types for convenience
pub use error::{PolicyError, Result, StatementError};
pub use jwks::Jwks;
pub use metadata::{FederationEntityMetadata, Metadata};
pub use policy::{MetadataPolicy, PolicyOperators};
pub use statement::{
    ENTITY_STATEMENT_TYP, EntityStatement, EntityStatementPayload, TrustMarkInfo,
    parse_entity_statement,
};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
