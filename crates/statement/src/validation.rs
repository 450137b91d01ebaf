//! Signing algorithm validation.
//!
//! Entity statements are signed JWTs; before any key lookup the header
//! algorithm is checked against an allowlist. Symmetric algorithms and
//! `none` are always rejected per RFC 8725 — a federation peer must never
//! be able to downgrade verification to a shared secret or to nothing.

use crate::error::StatementError;

/// Algorithms that are never accepted, for security reasons.
///
/// - `none`: no signature verification (trivially bypassable)
/// - `HS256`, `HS384`, `HS512`: symmetric algorithms (shared secret)
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted signing algorithms.
///
/// Currently only EdDSA (Ed25519) is supported end-to-end: it is the only
/// key type the verification pipeline in
/// [`crate::statement::EntityStatement::verify`] is exercised against.
///
/// **To add ES256 or RS256 support in the future:**
/// 1. Add the algorithm back to this list
/// 2. Extend the test key tooling to generate EC/RSA key pairs and JWKs
/// 3. Add end-to-end chain tests verifying statements signed with it
///
/// Per RFC 8725 Section 3.1, validators must reject algorithms they do not
/// fully implement — listing an algorithm here without a tested
/// verification path would produce confusing errors at the signature
/// verification stage.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["EdDSA"];

/// Validate a JWS header algorithm against the allowlist.
///
/// # Errors
///
/// Returns [`StatementError::UnsupportedAlgorithm`] if the algorithm is
/// forbidden or not in [`ACCEPTED_ALGORITHMS`].
///
/// # Examples
///
/// ```
/// use fedtrust_statement::validation::validate_algorithm;
///
/// assert!(validate_algorithm("EdDSA").is_ok());
/// assert!(validate_algorithm("HS256").is_err());
/// assert!(validate_algorithm("none").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), StatementError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(StatementError::UnsupportedAlgorithm(format!(
            "algorithm '{}' is not allowed for security reasons",
            alg
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(StatementError::UnsupportedAlgorithm(format!(
            "algorithm '{}' is not in the accepted list",
            alg
        )));
    }

    Ok(())
}
