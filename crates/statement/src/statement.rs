//! Entity statement parsing and verification.
//!
//! An entity statement is a signed JWT making an assertion about an entity:
//! either a self-signed *entity configuration* (issuer equals subject) or a
//! *subordinate statement* issued by a superior about one of its
//! subordinates. Parsing and signature verification are deliberately
//! separate steps — trust-chain resolution must inspect claims (authority
//! hints, fetch endpoints) before it can know which keys a signature should
//! verify under.

use std::collections::HashSet;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::Validation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::StatementError,
    jwks::Jwks,
    metadata::Metadata,
    policy::MetadataPolicy,
    validation::validate_algorithm,
};

/// The `typ` header value of an entity statement JWS.
pub const ENTITY_STATEMENT_TYP: &str = "entity-statement+jwt";

/// The claims of an entity statement.
///
/// Wire names follow the federation specification (`iss`, `sub`, `iat`,
/// `exp`). Claims not enumerated here are preserved in `extra` so a
/// statement round-trips without loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStatementPayload {
    /// Issuer entity identifier.
    pub iss: String,

    /// Subject entity identifier.
    pub sub: String,

    /// Issued-at time (Unix seconds on the wire).
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Expiration time (Unix seconds on the wire).
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,

    /// Verification keys of the subject. Empty for pure subordinate
    /// statements that only attest, never key.
    #[serde(default, skip_serializing_if = "Jwks::is_empty")]
    pub jwks: Jwks,

    /// Identifiers of superiors, present only in entity configurations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority_hints: Option<Vec<String>>,

    /// Metadata partitioned by entity type tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    /// Policy a superior imposes on the subject's metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_policy: Option<MetadataPolicy>,

    /// Trust marks; carried through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_marks: Option<Vec<TrustMarkInfo>>,

    /// Every claim not enumerated above, preserved for round-tripping.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A trust mark attached to an entity configuration.
///
/// The resolver never validates trust marks; they pass through to the
/// resolve response as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustMarkInfo {
    /// Trust mark identifier.
    pub id: String,

    /// The trust mark itself, a signed JWT.
    pub trust_mark: String,

    /// Unrecognised companion claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A parsed entity statement: decoded claims plus the raw signed token.
///
/// Statements are immutable after parsing. The raw token is retained
/// because trust chains are re-serialised as the original signed tokens,
/// byte for byte.
#[derive(Debug, Clone)]
pub struct EntityStatement {
    raw: String,
    payload: EntityStatementPayload,
}

impl EntityStatement {
    /// Builds a statement from a raw token and its decoded payload.
    ///
    /// Prefer [`parse_entity_statement`]; this constructor exists for test
    /// helpers that assemble statements directly.
    #[must_use]
    pub fn from_parts(raw: String, payload: EntityStatementPayload) -> Self {
        Self { raw, payload }
    }

    /// The raw signed token exactly as obtained.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The decoded claims.
    #[must_use]
    pub fn payload(&self) -> &EntityStatementPayload {
        &self.payload
    }

    /// Issuer entity identifier.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.payload.iss
    }

    /// Subject entity identifier.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.payload.sub
    }

    /// Expiration time.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.payload.exp
    }

    /// Issued-at time.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.payload.iat
    }

    /// The subject's verification keys.
    #[must_use]
    pub fn jwks(&self) -> &Jwks {
        &self.payload.jwks
    }

    /// Authority hints, or an empty slice when none were declared.
    #[must_use]
    pub fn authority_hints(&self) -> &[String] {
        self.payload.authority_hints.as_deref().unwrap_or_default()
    }

    /// The metadata claim, when present.
    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        self.payload.metadata.as_ref()
    }

    /// Mutable access to the metadata claim (entity-type pruning).
    pub fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        self.payload.metadata.as_mut()
    }

    /// The metadata policy claim, when present.
    #[must_use]
    pub fn metadata_policy(&self) -> Option<&MetadataPolicy> {
        self.payload.metadata_policy.as_ref()
    }

    /// Trust marks, or an empty slice when none were declared.
    #[must_use]
    pub fn trust_marks(&self) -> &[TrustMarkInfo] {
        self.payload.trust_marks.as_deref().unwrap_or_default()
    }

    /// Returns true iff `now` falls within `[iat, exp]`, both endpoints
    /// included.
    #[must_use]
    pub fn time_valid(&self, now: DateTime<Utc>) -> bool {
        self.payload.iat <= now && now <= self.payload.exp
    }

    /// Returns true iff this is a self-signed entity configuration
    /// (issuer equals subject).
    #[must_use]
    pub fn is_entity_configuration(&self) -> bool {
        self.payload.iss == self.payload.sub
    }

    /// Verifies the token signature against a key set.
    ///
    /// Signature check only: time validity is a separate concern handled by
    /// [`time_valid`](Self::time_valid). When the token header carries a
    /// `kid` present in the set, only that key is tried; otherwise every
    /// key is a candidate and one match suffices.
    #[must_use]
    pub fn verify(&self, jwks: &Jwks) -> bool {
        let header = match jsonwebtoken::decode_header(&self.raw) {
            Ok(header) => header,
            Err(error) => {
                tracing::debug!(issuer = %self.payload.iss, %error, "undecodable statement header");
                return false;
            },
        };
        if let Err(error) = validate_algorithm(&format!("{:?}", header.alg)) {
            tracing::debug!(issuer = %self.payload.iss, %error, "statement algorithm rejected");
            return false;
        }

        let mut validation = Validation::new(header.alg);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        for jwk in jwks.candidates(header.kid.as_deref()) {
            let Ok(key) = Jwks::decoding_key(jwk) else {
                continue;
            };
            if jsonwebtoken::decode::<Value>(&self.raw, &key, &validation).is_ok() {
                return true;
            }
        }
        false
    }
}

/// Decodes a signed entity statement without verifying its signature.
///
/// Splits the compact JWS, base64url-decodes the payload, and parses the
/// claims; the raw token is retained on the result. Signature verification
/// is a separate step ([`EntityStatement::verify`]) because the verifying
/// keys are only known once the surrounding trust tree has been built.
///
/// # Errors
///
/// Returns an error if:
/// - the token is not valid UTF-8 or does not have exactly 3 parts
/// - the header is undecodable, or carries a `typ` other than
///   [`ENTITY_STATEMENT_TYP`]
/// - the payload is not base64url or not valid JSON for the expected claims
/// - `iss` or `sub` is empty
pub fn parse_entity_statement(token: &[u8]) -> Result<EntityStatement, StatementError> {
    let raw = std::str::from_utf8(token)
        .map_err(|_| StatementError::InvalidTokenFormat("token is not valid UTF-8".into()))?
        .trim()
        .to_string();

    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() != 3 {
        return Err(StatementError::InvalidTokenFormat(
            "statement must have 3 parts separated by dots".into(),
        ));
    }

    let header = jsonwebtoken::decode_header(&raw)?;
    if let Some(typ) = &header.typ
        && typ != ENTITY_STATEMENT_TYP
    {
        return Err(StatementError::InvalidTokenFormat(format!(
            "unexpected token type '{}'",
            typ
        )));
    }

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| StatementError::InvalidTokenFormat(format!("payload base64: {}", e)))?;

    let payload: EntityStatementPayload = serde_json::from_slice(&payload_bytes)
        .map_err(|e| StatementError::InvalidTokenFormat(format!("payload claims: {}", e)))?;

    if payload.iss.is_empty() {
        return Err(StatementError::MissingClaim("iss".into()));
    }
    if payload.sub.is_empty() {
        return Err(StatementError::MissingClaim("sub".into()));
    }

    Ok(EntityStatement { raw, payload })
}
