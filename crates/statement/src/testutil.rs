//! Shared test utilities for statement testing.
//!
//! Helpers for generating Ed25519 key pairs, building entity-statement
//! payloads, and signing them as compact JWS tokens. Feature-gated behind
//! `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! fedtrust-statement = { path = "../statement", features = ["testutil"] }
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand_core::OsRng;
use serde_json::{Value, json};

use crate::{jwks::Jwks, statement::ENTITY_STATEMENT_TYP};

/// Generate a test Ed25519 key pair.
///
/// Returns `(pkcs8_der, public_key_base64url)` where `pkcs8_der` is the
/// private key in PKCS#8 DER format (suitable for
/// [`EncodingKey::from_ed_der`]) and `public_key_base64url` is the 32-byte
/// public key encoded as base64url without padding (suitable for the `x`
/// parameter of an OKP JWK). Each call generates a fresh random key pair.
pub fn generate_keypair() -> (Vec<u8>, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public_key_b64 = URL_SAFE_NO_PAD.encode(signing_key.verifying_key().to_bytes());

    let private_bytes = signing_key.to_bytes();
    let mut pkcs8_der = vec![
        0x30, 0x2e, // SEQUENCE, 46 bytes
        0x02, 0x01, 0x00, // INTEGER version 0
        0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
        0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
        0x04, 0x22, // OCTET STRING, 34 bytes
        0x04, 0x20, // OCTET STRING, 32 bytes (the actual key)
    ];
    pkcs8_der.extend_from_slice(&private_bytes);

    (pkcs8_der, public_key_b64)
}

/// An Ed25519 signing identity for one test entity.
///
/// Bundles the private key with its public JWK so tests can both sign
/// statements and advertise the matching key set.
pub struct StatementSigner {
    kid: String,
    pkcs8_der: Vec<u8>,
    public_key_b64: String,
}

impl StatementSigner {
    /// Generates a fresh signer with the given key ID.
    #[must_use]
    pub fn generate(kid: &str) -> Self {
        let (pkcs8_der, public_key_b64) = generate_keypair();
        Self { kid: kid.to_string(), pkcs8_der, public_key_b64 }
    }

    /// The signer's public key as a one-key JWK set.
    ///
    /// # Panics
    ///
    /// Panics if JWK construction fails (should not happen for a freshly
    /// generated key).
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        self.jwks_with_kid(&self.kid)
    }

    /// The signer's public key under a different key ID.
    ///
    /// Useful for exercising `kid`-mismatch fallback paths.
    ///
    /// # Panics
    ///
    /// Panics if JWK construction fails.
    #[must_use]
    pub fn jwks_with_kid(&self, kid: &str) -> Jwks {
        serde_json::from_value(json!({
            "keys": [{
                "kty": "OKP",
                "crv": "Ed25519",
                "kid": kid,
                "alg": "EdDSA",
                "use": "sig",
                "x": self.public_key_b64,
            }]
        }))
        .expect("valid OKP JWK set")
    }

    /// Signs a payload as an entity-statement JWS (`typ`
    /// `entity-statement+jwt`, `alg` EdDSA, `kid` set).
    ///
    /// # Panics
    ///
    /// Panics if JWS encoding fails (should not happen with valid inputs).
    #[must_use]
    pub fn sign(&self, payload: &Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some(ENTITY_STATEMENT_TYP.to_string());
        header.kid = Some(self.kid.clone());

        let encoding_key = EncodingKey::from_ed_der(&self.pkcs8_der);
        jsonwebtoken::encode(&header, payload, &encoding_key)
            .expect("failed to encode test statement")
    }
}

/// Builds an entity-configuration payload (`iss == sub`), issued now and
/// valid for one hour.
#[must_use]
pub fn entity_configuration_payload(entity_id: &str, jwks: &Jwks) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": entity_id,
        "sub": entity_id,
        "iat": now,
        "exp": now + 3600,
        "jwks": jwks,
    })
}

/// Builds a subordinate-statement payload: `issuer` attesting to `subject`
/// and carrying the subject's keys, issued now and valid for one hour.
#[must_use]
pub fn subordinate_payload(issuer: &str, subject: &str, subject_jwks: &Jwks) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": issuer,
        "sub": subject,
        "iat": now,
        "exp": now + 3600,
        "jwks": subject_jwks,
    })
}

/// Creates a raw statement string from arbitrary header and payload JSON.
///
/// The result has the structure `{header_b64}.{payload_b64}.` with an empty
/// signature — useful for testing rejection of malformed or attack tokens
/// (e.g. `alg: "none"`).
///
/// # Panics
///
/// Panics if JSON serialization fails.
#[must_use]
pub fn craft_raw_statement(header_json: &Value, payload_json: &Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}
