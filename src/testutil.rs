//! Shared test utilities for token verification tests.
//!
//! Provides fixture RSA key pairs (with their JWK modulus/exponent), helpers
//! for minting signed tokens and crafting raw ones for attack tests, and an
//! in-memory [`KeySetSource`] that counts fetches.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{get_current_timestamp, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use crate::error::{PepError, Result};
use crate::oidc::key_set::KeySetSource;
use crate::oidc::types::{AuthConfig, DecodedPayload, KeySet, SigningKey};

pub const TEST_ISSUER_DOMAIN: &str = "idp.example";
pub const TEST_AUDIENCE: &str = "gnss";
pub const TEST_KID: &str = "K1";

pub const PRIMARY_KEY_PEM: &str = include_str!("../tests/fixtures/primary_rsa.pem");
pub const PRIMARY_MODULUS: &str = include_str!("../tests/fixtures/primary_rsa.modulus");

pub const SECONDARY_KEY_PEM: &str = include_str!("../tests/fixtures/secondary_rsa.pem");
pub const SECONDARY_MODULUS: &str = include_str!("../tests/fixtures/secondary_rsa.modulus");

pub const TEST_EXPONENT: &str = "AQAB";

pub fn test_config() -> AuthConfig {
    AuthConfig::new(TEST_ISSUER_DOMAIN, TEST_AUDIENCE)
}

pub fn signing_key(kid: &str, modulus: &str) -> SigningKey {
    SigningKey {
        key_type: "RSA".to_string(),
        key_id: kid.to_string(),
        key_use: Some("sig".to_string()),
        modulus: modulus.to_string(),
        exponent: TEST_EXPONENT.to_string(),
    }
}

/// Key set publishing the primary key under [`TEST_KID`].
pub fn primary_key_set() -> KeySet {
    KeySet::new(vec![signing_key(TEST_KID, PRIMARY_MODULUS)])
}

/// Standard claims for a token issued by the test provider, valid for an hour.
pub fn claims_with_permissions(permissions: &[&str]) -> Value {
    let now = get_current_timestamp() as i64;
    json!({
        "iss": format!("https://{}/", TEST_ISSUER_DOMAIN),
        "sub": "auth0|tester",
        "aud": TEST_AUDIENCE,
        "iat": now,
        "exp": now + 3600,
        "azp": "test-client",
        "scope": "openid profile",
        "permissions": permissions,
    })
}

pub fn sample_payload(permissions: &[&str]) -> DecodedPayload {
    DecodedPayload {
        issuer: format!("https://{}/", TEST_ISSUER_DOMAIN),
        subject: "auth0|tester".to_string(),
        audience: vec![TEST_AUDIENCE.to_string()],
        issued_at: None,
        expires_at: get_current_timestamp() as i64 + 3600,
        authorized_party: None,
        scope: Some("openid profile".to_string()),
        permissions: Some(permissions.iter().map(|p| p.to_string()).collect::<BTreeSet<_>>()),
        extra: HashMap::new(),
    }
}

/// Sign `claims` with an RSA private key in PKCS#1 PEM format.
///
/// # Panics
///
/// Panics if the key or claims cannot be encoded.
pub fn mint_token(private_key_pem: &str, algorithm: Algorithm, kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(algorithm);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).expect("fixture RSA key");
    jsonwebtoken::encode(&header, claims, &key).expect("Failed to encode test JWT")
}

/// RS256 token signed by the primary key under [`TEST_KID`].
pub fn mint_primary_token(claims: &Value) -> String {
    mint_token(PRIMARY_KEY_PEM, Algorithm::RS256, Some(TEST_KID), claims)
}

/// HS256 token whose shared secret is the published modulus, the classic
/// algorithm-confusion forgery.
pub fn mint_hs256_token(kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_secret(PRIMARY_MODULUS.as_bytes());
    jsonwebtoken::encode(&header, claims, &key).expect("Failed to encode test JWT")
}

/// Build a raw `header.claims.signature` string without signing.
pub fn craft_raw_token(header: &Value, claims: &Value, signature: &str) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string()),
        signature
    )
}

/// In-memory key set source that counts how often it is asked.
pub struct StaticKeySetSource {
    key_set: Mutex<Option<KeySet>>,
    fetches: AtomicUsize,
    delay: Duration,
}

impl StaticKeySetSource {
    pub fn new(key_set: KeySet) -> Self {
        Self {
            key_set: Mutex::new(Some(key_set)),
            fetches: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// A source whose every fetch fails.
    pub fn unavailable() -> Self {
        Self {
            key_set: Mutex::new(None),
            fetches: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Make every fetch take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the published keys, as a provider does on rotation.
    pub fn publish(&self, key_set: KeySet) {
        *self.key_set.lock().expect("key set lock") = Some(key_set);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for StaticKeySetSource {
    async fn fetch(&self) -> Result<KeySet> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.key_set
            .lock()
            .expect("key set lock")
            .clone()
            .ok_or_else(|| PepError::KeySetFetch("provider unreachable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_moduli_are_bare_base64url() {
        for modulus in [PRIMARY_MODULUS, SECONDARY_MODULUS] {
            assert!(!modulus.is_empty());
            assert!(modulus
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
        }
        assert_ne!(PRIMARY_MODULUS, SECONDARY_MODULUS);
    }
}
