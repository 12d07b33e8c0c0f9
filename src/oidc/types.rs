//! Common types for token verification

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

/// Algorithms a token may be signed with. Never inferred from the token itself.
pub const ALLOWED_ALGORITHMS: [Algorithm; 1] = [Algorithm::RS256];

/// Default lifetime of a cached key set (1 hour).
pub const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Minimum spacing between refetches triggered by an unknown `kid`.
pub const DEFAULT_JWKS_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Default upper bound on a key set fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest key set document accepted from the provider.
pub const MAX_KEY_SET_BYTES: usize = 512 * 1024;

/// Public signing key published by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKey {
    /// Key type (`kty`), e.g. "RSA"
    #[serde(rename = "kty")]
    pub key_type: String,
    /// Key identifier (`kid`)
    #[serde(rename = "kid")]
    pub key_id: String,
    /// Intended use (`use`), normally "sig"
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Base64url-encoded RSA modulus (`n`)
    #[serde(rename = "n")]
    pub modulus: String,
    /// Base64url-encoded RSA public exponent (`e`)
    #[serde(rename = "e")]
    pub exponent: String,
}

/// Key set entry as published; every field is optional so one odd entry
/// does not poison the whole document.
#[derive(Debug, Deserialize)]
struct RawJwk {
    kty: Option<String>,
    kid: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawJwkSet {
    keys: Vec<RawJwk>,
}

/// Ordered collection of signing keys, as published
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    pub keys: Vec<SigningKey>,
}

impl KeySet {
    pub fn new(keys: Vec<SigningKey>) -> Self {
        Self { keys }
    }

    /// Parse a JWKS document, keeping only usable RSA signature keys.
    pub fn from_jwks_json(document: &str) -> serde_json::Result<Self> {
        let raw: RawJwkSet = serde_json::from_str(document)?;

        let mut keys = Vec::with_capacity(raw.keys.len());
        for jwk in raw.keys {
            let Some(kid) = jwk.kid else {
                tracing::warn!("JWK missing kid field, skipping");
                continue;
            };
            if jwk.kty.as_deref() != Some("RSA") {
                tracing::warn!("Skipping non-RSA key {}: kty={:?}", kid, jwk.kty);
                continue;
            }
            if let Some(key_use) = jwk.key_use.as_deref() {
                if key_use != "sig" {
                    tracing::warn!("Skipping key {} with use={}", kid, key_use);
                    continue;
                }
            }
            let (Some(modulus), Some(exponent)) = (jwk.n, jwk.e) else {
                tracing::warn!("RSA key {} missing modulus or exponent, skipping", kid);
                continue;
            };
            keys.push(SigningKey {
                key_type: "RSA".to_string(),
                key_id: kid,
                key_use: jwk.key_use,
                modulus,
                exponent,
            });
        }

        Ok(Self { keys })
    }

    /// Find the key for `kid`. When the provider publishes the same `kid`
    /// more than once, the last entry wins.
    pub fn find(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().rev().find(|key| key.key_id == kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index by `kid`; later entries overwrite earlier ones.
    pub fn index(&self) -> HashMap<String, SigningKey> {
        let mut indexed = HashMap::with_capacity(self.keys.len());
        for key in &self.keys {
            if indexed.insert(key.key_id.clone(), key.clone()).is_some() {
                tracing::warn!("Key set publishes duplicate kid {}; last entry wins", key.key_id);
            }
        }
        indexed
    }
}

/// Key set cache entry
#[derive(Debug, Clone)]
pub struct CachedKeySet {
    /// Keys mapped by key ID
    pub keys: HashMap<String, SigningKey>,
    /// When the keys were fetched
    pub fetched_at: Instant,
}

impl CachedKeySet {
    pub fn new(key_set: &KeySet) -> Self {
        Self {
            keys: key_set.index(),
            fetched_at: Instant::now(),
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Verified claim set of a bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedPayload {
    /// Issuer
    #[serde(rename = "iss")]
    pub issuer: String,
    /// Subject (user ID)
    #[serde(rename = "sub")]
    pub subject: String,
    /// Audience; the provider may send a single string or a list
    #[serde(rename = "aud", deserialize_with = "one_or_many")]
    pub audience: Vec<String>,
    /// Issued at time
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    /// Expiration time
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Authorized party (client the token was issued to)
    #[serde(rename = "azp", default, skip_serializing_if = "Option::is_none")]
    pub authorized_party: Option<String>,
    /// Space-separated OAuth scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Granted permissions; `None` when the claim is absent altogether
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<String>>,
    /// Additional custom claims
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Identity provider settings shared by the resolver and the verifier.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Provider domain, e.g. "tenant.us.auth0.com"
    pub issuer_domain: String,
    /// API identifier the tokens must be issued for
    pub audience: String,
    /// Overrides the well-known key set location
    pub jwks_url: Option<String>,
    /// How long a fetched key set is trusted; zero disables caching
    pub jwks_cache_ttl: Duration,
    /// Minimum spacing between refetches for unknown key IDs
    pub jwks_min_refresh_interval: Duration,
    /// Upper bound on a single key set fetch
    pub fetch_timeout: Duration,
    /// Clock skew tolerated when checking `exp`
    pub leeway: Duration,
}

impl AuthConfig {
    pub fn new(issuer_domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer_domain: issuer_domain.into(),
            audience: audience.into(),
            jwks_url: None,
            jwks_cache_ttl: DEFAULT_JWKS_CACHE_TTL,
            jwks_min_refresh_interval: DEFAULT_JWKS_MIN_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            leeway: Duration::ZERO,
        }
    }

    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = Some(url.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.jwks_min_refresh_interval = interval;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Expected `iss` claim: `https://{issuer_domain}/`
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.issuer_domain.trim_end_matches('/'))
    }

    /// Location of the provider's published key set
    pub fn jwks_url(&self) -> String {
        match &self.jwks_url {
            Some(url) => url.clone(),
            None => format!(
                "https://{}/.well-known/jwks.json",
                self.issuer_domain.trim_end_matches('/')
            ),
        }
    }
}
