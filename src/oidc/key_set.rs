//! Key set retrieval and signing key resolution

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::decode_header;
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};

use super::types::{AuthConfig, CachedKeySet, KeySet, SigningKey, MAX_KEY_SET_BYTES};
use crate::auth::AuthorizationError;
use crate::error::{PepError, Result};

/// Where the provider's published key set comes from
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<KeySet>;
}

/// Fetches the key set from the provider's HTTPS endpoint
#[derive(Clone)]
pub struct HttpKeySetSource {
    http_client: Client,
    jwks_url: String,
    timeout: Duration,
}

impl HttpKeySetSource {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| PepError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            jwks_url: config.jwks_url(),
            timeout: config.fetch_timeout,
        })
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    fn transport_error(&self, e: reqwest::Error) -> PepError {
        if e.is_timeout() {
            PepError::KeySetTimeout(self.timeout)
        } else {
            PepError::KeySetFetch(format!("Failed to fetch key set: {}", e))
        }
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<KeySet> {
        tracing::debug!("Fetching key set from: {}", self.jwks_url);

        let mut response = self
            .http_client
            .get(&self.jwks_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(PepError::KeySetFetch(format!(
                "Key set fetch failed with status: {}",
                response.status()
            )));
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_KEY_SET_BYTES as u64)
        {
            return Err(oversized_key_set());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.transport_error(e))? {
            if body.len() + chunk.len() > MAX_KEY_SET_BYTES {
                return Err(oversized_key_set());
            }
            body.extend_from_slice(&chunk);
        }

        let document = String::from_utf8(body)
            .map_err(|e| PepError::KeySetFetch(format!("Key set is not UTF-8: {}", e)))?;

        KeySet::from_jwks_json(&document)
            .map_err(|e| PepError::KeySetFetch(format!("Failed to parse key set: {}", e)))
    }
}

fn oversized_key_set() -> PepError {
    PepError::KeySetFetch(format!(
        "Key set document exceeds {} bytes",
        MAX_KEY_SET_BYTES
    ))
}

/// Resolves a token's `kid` to a published signing key.
///
/// Keys are cached for `jwks_cache_ttl`. An unknown `kid` triggers a refetch
/// (the provider may have rotated keys), at most once per
/// `jwks_min_refresh_interval`. A zero TTL fetches on every call.
///
/// Refreshes are single-flight: concurrent misses wait on one fetch and then
/// read its result.
pub struct KeySetResolver {
    source: Arc<dyn KeySetSource>,
    cache: RwLock<Option<CachedKeySet>>,
    refresh_guard: Mutex<()>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
}

enum CacheLookup {
    Hit(SigningKey),
    /// Fresh key set without this kid, fetched too recently to ask again
    Absent,
    Refresh,
}

impl KeySetResolver {
    pub fn new(config: &AuthConfig, source: Arc<dyn KeySetSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
            refresh_guard: Mutex::new(()),
            cache_ttl: config.jwks_cache_ttl,
            min_refresh_interval: config.jwks_min_refresh_interval,
        }
    }

    /// Resolver backed by the provider's HTTPS key set endpoint.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let source = HttpKeySetSource::new(config)?;
        Ok(Self::new(config, Arc::new(source)))
    }

    /// Read the unverified token header and return the key it names.
    pub async fn resolve(&self, token: &str) -> std::result::Result<SigningKey, AuthorizationError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!("Unreadable token header: {}", e);
            AuthorizationError::UnparseableToken
        })?;

        let kid = header
            .kid
            .ok_or(AuthorizationError::MalformedHeader(AuthorizationError::KID_MISSING))?;

        self.signing_key(&kid).await
    }

    /// Look up `kid`, refreshing the cached key set when needed.
    pub async fn signing_key(&self, kid: &str) -> std::result::Result<SigningKey, AuthorizationError> {
        if let Some(found) = self.cached_outcome(kid).await {
            return found;
        }

        let _refreshing = self.refresh_guard.lock().await;
        // Another caller may have refreshed while this one waited.
        if let Some(found) = self.cached_outcome(kid).await {
            return found;
        }

        let cached = self.fetch_and_store().await.map_err(|e| {
            tracing::error!("Key set unavailable: {}", e);
            AuthorizationError::KeySetUnavailable
        })?;

        cached.keys.get(kid).cloned().ok_or_else(|| {
            tracing::debug!("No key for kid {} in fetched key set", kid);
            AuthorizationError::KeyNotFound
        })
    }

    /// Fetch the key set and replace the cache.
    pub async fn refresh(&self) -> Result<CachedKeySet> {
        let _refreshing = self.refresh_guard.lock().await;
        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> Result<CachedKeySet> {
        let key_set = self.source.fetch().await?;
        let cached = CachedKeySet::new(&key_set);
        tracing::debug!("Fetched key set with {} signing keys", cached.keys.len());

        if !self.cache_ttl.is_zero() {
            *self.cache.write().await = Some(cached.clone());
        }

        Ok(cached)
    }

    /// Drop cached keys so the next lookup fetches.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    async fn cached_outcome(
        &self,
        kid: &str,
    ) -> Option<std::result::Result<SigningKey, AuthorizationError>> {
        match self.lookup_cached(kid).await {
            CacheLookup::Hit(key) => Some(Ok(key)),
            CacheLookup::Absent => {
                tracing::debug!("No key for kid {} in recently fetched key set", kid);
                Some(Err(AuthorizationError::KeyNotFound))
            }
            CacheLookup::Refresh => None,
        }
    }

    async fn lookup_cached(&self, kid: &str) -> CacheLookup {
        let cache = self.cache.read().await;
        let Some(cached) = cache.as_ref() else {
            return CacheLookup::Refresh;
        };
        if !cached.is_fresh(self.cache_ttl) {
            return CacheLookup::Refresh;
        }
        match cached.keys.get(kid) {
            Some(key) => CacheLookup::Hit(key.clone()),
            None if cached.is_fresh(self.min_refresh_interval) => CacheLookup::Absent,
            None => CacheLookup::Refresh,
        }
    }
}
