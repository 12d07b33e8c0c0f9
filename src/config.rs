//! Configuration parsing module for the GNSS PEP
//!
//! This module loads identity provider settings from TOML files or from the
//! environment and turns them into the immutable [`AuthConfig`] that the
//! resolver, verifier and gate are built from.
//!
//! # Example
//!
//! ```rust,ignore
//! use gnss_pep::config::load_config;
//!
//! let config = load_config("config.toml")?;
//! let auth_config = config.auth_config()?.to_auth_config();
//! let gate = gnss_pep::AuthorizationGate::new(&auth_config)?;
//! ```

use crate::oidc::types::AuthConfig;
use crate::{PepError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the identity provider domain
pub const ENV_ISSUER_DOMAIN: &str = "AUTH0_DOMAIN";
/// Environment variable naming the API identifier (audience)
pub const ENV_API_AUDIENCE: &str = "API_AUDIENCE";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PepConfig {
    /// Token verification section
    #[serde(default)]
    pub auth: Option<AuthSection>,
}

impl PepConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_config(path)
    }

    /// Get the token verification section
    pub fn auth_config(&self) -> Result<AuthSection> {
        self.auth.clone().ok_or_else(|| {
            PepError::Config("auth configuration not found in config file".to_string())
        })
    }
}

/// Token verification settings as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    /// Identity provider domain (e.g., "tenant.us.auth0.com")
    pub issuer_domain: String,

    /// API identifier expected in the `aud` claim
    pub api_audience: String,

    /// Override for the key set location
    #[serde(default)]
    pub jwks_url: Option<String>,

    /// Seconds a fetched key set stays trusted (0 disables caching)
    #[serde(default)]
    pub jwks_cache_ttl_secs: Option<u64>,

    /// Minimum seconds between refetches caused by unknown key IDs
    #[serde(default)]
    pub jwks_min_refresh_secs: Option<u64>,

    /// Seconds before a key set fetch is abandoned
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,

    /// Clock skew tolerated on `exp`, in seconds
    #[serde(default)]
    pub leeway_secs: Option<u64>,
}

impl AuthSection {
    /// Convert to the runtime configuration, applying defaults
    pub fn to_auth_config(&self) -> AuthConfig {
        let mut config = AuthConfig::new(&self.issuer_domain, &self.api_audience);
        if let Some(url) = &self.jwks_url {
            config = config.with_jwks_url(url.clone());
        }
        if let Some(secs) = self.jwks_cache_ttl_secs {
            config = config.with_cache_ttl(Duration::from_secs(secs));
        }
        if let Some(secs) = self.jwks_min_refresh_secs {
            config = config.with_min_refresh_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = self.fetch_timeout_secs {
            config = config.with_fetch_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.leeway_secs {
            config = config.with_leeway(Duration::from_secs(secs));
        }
        config
    }

    /// Read the provider domain and audience from `AUTH0_DOMAIN` and `API_AUDIENCE`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| PepError::Config(format!("{} is not set", name)))
        };

        Ok(Self {
            issuer_domain: required(ENV_ISSUER_DOMAIN)?,
            api_audience: required(ENV_API_AUDIENCE)?,
            jwks_url: None,
            jwks_cache_ttl_secs: None,
            jwks_min_refresh_secs: None,
            fetch_timeout_secs: None,
            leeway_secs: None,
        })
    }
}

impl AuthConfig {
    /// Runtime configuration from `AUTH0_DOMAIN` and `API_AUDIENCE`
    pub fn from_env() -> Result<Self> {
        AuthSection::from_env().map(|section| section.to_auth_config())
    }
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Example
///
/// ```rust,ignore
/// let config = gnss_pep::config::load_config("config.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PepConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| PepError::Config(format!("Failed to read config file: {}", e)))?;

    toml::from_str(&content)
        .map_err(|e| PepError::Config(format!("Failed to parse TOML config: {}", e)))
}
