//! # GNSS PEP - Policy Enforcement Point
//!
//! Bearer token verification and permission checks for the GNSS API.
//!
//! Tokens are issued by an external OAuth2/OIDC provider. Each request is
//! authorized by:
//!
//! 1. extracting the `Bearer` token from the `Authorization` header,
//! 2. resolving the token's `kid` against the provider's published key set,
//! 3. verifying the RS256 signature and the `exp`, `aud` and `iss` claims,
//! 4. requiring a permission string in the token's `permissions` claim.
//!
//! [`AuthorizationGate`] runs the chain; [`RequirePermission`] plugs it into
//! an Axum router, and [`axum_integration::Payload`] hands the verified
//! claims to handlers.

pub mod error;
pub use error::{PepError, Result};

pub mod auth;
pub mod axum_integration;
pub mod config;
pub mod oidc;
pub mod persistence;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types at crate root
pub use crate::auth::{
    check_permissions, AuthorizationError, AuthorizationGate, ErrorCode, RequirePermission,
};
pub use crate::oidc::types::{AuthConfig, DecodedPayload, KeySet, SigningKey};
pub use crate::oidc::{HttpKeySetSource, KeySetResolver, KeySetSource, TokenVerifier};
