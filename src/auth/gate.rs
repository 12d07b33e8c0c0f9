//! The authorization gate: extract → resolve → verify → check permission.

use std::future::Future;
use std::sync::Arc;

use axum::http::HeaderMap;

use super::claims::check_permissions;
use super::error::AuthorizationError;
use super::middleware::RequirePermission;
use crate::axum_integration::extract_bearer_token;
use crate::error::Result;
use crate::oidc::key_set::{KeySetResolver, KeySetSource};
use crate::oidc::types::{AuthConfig, DecodedPayload};
use crate::oidc::verifier::TokenVerifier;

/// Progress of a single authorization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    Start,
    HeaderExtracted,
    KeyResolved,
    SignatureAndClaimsVerified,
    PermissionChecked,
    Authorized,
}

/// Guards protected operations behind a verified token carrying a permission.
///
/// Failures from header extraction, key resolution and the permission check
/// keep their own codes. Every signature or claim failure is reported as the
/// opaque [`AuthorizationError::Unauthorized`]; the underlying cause is only
/// logged.
///
/// Cheap to clone; clones share the key set cache.
#[derive(Clone)]
pub struct AuthorizationGate {
    resolver: Arc<KeySetResolver>,
    verifier: Arc<TokenVerifier>,
}

impl AuthorizationGate {
    /// Gate fetching keys from the provider's HTTPS key set endpoint.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let resolver = KeySetResolver::from_config(config)?;
        Ok(Self::from_parts(resolver, TokenVerifier::new(config)))
    }

    /// Gate fetching keys from a custom source.
    pub fn with_source(config: &AuthConfig, source: Arc<dyn KeySetSource>) -> Self {
        Self::from_parts(
            KeySetResolver::new(config, source),
            TokenVerifier::new(config),
        )
    }

    pub fn from_parts(resolver: KeySetResolver, verifier: TokenVerifier) -> Self {
        Self {
            resolver: Arc::new(resolver),
            verifier: Arc::new(verifier),
        }
    }

    pub fn resolver(&self) -> &KeySetResolver {
        &self.resolver
    }

    /// Run the full chain and return the verified payload.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        permission: &str,
    ) -> std::result::Result<DecodedPayload, AuthorizationError> {
        let mut state = VerificationState::Start;

        let token = extract_bearer_token(headers).map_err(|e| failed(state, e))?;
        state = advance(state, VerificationState::HeaderExtracted);

        let key = self
            .resolver
            .resolve(token)
            .await
            .map_err(|e| failed(state, e))?;
        state = advance(state, VerificationState::KeyResolved);

        let payload = self.verifier.verify(token, &key).map_err(|cause| {
            tracing::warn!(
                kid = %key.key_id,
                code = %cause.code(),
                "Token verification failed: {}",
                cause
            );
            failed(state, AuthorizationError::Unauthorized)
        })?;
        state = advance(state, VerificationState::SignatureAndClaimsVerified);

        check_permissions(permission, &payload).map_err(|e| failed(state, e))?;
        state = advance(state, VerificationState::PermissionChecked);

        state = advance(state, VerificationState::Authorized);
        tracing::debug!(?state, subject = %payload.subject, permission, "Request authorized");
        Ok(payload)
    }

    /// Authorize, then call `operation` once with the payload and return its
    /// output unchanged.
    ///
    /// ```rust,ignore
    /// let signals = gate
    ///     .guard(&headers, "get:signals", |payload| async move {
    ///         list_signals(payload, page).await
    ///     })
    ///     .await?;
    /// ```
    pub async fn guard<F, Fut, R>(
        &self,
        headers: &HeaderMap,
        permission: &str,
        operation: F,
    ) -> std::result::Result<R, AuthorizationError>
    where
        F: FnOnce(DecodedPayload) -> Fut,
        Fut: Future<Output = R>,
    {
        let payload = self.authorize(headers, permission).await?;
        Ok(operation(payload).await)
    }

    /// Tower layer enforcing `permission` on every request.
    pub fn require(&self, permission: impl Into<String>) -> RequirePermission {
        RequirePermission::new(self.clone(), permission)
    }
}

fn advance(from: VerificationState, to: VerificationState) -> VerificationState {
    tracing::trace!(?from, ?to, "authorization state");
    to
}

fn failed(state: VerificationState, err: AuthorizationError) -> AuthorizationError {
    tracing::debug!(stage = ?state, code = %err.code(), "Authorization failed: {}", err);
    err
}
