//! Axum integration for the GNSS policy enforcement point
//!
//! This module provides utilities for integrating the gate with the Axum web framework:
//! - Bearer token extraction from request headers
//! - `FromRequestParts` extractor for the verified [`DecodedPayload`]
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{routing::get, Router};
//! use gnss_pep::axum_integration::Payload;
//!
//! async fn list_signals(payload: Payload) -> String {
//!     format!("Hello, {}!", payload.subject)
//! }
//!
//! let app = Router::new()
//!     .route("/gnss-signals", get(list_signals))
//!     .layer(gate.require("get:signals"));
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::ops::Deref;

use crate::auth::AuthorizationError;
use crate::oidc::types::DecodedPayload;

/// Extract the bearer token from the `Authorization` header
///
/// The header must be exactly `<scheme> <token>` with a case-insensitive
/// `Bearer` scheme. The token is returned unmodified.
///
/// # Example
///
/// ```rust,ignore
/// use axum::http::HeaderMap;
/// use gnss_pep::axum_integration::extract_bearer_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("Authorization", "Bearer my-token".parse().unwrap());
///
/// assert_eq!(extract_bearer_token(&headers), Ok("my-token"));
/// ```
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthorizationError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthorizationError::MissingHeader)?;

    let value = value
        .to_str()
        .map_err(|_| AuthorizationError::MalformedHeader(AuthorizationError::HEADER_MALFORMED))?;

    let mut parts = value.split_whitespace();
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthorizationError::MalformedHeader(
            AuthorizationError::HEADER_MALFORMED,
        ));
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthorizationError::NotBearerScheme);
    }

    Ok(token)
}

/// Axum extractor for the verified token payload
///
/// The payload is inserted into request extensions by
/// [`RequirePermission`](crate::auth::RequirePermission); a route without
/// that layer rejects with `Unauthorized`.
#[derive(Debug, Clone)]
pub struct Payload(pub DecodedPayload);

impl Deref for Payload {
    type Target = DecodedPayload;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DecodedPayload> for Payload {
    fn from(payload: DecodedPayload) -> Self {
        Self(payload)
    }
}

impl Payload {
    pub fn into_inner(self) -> DecodedPayload {
        self.0
    }
}

impl<S> FromRequestParts<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = AuthorizationError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<DecodedPayload>()
            .cloned()
            .map(Payload)
            .ok_or(AuthorizationError::Unauthorized)
    }
}
