use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::error_response;

/// Stable identifier for each way authorization can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingHeader,
    MalformedHeader,
    NotBearerScheme,
    KeyNotFound,
    KeySetUnavailable,
    UnparseableToken,
    TokenExpired,
    InvalidClaims,
    Unauthorized,
    PermissionsClaimMissing,
    PermissionDenied,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingHeader => "missing_header",
            ErrorCode::MalformedHeader => "malformed_header",
            ErrorCode::NotBearerScheme => "not_bearer_scheme",
            ErrorCode::KeyNotFound => "key_not_found",
            ErrorCode::KeySetUnavailable => "key_set_unavailable",
            ErrorCode::UnparseableToken => "unparseable_token",
            ErrorCode::TokenExpired => "token_expired",
            ErrorCode::InvalidClaims => "invalid_claims",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::PermissionsClaimMissing => "permissions_claim_missing",
            ErrorCode::PermissionDenied => "permission_denied",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal authorization failure; the `Display` text is the public description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// No `Authorization` header on the request
    #[error("Authorization missing in header.")]
    MissingHeader,

    /// Header is not `<scheme> <token>`, or the token header carries no key id
    #[error("{0}")]
    MalformedHeader(&'static str),

    /// Scheme is something other than `Bearer`
    #[error("Bearer type missing.")]
    NotBearerScheme,

    /// No published key matches the token's key id
    #[error("Unable to find the appropriate key.")]
    KeyNotFound,

    /// The provider's key set could not be fetched or parsed
    #[error("Unable to fetch signing keys.")]
    KeySetUnavailable,

    /// Token could not be decoded or its signature did not verify
    #[error("Unable to parse authentication token.")]
    UnparseableToken,

    #[error("Token expired.")]
    TokenExpired,

    /// Audience, issuer or another required claim is wrong
    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,

    /// Opaque failure returned for any verification-stage error
    #[error("Unauthorized.")]
    Unauthorized,

    /// Token carries no permissions claim at all
    #[error("Permissions not in decoded JWT.")]
    PermissionsClaimMissing,

    /// Permissions claim present but lacks the required permission
    #[error("Permission: {0} not in decoded JWT.")]
    PermissionDenied(String),
}

impl AuthorizationError {
    /// Description used when the header does not split into scheme and token.
    pub const HEADER_MALFORMED: &'static str = "Header malformed.";
    /// Description used when the token header has no key id.
    pub const KID_MISSING: &'static str = "Authorization malformed.";

    pub fn code(&self) -> ErrorCode {
        match self {
            AuthorizationError::MissingHeader => ErrorCode::MissingHeader,
            AuthorizationError::MalformedHeader(_) => ErrorCode::MalformedHeader,
            AuthorizationError::NotBearerScheme => ErrorCode::NotBearerScheme,
            AuthorizationError::KeyNotFound => ErrorCode::KeyNotFound,
            AuthorizationError::KeySetUnavailable => ErrorCode::KeySetUnavailable,
            AuthorizationError::UnparseableToken => ErrorCode::UnparseableToken,
            AuthorizationError::TokenExpired => ErrorCode::TokenExpired,
            AuthorizationError::InvalidClaims => ErrorCode::InvalidClaims,
            AuthorizationError::Unauthorized => ErrorCode::Unauthorized,
            AuthorizationError::PermissionsClaimMissing => ErrorCode::PermissionsClaimMissing,
            AuthorizationError::PermissionDenied(_) => ErrorCode::PermissionDenied,
        }
    }

    /// Public message; owned because `PermissionDenied` interpolates the permission.
    pub fn description(&self) -> String {
        self.to_string()
    }

    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::KeyNotFound
            | ErrorCode::UnparseableToken
            | ErrorCode::PermissionsClaimMissing => StatusCode::BAD_REQUEST,
            ErrorCode::KeySetUnavailable => StatusCode::BAD_GATEWAY,
            ErrorCode::MissingHeader
            | ErrorCode::MalformedHeader
            | ErrorCode::NotBearerScheme
            | ErrorCode::TokenExpired
            | ErrorCode::InvalidClaims
            | ErrorCode::Unauthorized
            | ErrorCode::PermissionDenied => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthorizationError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), &self.description())
    }
}
