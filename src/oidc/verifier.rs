//! Signature and claim verification for bearer tokens

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde_json::Value;

use super::types::{AuthConfig, DecodedPayload, SigningKey, ALLOWED_ALGORITHMS};
use crate::auth::{AuthorizationError, ErrorCode};

/// Why a token failed verification. Kept internal by the gate; see
/// [`AuthorizationGate`](crate::auth::AuthorizationGate).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("token expired")]
    TokenExpired,

    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    #[error("unparseable token: {0}")]
    UnparseableToken(String),
}

impl VerificationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            VerificationError::TokenExpired => ErrorCode::TokenExpired,
            VerificationError::InvalidClaims(_) => ErrorCode::InvalidClaims,
            VerificationError::UnparseableToken(_) => ErrorCode::UnparseableToken,
        }
    }
}

impl From<VerificationError> for AuthorizationError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::TokenExpired => AuthorizationError::TokenExpired,
            VerificationError::InvalidClaims(_) => AuthorizationError::InvalidClaims,
            VerificationError::UnparseableToken(_) => AuthorizationError::UnparseableToken,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => VerificationError::TokenExpired,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => VerificationError::InvalidClaims(err.to_string()),
            _ => VerificationError::UnparseableToken(err.to_string()),
        }
    }
}

/// Verifies RS256 signatures and the `exp`, `aud` and `iss` claims
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(ALLOWED_ALGORITHMS[0]);
        validation.algorithms = ALLOWED_ALGORITHMS.to_vec();
        validation.leeway = config.leeway.as_secs();
        validation.validate_exp = true;
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_issuer(&[config.issuer()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        Self { validation }
    }

    /// Verify `token` against `key` and return its claims.
    pub fn verify(&self, token: &str, key: &SigningKey) -> Result<DecodedPayload, VerificationError> {
        if key.key_type != "RSA" {
            return Err(VerificationError::UnparseableToken(format!(
                "key {} has unsupported type {}",
                key.key_id, key.key_type
            )));
        }

        let decoding_key = DecodingKey::from_rsa_components(&key.modulus, &key.exponent)
            .map_err(|e| VerificationError::UnparseableToken(format!("invalid RSA key {}: {}", key.key_id, e)))?;

        let token_data = decode::<Value>(token, &decoding_key, &self.validation)?;

        serde_json::from_value(token_data.claims)
            .map_err(|e| VerificationError::InvalidClaims(format!("malformed claim set: {}", e)))
    }
}
