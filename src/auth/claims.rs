use crate::oidc::types::DecodedPayload;

use super::error::AuthorizationError;

/// Permission and scope helpers for verified payloads
impl DecodedPayload {
    /// Check if the payload grants a specific permission (exact match)
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|granted| granted.contains(permission))
    }

    /// Check if the payload grants all of the provided permissions
    pub fn has_all_permissions(&self, permissions: &[&str]) -> bool {
        permissions.iter().all(|&p| self.has_permission(p))
    }

    /// Get all granted permissions (empty if the claim is absent)
    pub fn permissions(&self) -> Vec<String> {
        self.permissions
            .as_ref()
            .map(|granted| granted.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if the space-separated `scope` claim contains `scope`
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope
            .as_deref()
            .is_some_and(|scopes| scopes.split(' ').any(|s| s == scope))
    }

    /// Get all scopes (empty if the claim is absent)
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|scopes| {
                scopes
                    .split(' ')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Require `permission` in the payload's permission set.
///
/// A payload without any permissions claim is a malformed token
/// (`PermissionsClaimMissing`); one whose claim lacks the permission is a
/// valid token without the grant (`PermissionDenied`).
pub fn check_permissions(
    permission: &str,
    payload: &DecodedPayload,
) -> Result<(), AuthorizationError> {
    let granted = payload
        .permissions
        .as_ref()
        .ok_or(AuthorizationError::PermissionsClaimMissing)?;

    if !granted.contains(permission) {
        return Err(AuthorizationError::PermissionDenied(permission.to_string()));
    }

    Ok(())
}
