//! Authorization gate, permission checks and middleware
//!
//! This module composes the verification chain and exposes it to Axum
//! applications.
//!
//! # Features
//!
//! - [`AuthorizationGate`] running header extraction, key resolution,
//!   signature/claim verification and the permission check in order
//! - [`check_permissions`] and `DecodedPayload` permission helpers for RBAC
//! - [`RequirePermission`] middleware layer for routers
//! - [`AuthorizationError`] rendering the JSON error envelope
//!
//! # Example
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use gnss_pep::{AuthConfig, AuthorizationGate};
//!
//! let gate = AuthorizationGate::new(&AuthConfig::new("tenant.us.auth0.com", "gnss"))?;
//!
//! let app = Router::new()
//!     .route("/gnss-signals", get(list_signals))
//!     .layer(gate.require("get:signals"));
//! ```

pub mod claims;
pub mod error;
pub mod gate;
pub mod middleware;

pub use claims::check_permissions;
pub use error::{AuthorizationError, ErrorCode};
pub use gate::{AuthorizationGate, VerificationState};
pub use middleware::{RequirePermission, RequirePermissionMiddleware};
