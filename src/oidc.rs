//! Identity provider key sets and token verification
//!
//! This module fetches the provider's published signing keys and verifies
//! bearer tokens against them.

pub mod key_set;
pub mod types;
pub mod verifier;

pub use key_set::*;
pub use types::*;
pub use verifier::*;
