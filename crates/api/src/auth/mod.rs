//! Authentication module for Launchkit

pub mod jwt;
pub mod middleware;

pub use jwt::{JwtError, JwtManager, SupabaseClaims};
pub use middleware::{require_auth, AuthUser};
