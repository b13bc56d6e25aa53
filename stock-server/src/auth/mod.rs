//! Authentication
//!
//! - [`JwtService`] - bearer token validation
//! - [`CurrentUser`] - caller identity, extracted per request
//! - [`require_auth`] / [`require_admin`] / [`require_staff`] - route gates

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{require_admin, require_auth, require_staff};
