//! Authentication
//!
//! The auth provider issues HS256 bearer tokens signed with the shared
//! secret. This side only validates them:
//! - [`JwtService`] - token validation (and issuing, for tests and tooling)
//! - [`require_auth`] - resolves the session on non-public API routes
//! - [`require_admin`] - staff-only route guard
//!
//! The role is never taken from the token. It is looked up in `profiles`
//! on every request, so a role change applies to the very next call.

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
pub use middleware::{CurrentUserExt, is_public_route, require_admin, require_auth};
pub use shared::models::CurrentUser;
