//! JWT authentication with role-based access control.
//!
//! Access tokens arrive as `Authorization: Bearer` headers and are verified
//! statelessly. Refresh tokens live in an HttpOnly cookie (or a bearer
//! header at the refresh endpoint). Route protection is an extractor:
//! `Auth` for any authenticated caller, `Auth<AdminOnly>` for admins.

mod cookie;
mod errors;
mod extractors;
mod state;

pub use cookie::{
    REFRESH_COOKIE_NAME, bearer_token, clear_refresh_cookie, get_cookie, refresh_cookie,
};
pub use errors::AuthRejection;
pub use extractors::{AdminOnly, AnyRole, Auth, RoleConstraint};
pub use state::HasAuthState;
