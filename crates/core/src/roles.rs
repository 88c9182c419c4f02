//! Well-known role name constants.
//!
//! Tokens are minted by the identity service; only `admin` may reach the
//! management routes.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";
