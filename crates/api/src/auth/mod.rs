//! Authentication primitives.
//!
//! - [`jwt`] -- operator token verification. Tokens are issued by the
//!   identity service; this server never mints them.

pub mod jwt;
