//! Authentication for Leadhub
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//!
//! The lead lifecycle logic never sees credentials; it receives the
//! resolved caller id from this layer.

pub mod jwt;
pub mod password;

pub use jwt::{extract_token_from_header, Caller, Claims, JwtValidator};
pub use password::{hash_password, verify_password};
