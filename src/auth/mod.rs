//! Authentication for Habitracked
//!
//! Provides:
//! - JWT session token generation and validation
//! - Password hashing with Argon2

pub mod jwt;
pub mod password;

pub use jwt::{
    extract_token_from_cookie, extract_token_from_header, Claims, IssuedToken, JwtValidator,
    TokenInput, TOKEN_COOKIE,
};
pub use password::{hash_password, verify_password};
