//! JWT session tokens
//!
//! Login issues an HS256 token carrying the account id, email and name. The
//! token travels back either in the `Authorization: Bearer` header or in the
//! `token` cookie set by `/login`.

use chrono::Utc;
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::types::HabitError;

/// Cookie name used for browser sessions
pub const TOKEN_COOKIE: &str = "token";

/// Minimum accepted signing secret length
pub const MIN_SECRET_LEN: usize = 32;

const DEV_SECRET: &str = "habitracked-dev-only-signing-secret-0000";

/// Session claims; `/profile` returns these as-is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (ObjectId hex)
    pub sub: String,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Who a token is being issued for
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Unix timestamp
    pub expires_at: i64,
}

/// Signs and checks session tokens with one shared secret
#[derive(Clone)]
pub struct JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, HabitError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(HabitError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self::from_secret(secret.as_bytes(), expiry_seconds))
    }

    /// Fixed, publicly known secret. Dev mode only.
    pub fn new_dev(expiry_seconds: u64) -> Self {
        Self::from_secret(DEV_SECRET.as_bytes(), expiry_seconds)
    }

    fn from_secret(secret: &[u8], expiry_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            expiry_seconds,
        }
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    pub fn issue(&self, input: TokenInput) -> Result<IssuedToken, HabitError> {
        let iat = Utc::now().timestamp();
        let exp = iat.saturating_add(i64::try_from(self.expiry_seconds).unwrap_or(i64::MAX));
        let claims = Claims {
            sub: input.user_id,
            email: input.email,
            name: input.name,
            iat,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| HabitError::Auth(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
        })
    }

    /// Check signature and expiry. Every failure is `Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Claims, HabitError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|err| {
                let reason = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Invalid token",
                };
                HabitError::Unauthorized(reason.into())
            })
    }
}

/// Token from an `Authorization` header value, `Bearer <token>` or bare
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let value = auth_header?.trim_start();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None => value.trim(),
    };
    (!token.is_empty()).then_some(token)
}

/// Session token from a `Cookie` header
pub fn extract_token_from_cookie(cookie_header: Option<&str>) -> Option<&str> {
    cookie_header?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
