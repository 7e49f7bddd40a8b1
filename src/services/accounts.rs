//! Account registration, login and session tokens

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, password::MIN_PASSWORD_LEN, verify_password, Claims, JwtValidator, TokenInput};
use crate::db::schemas::UserDoc;
use crate::services::views::UserResponse;
use crate::store::HabitStore;
use crate::types::{HabitError, Result};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    /// Unix timestamp
    pub expires_at: i64,
    pub user: UserResponse,
}

/// Accounts and session tokens
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn HabitStore>,
    jwt: JwtValidator,
}

impl AccountService {
    pub fn new(store: Arc<dyn HabitStore>, jwt: JwtValidator) -> Self {
        Self { store, jwt }
    }

    pub fn jwt(&self) -> &JwtValidator {
        &self.jwt
    }

    /// Create an account. The password is stored as an Argon2 hash.
    pub async fn register(&self, req: RegisterRequest) -> Result<UserResponse> {
        let name = req.name.trim();
        let email = req.email.trim().to_lowercase();

        if name.is_empty() {
            return Err(HabitError::BadRequest("name is required".into()));
        }
        if email.is_empty() {
            return Err(HabitError::BadRequest("email is required".into()));
        }
        if req.password.len() < MIN_PASSWORD_LEN {
            return Err(HabitError::BadRequest(format!(
                "password is required and should be at least {} characters long",
                MIN_PASSWORD_LEN
            )));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(HabitError::Conflict("email is taken already".into()));
        }

        let password_hash = hash_password(&req.password)?;
        let user = self
            .store
            .insert_user(UserDoc::new(name.to_string(), email, password_hash))
            .await?;

        info!(user_id = %user.id_hex(), email = %user.email, "Account registered");
        Ok(UserResponse::from(&user))
    }

    /// Verify credentials and issue a session token
    pub async fn login(&self, req: LoginRequest) -> Result<Session> {
        let email = req.email.trim().to_lowercase();

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            warn!(email = %email, "Login failed - user not found");
            return Err(HabitError::Unauthorized("Invalid credentials".into()));
        };

        if !verify_password(&req.password, &user.password_hash)? {
            warn!(email = %email, "Login failed - invalid password");
            return Err(HabitError::Unauthorized("Invalid credentials".into()));
        }

        let issued = self.jwt.issue(TokenInput {
            user_id: user.id_hex(),
            email: user.email.clone(),
            name: user.name.clone(),
        })?;

        info!(user_id = %user.id_hex(), "Login successful");

        Ok(Session {
            token: issued.token,
            expires_at: issued.expires_at,
            user: UserResponse::from(&user),
        })
    }

    /// Claims of a valid session token
    pub fn authenticate(&self, token: &str) -> Result<Claims> {
        self.jwt.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> AccountService {
        AccountService::new(Arc::new(MemoryStore::new()), JwtValidator::new_dev(3600))
    }

    fn register(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let accounts = service();
        let user = accounts
            .register(register("Ada", "Ada@Example.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");

        let session = accounts
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.id, user.id);

        let claims = accounts.authenticate(&session.token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.exp, session.expires_at);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let accounts = service();

        let err = accounts.register(register("", "a@b.c", "secret1")).await.unwrap_err();
        assert!(matches!(err, HabitError::BadRequest(ref m) if m.contains("name")));

        let err = accounts.register(register("Ada", "a@b.c", "short")).await.unwrap_err();
        assert!(matches!(err, HabitError::BadRequest(ref m) if m.contains("6 characters")));

        accounts.register(register("Ada", "a@b.c", "secret1")).await.unwrap();
        let err = accounts.register(register("Bob", "a@b.c", "secret2")).await.unwrap_err();
        assert!(matches!(err, HabitError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_failures_are_unauthorized() {
        let accounts = service();
        accounts.register(register("Ada", "a@b.c", "secret1")).await.unwrap();

        for (email, password) in [("a@b.c", "wrong-pw"), ("nobody@b.c", "secret1")] {
            let err = accounts
                .login(LoginRequest {
                    email: email.into(),
                    password: password.into(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, HabitError::Unauthorized(_)));
        }
    }
}
