use tracing::{info, warn};

use crate::auth::error::AuthError;
use crate::auth::jwt::{Claims, JwtKeys};
use crate::auth::password;
use crate::auth::repo::{is_unique_violation, UserStore};
use crate::auth::repo_types::{User, UserUpdate};

/// Successful registration or login: the stored record plus a fresh token.
#[derive(Debug)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Orchestrates the credential operations exposed to the HTTP boundary.
pub struct AuthService<'a> {
    store: &'a UserStore,
    keys: &'a JwtKeys,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a UserStore, keys: &'a JwtKeys) -> Self {
        Self { store, keys }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<AuthSession, AuthError> {
        if self.store.email_exists(email).await? {
            warn!(email, "registration rejected: email taken");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = password::hash(password.to_owned()).await?;

        // The existence check above races with concurrent registrations; the
        // store's unique constraint is the authoritative guard.
        let user = self
            .store
            .create(email, &password_hash, first_name, last_name)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AuthError::DuplicateEmail
                } else {
                    AuthError::from(e)
                }
            })?;

        let token = self.issue_token(user.id, &user.email)?;
        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(AuthSession { user, token })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = match self.store.find_by_email(email).await? {
            Some(u) => u,
            None => {
                warn!("login failed: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let ok = password::verify(password.to_owned(), user.password_hash.clone()).await?;
        if !ok {
            warn!(user_id = user.id, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_token(user.id, &user.email)?;
        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok(AuthSession { user, token })
    }

    /// Re-hash and persist a new password. Outstanding tokens stay valid
    /// until their natural expiry; nothing is re-issued here.
    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let ok = password::verify(old_password.to_owned(), user.password_hash.clone()).await?;
        if !ok {
            warn!(user_id, "password change rejected: wrong old password");
            return Err(AuthError::InvalidOldPassword);
        }

        let password_hash = password::hash(new_password.to_owned()).await?;
        self.store
            .update(
                user.id,
                UserUpdate {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id, "password changed");
        Ok(())
    }

    pub fn issue_token(&self, user_id: i64, email: &str) -> Result<String, AuthError> {
        Ok(self.keys.sign(user_id, email)?)
    }

    /// Decode and validate a bearer token. Every failure mode (signature,
    /// expiry, malformed input) collapses into `InvalidToken`.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.keys.verify(token).map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, EncodingKey};
    use std::time::Duration;

    fn test_keys() -> JwtKeys {
        JwtKeys {
            encoding: EncodingKey::from_secret(b"test-secret"),
            decoding: DecodingKey::from_secret(b"test-secret"),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl: Duration::from_secs(5 * 60),
        }
    }

    async fn test_store() -> UserStore {
        UserStore::in_memory().await.expect("in-memory store")
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let store = test_store().await;
        let keys = test_keys();
        let service = AuthService::new(&store, &keys);

        let session = service
            .register("a@x.com", "Secret123", "A", "B")
            .await
            .expect("register");
        assert!(!session.token.is_empty());

        let stored = store
            .find_by_email("a@x.com")
            .await
            .expect("query")
            .expect("user present");
        assert_ne!(stored.password_hash, "Secret123");
        assert!(password::verify("Secret123".into(), stored.password_hash)
            .await
            .expect("verify"));
    }

    #[tokio::test]
    async fn second_registration_with_same_email_conflicts() {
        let store = test_store().await;
        let keys = test_keys();
        let service = AuthService::new(&store, &keys);

        service
            .register("a@x.com", "Secret123", "A", "B")
            .await
            .expect("first register");
        let err = service
            .register("a@x.com", "Other4567", "C", "D")
            .await
            .expect_err("duplicate must fail");
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let store = test_store().await;
        let keys = test_keys();
        let service = AuthService::new(&store, &keys);

        service
            .register("a@x.com", "Secret123", "A", "B")
            .await
            .expect("register");

        let wrong_password = service
            .login("a@x.com", "WrongPass1")
            .await
            .expect_err("wrong password must fail");
        let unknown_email = service
            .login("ghost@x.com", "Secret123")
            .await
            .expect_err("unknown email must fail");

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn token_roundtrips_through_issue_and_verify() {
        let store = test_store().await;
        let keys = test_keys();
        let service = AuthService::new(&store, &keys);

        let token = service.issue_token(7, "a@x.com").expect("issue");
        let claims = service.verify_token(&token).expect("verify");
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "a@x.com");

        let err = service.verify_token("garbage").expect_err("garbage token");
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn change_password_swaps_which_login_succeeds() {
        let store = test_store().await;
        let keys = test_keys();
        let service = AuthService::new(&store, &keys);

        let session = service
            .register("a@x.com", "Secret123", "A", "B")
            .await
            .expect("register");

        service
            .change_password(session.user.id, "Secret123", "NewSecret456")
            .await
            .expect("change password");

        service
            .login("a@x.com", "NewSecret456")
            .await
            .expect("login with new password");
        let err = service
            .login("a@x.com", "Secret123")
            .await
            .expect_err("old password must stop working");
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn change_password_error_cases() {
        let store = test_store().await;
        let keys = test_keys();
        let service = AuthService::new(&store, &keys);

        let session = service
            .register("a@x.com", "Secret123", "A", "B")
            .await
            .expect("register");

        let err = service
            .change_password(session.user.id, "WrongOld1", "NewSecret456")
            .await
            .expect_err("wrong old password");
        assert!(matches!(err, AuthError::InvalidOldPassword));

        let err = service
            .change_password(9999, "Secret123", "NewSecret456")
            .await
            .expect_err("unknown user id");
        assert!(matches!(err, AuthError::UserNotFound));
    }
}
