use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::error::{AuthError, FieldError};
use crate::auth::jwt::Claims;
use crate::auth::repo_types::User;
use crate::auth::service::AuthSession;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.email) {
            errors.push(FieldError {
                field: "email",
                message: "must be a valid email address".into(),
            });
        }
        if self.password.len() < 8 {
            errors.push(FieldError {
                field: "password",
                message: "must be at least 8 characters".into(),
            });
        }
        if self.first_name.trim().is_empty() {
            errors.push(FieldError {
                field: "firstName",
                message: "must not be empty".into(),
            });
        }
        if self.last_name.trim().is_empty() {
            errors.push(FieldError {
                field: "lastName",
                message: "must not be empty".into(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(errors))
        }
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.email) {
            errors.push(FieldError {
                field: "email",
                message: "must be a valid email address".into(),
            });
        }
        if self.password.is_empty() {
            errors.push(FieldError {
                field: "password",
                message: "must not be empty".into(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(errors))
        }
    }
}

/// Request body for password change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut errors = Vec::new();
        if self.old_password.is_empty() {
            errors.push(FieldError {
                field: "oldPassword",
                message: "must not be empty".into(),
            });
        }
        if self.new_password.len() < 8 {
            errors.push(FieldError {
                field: "newPassword",
                message: "must be at least 8 characters".into(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(errors))
        }
    }
}

/// Public part of the user returned to the client. Never carries password
/// material.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user.into(),
            token: session.token,
        }
    }
}

/// `GET /me` echoes the verified token's claims; no store lookup.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: SessionUser,
}

impl From<Claims> for MeResponse {
    fn from(claims: Claims) -> Self {
        Self {
            user: SessionUser {
                id: claims.sub,
                email: claims.email,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
