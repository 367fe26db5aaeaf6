use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

/// Field-level detail attached to validation failures.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid request")]
    Validation(Vec<FieldError>),
    #[error("email already registered")]
    DuplicateEmail,
    /// Covers both unknown email and wrong password; the two must stay
    /// indistinguishable to the client.
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("old password is incorrect")]
    InvalidOldPassword,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("authentication required")]
    Unauthenticated,
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorBody {
    fn message(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            details: None,
        }
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::InvalidOldPassword
            // Not 404: change-password must not reveal whether an id resolves.
            | AuthError::UserNotFound => StatusCode::BAD_REQUEST,
            AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InvalidToken => StatusCode::FORBIDDEN,
            AuthError::Database(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AuthError::Validation(details) => ErrorBody {
                error: "invalid request".into(),
                details: Some(details),
            },
            AuthError::Database(e) => {
                error!(error = %e, "database error");
                ErrorBody::message("internal server error")
            }
            AuthError::Internal(e) => {
                error!(error = %e, "internal error");
                ErrorBody::message("internal server error")
            }
            other => ErrorBody::message(other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            AuthError::Validation(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::DuplicateEmail.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidOldPassword.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::UserNotFound.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::InvalidToken.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_the_cause() {
        let res = AuthError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn validation_errors_carry_field_detail() {
        let res = AuthError::Validation(vec![FieldError {
            field: "email",
            message: "must be a valid email address".into(),
        }])
        .into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["details"][0]["field"], "email");
    }
}
