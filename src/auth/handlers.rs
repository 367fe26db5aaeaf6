use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::auth::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, MeResponse, MessageResponse,
    RegisterRequest,
};
use crate::auth::error::{AuthError, FieldError};
use crate::auth::extractors::AuthUser;
use crate::auth::jwt::JwtKeys;
use crate::auth::service::AuthService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}

/// Unwrap a JSON body, turning any deserialization failure into a 400 with
/// field detail instead of axum's default rejection.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            warn!(error = %rejection, "malformed request body");
            Err(AuthError::Validation(vec![FieldError {
                field: "body",
                message: rejection.body_text(),
            }]))
        }
    }
}

#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let payload = json_body(payload)?;
    payload.validate()?;

    let keys = JwtKeys::from_ref(&state);
    let service = AuthService::new(&state.users, &keys);
    let session = service
        .register(
            &payload.email,
            &payload.password,
            &payload.first_name,
            &payload.last_name,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(session.into())))
}

#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthError> {
    let payload = json_body(payload)?;
    payload.validate()?;

    let keys = JwtKeys::from_ref(&state);
    let service = AuthService::new(&state.users, &keys);
    let session = service.login(&payload.email, &payload.password).await?;

    Ok(Json(session.into()))
}

/// Answers from the verified token's claims; no store lookup.
#[instrument(skip_all)]
async fn me(AuthUser(claims): AuthUser) -> Json<MeResponse> {
    Json(claims.into())
}

#[instrument(skip_all)]
async fn change_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AuthError> {
    let payload = json_body(payload)?;
    payload.validate()?;

    let keys = JwtKeys::from_ref(&state);
    let service = AuthService::new(&state.users, &keys);
    service
        .change_password(claims.sub, &payload.old_password, &payload.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "password updated".into(),
    }))
}
