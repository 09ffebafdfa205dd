//! Login, password reset and the current-user endpoint.

use api_types::{
    MessageResponse,
    auth::{ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest},
    user::UserView,
};
use axum::{Extension, Json, extract::State};
use chrono::Utc;

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
    tokens, views,
};

const RESET_REQUESTED_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent";

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    let user = state
        .engine
        .authenticate(&payload.identifier, &payload.password)
        .await?;
    let expires_at = Utc::now() + state.session_ttl;
    let token = state.tokens.issue_session(user.id, user.role, expires_at)?;
    tracing::info!(user_id = %user.id, role = %user.role, "login");

    Ok(Json(LoginResponse {
        token,
        expires_at: tokens::expiry(expires_at.timestamp()),
        user: views::user(&user),
    }))
}

pub async fn me(Extension(auth): Extension<AuthUser>) -> Json<UserView> {
    Json(views::user(&auth.user))
}

pub async fn forgot_password(
    State(state): State<ServerState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    // Mail delivery is external; the engine logs the issuance.
    state
        .engine
        .request_password_reset(&payload.email, Utc::now())
        .await?;
    Ok(Json(MessageResponse {
        message: RESET_REQUESTED_MESSAGE.to_string(),
    }))
}

pub async fn reset_password(
    State(state): State<ServerState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    state
        .engine
        .reset_password(&payload.token, &payload.password, Utc::now())
        .await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}
