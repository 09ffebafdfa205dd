//! Back-office endpoints: member creation, impersonation, settings and audit.

use api_types::{
    admin::{
        AuditEntry, CreateMemberRequest, ImpersonationRequest, ImpersonationResponse, Setting,
        SettingUpdate,
    },
    user::UserView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{RegisterUserCmd, Role};
use serde::Deserialize;

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
    tokens, views,
};

const DEFAULT_AUDIT_LIMIT: u64 = 50;
const MAX_AUDIT_LIMIT: u64 = 500;

pub async fn create_member(
    Extension(auth): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let mut cmd = RegisterUserCmd::new(payload.name, payload.email, payload.password, Role::Member);
    cmd.phone = payload.phone;
    cmd.nin = payload.nin;
    cmd.cooperative_id = payload.cooperative_id;

    let member = state.engine.create_member(auth.id(), cmd).await?;
    Ok((StatusCode::CREATED, Json(views::user(&member))))
}

/// Start acting as another user. The bearer session must be the super
/// admin's own: impersonation cannot be chained.
pub async fn impersonate(
    Extension(auth): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<ImpersonationRequest>,
) -> Result<Json<ImpersonationResponse>, ServerError> {
    if auth.impersonated_by.is_some() {
        return Err(ServerError::Forbidden(
            "cannot start impersonation while impersonating".to_string(),
        ));
    }
    let now = Utc::now();
    let target = state
        .engine
        .start_impersonation(auth.id(), payload.user_id, now)
        .await?;
    let expires_at = now + state.impersonation_ttl;
    let token = state
        .tokens
        .issue_delegation(auth.id(), target.id, target.role, expires_at)?;

    Ok(Json(ImpersonationResponse {
        token,
        expires_at: tokens::expiry(expires_at.timestamp()),
        user: views::user(&target),
    }))
}

pub async fn list_settings(
    Extension(auth): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<Setting>>, ServerError> {
    if !auth.user.role.is_back_office() {
        return Err(ServerError::Forbidden(
            "only back-office roles can read settings".to_string(),
        ));
    }
    let settings = state.engine.list_settings().await?;
    Ok(Json(settings.into_iter().map(views::setting).collect()))
}

pub async fn update_setting(
    Extension(auth): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(key): Path<String>,
    Json(payload): Json<SettingUpdate>,
) -> Result<Json<Setting>, ServerError> {
    let setting = state
        .engine
        .update_setting(auth.id(), &key, &payload.value, Utc::now())
        .await?;
    Ok(Json(views::setting(setting)))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    limit: Option<u64>,
}

pub async fn audit(
    Extension(auth): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, ServerError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    let entries = state.engine.audit_entries(auth.id(), limit).await?;
    Ok(Json(entries.into_iter().map(views::audit_entry).collect()))
}
