//! Withdrawal requests against an allocation and their back-office review.

use api_types::withdrawal::{
    Withdrawal, WithdrawalListQuery, WithdrawalOverview, WithdrawalRequest,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{Kobo, RequestWithdrawalCmd, ShareRole, WithdrawalStatus};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
    views,
};

pub async fn overview(
    Extension(auth): Extension<AuthUser>,
    Extension(share_role): Extension<ShareRole>,
    State(state): State<ServerState>,
) -> Result<Json<WithdrawalOverview>, ServerError> {
    let overview = state
        .engine
        .withdrawal_overview(auth.id(), share_role, Utc::now())
        .await?;
    Ok(Json(views::withdrawal_overview(overview)))
}

pub async fn request(
    Extension(auth): Extension<AuthUser>,
    Extension(share_role): Extension<ShareRole>,
    State(state): State<ServerState>,
    Json(payload): Json<WithdrawalRequest>,
) -> Result<(StatusCode, Json<Withdrawal>), ServerError> {
    let amount = Kobo::from_naira(payload.amount)?;
    let withdrawal = state
        .engine
        .request_withdrawal(RequestWithdrawalCmd::new(
            auth.id(),
            share_role,
            amount,
            payload.reason,
            Utc::now(),
        ))
        .await?;
    if let Some(actor) = auth.impersonated_by {
        tracing::info!(%actor, withdrawal_id = %withdrawal.id, "withdrawal requested while impersonating");
    }
    Ok((StatusCode::CREATED, Json(views::withdrawal(withdrawal))))
}

pub async fn list(
    Extension(auth): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<WithdrawalListQuery>,
) -> Result<Json<Vec<Withdrawal>>, ServerError> {
    let status = query
        .status
        .as_deref()
        .map(|status| WithdrawalStatus::try_from(status.trim().to_ascii_uppercase().as_str()))
        .transpose()?;
    let withdrawals = state.engine.list_withdrawals(auth.id(), status).await?;
    Ok(Json(withdrawals.into_iter().map(views::withdrawal).collect()))
}

pub async fn approve(
    Extension(auth): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(withdrawal_id): Path<Uuid>,
) -> Result<Json<Withdrawal>, ServerError> {
    let withdrawal = state
        .engine
        .approve_withdrawal(auth.id(), withdrawal_id, Utc::now())
        .await?;
    Ok(Json(views::withdrawal(withdrawal)))
}

pub async fn reject(
    Extension(auth): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(withdrawal_id): Path<Uuid>,
) -> Result<Json<Withdrawal>, ServerError> {
    let withdrawal = state
        .engine
        .reject_withdrawal(auth.id(), withdrawal_id, Utc::now())
        .await?;
    Ok(Json(views::withdrawal(withdrawal)))
}
