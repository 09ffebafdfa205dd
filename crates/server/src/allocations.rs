use api_types::allocation::{AllocationQuery, AllocationResponse};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::Utc;
use engine::{AllocationScope, ShareRole};

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
    views,
};

/// Allocation of the caller's own scope for the share role of the route.
pub async fn own(
    Extension(auth): Extension<AuthUser>,
    Extension(share_role): Extension<ShareRole>,
    State(state): State<ServerState>,
) -> Result<Json<AllocationResponse>, ServerError> {
    let summary = state
        .engine
        .allocation_summary_for_user(auth.id(), share_role, Utc::now())
        .await?;
    Ok(Json(views::allocation(summary)))
}

/// Back-office view of any scope.
pub async fn for_scope(
    Extension(auth): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<AllocationQuery>,
) -> Result<Json<AllocationResponse>, ServerError> {
    if !auth.user.role.is_back_office() {
        return Err(ServerError::Forbidden(
            "only back-office roles can inspect other scopes".to_string(),
        ));
    }
    let share_role = ShareRole::try_from(query.share_role.as_str())?;
    let scope = match share_role {
        ShareRole::Cooperative | ShareRole::Leader => AllocationScope::Cooperative(query.scope_id),
        ShareRole::ParentOrganization => AllocationScope::ParentOrganization(query.scope_id),
    };
    let summary = state
        .engine
        .allocation_summary(share_role, scope, Utc::now())
        .await?;
    Ok(Json(views::allocation(summary)))
}
