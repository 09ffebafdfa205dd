use api_types::payment::{Payment, StartPaymentRequest, VerifyQuery};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use engine::{Kobo, RegistrationKind};

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
    views,
};

/// Open a pending registration fee for the caller.
pub async fn start(
    Extension(auth): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<StartPaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ServerError> {
    let kind = RegistrationKind::try_from(payload.kind.trim().to_ascii_lowercase().as_str())?;
    let amount = Kobo::from_naira(payload.amount)?;
    let tx = state
        .engine
        .start_registration_payment(auth.id(), kind, amount)
        .await?;
    Ok((StatusCode::CREATED, Json(views::payment(tx))))
}

/// Ask the provider about `reference` and settle the matching transaction.
pub async fn verify(
    State(state): State<ServerState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<Payment>, ServerError> {
    let reference = query.reference.trim();
    if reference.is_empty() {
        return Err(ServerError::Generic("reference is required".to_string()));
    }
    // Unknown references are rejected before calling the provider.
    state.engine.transaction_by_reference(reference).await?;

    let gateway = state
        .gateway
        .as_ref()
        .ok_or(ServerError::GatewayUnavailable)?;
    let verification = gateway.verify(reference).await?;
    if verification.reference != reference {
        return Err(ServerError::Generic(
            "provider answered for a different reference".to_string(),
        ));
    }
    let tx = state.engine.settle_payment(&verification).await?;
    Ok(Json(views::payment(tx)))
}
