use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use thiserror::Error;

pub use gateway::{GatewayError, HttpGateway, PaymentGateway, Provider, parse_verification};
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};
pub use tokens::{DelegationClaims, SessionClaims, TokenError, TokenSigner};

mod admin;
mod allocations;
mod auth;
mod gateway;
mod payments;
mod server;
mod tokens;
mod views;
mod withdrawals;

pub mod types {
    pub use api_types::{ErrorResponse, MessageResponse};

    pub mod auth {
        pub use api_types::auth::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest,
        };
        pub use api_types::user::UserView;
    }

    pub mod allocation {
        pub use api_types::allocation::{
            AllocationQuery, AllocationResponse, MonthlyAllocation, RecentAllocation,
        };
    }

    pub mod withdrawal {
        pub use api_types::withdrawal::{
            Withdrawal, WithdrawalListQuery, WithdrawalOverview, WithdrawalRequest,
        };
    }

    pub mod admin {
        pub use api_types::admin::{
            AuditEntry, CreateMemberRequest, ImpersonationRequest, ImpersonationResponse, Setting,
            SettingUpdate,
        };
    }

    pub mod payment {
        pub use api_types::payment::{Payment, StartPaymentRequest, VerifyQuery};
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Engine(EngineError),
    #[error("{0}")]
    Generic(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("payment verification is not configured")]
    GatewayUnavailable,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::InvalidState(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InsufficientFunds(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidInput(_)
        | EngineError::InvalidRole(_)
        | EngineError::InvalidSetting(_)
        | EngineError::MissingScope(_) => StatusCode::BAD_REQUEST,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::ExistingKey(message) => message,
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err),
            ServerError::Forbidden(err) => (StatusCode::FORBIDDEN, err),
            ServerError::Gateway(err) => {
                tracing::warn!("payment gateway failure: {err}");
                (StatusCode::BAD_GATEWAY, "payment verification failed".to_string())
            }
            err @ ServerError::GatewayUnavailable => (StatusCode::BAD_GATEWAY, err.to_string()),
        };

        (status, Json(types::ErrorResponse { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<TokenError> for ServerError {
    fn from(value: TokenError) -> Self {
        Self::Unauthorized(value.to_string())
    }
}
