use axum::{
    Extension, Router,
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, Error as AxumError, Header, authorization::Bearer},
};
use chrono::{Duration, Utc};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use std::sync::Arc;

use crate::{
    ServerError, admin, allocations, auth, gateway::PaymentGateway, payments, tokens::TokenSigner,
    withdrawals,
};
use engine::{Engine, EngineError, ShareRole, User};

static IMPERSONATION_HEADER: HeaderName = HeaderName::from_static("x-impersonation-token");
static LEGACY_IMPERSONATION_HEADER: HeaderName = HeaderName::from_static("x-impersonation-data");

const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
const DEFAULT_IMPERSONATION_TTL_MINUTES: i64 = 30;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub tokens: Arc<TokenSigner>,
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub session_ttl: Duration,
    pub impersonation_ttl: Duration,
}

impl ServerState {
    pub fn new(engine: Engine, tokens: TokenSigner) -> Self {
        Self {
            engine: Arc::new(engine),
            tokens: Arc::new(tokens),
            gateway: None,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            impersonation_ttl: Duration::minutes(DEFAULT_IMPERSONATION_TTL_MINUTES),
        }
    }

    #[must_use]
    pub fn gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    #[must_use]
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }
}

/// Who a request runs as. `impersonated_by` is set when a super admin is
/// acting as `user` through a delegation token.
#[derive(Clone, Debug)]
pub(crate) struct AuthUser {
    pub user: User,
    pub impersonated_by: Option<Uuid>,
}

impl AuthUser {
    pub(crate) fn id(&self) -> Uuid {
        self.user.id
    }
}

/// `TypedHeader` for the signed impersonation token.
#[derive(Debug)]
struct ImpersonationToken(String);

impl Header for ImpersonationToken {
    fn name() -> &'static HeaderName {
        &IMPERSONATION_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(AxumError::invalid());
        }
        Ok(ImpersonationToken(value.to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        match HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-impersonation-token header"),
        }
    }
}

async fn require_session(
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    impersonation: Option<TypedHeader<ImpersonationToken>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if request.headers().contains_key(&LEGACY_IMPERSONATION_HEADER) {
        return Err(ServerError::Generic(
            "x-impersonation-data is not accepted; use x-impersonation-token".to_string(),
        ));
    }
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(ServerError::Unauthorized("missing bearer token".to_string()));
    };

    let now = Utc::now();
    let claims = state.tokens.verify_session(bearer.token(), now)?;
    let user = match state.engine.user(claims.sub).await {
        Ok(user) => user,
        Err(EngineError::KeyNotFound(_)) => {
            return Err(ServerError::Unauthorized("unknown session user".to_string()));
        }
        Err(err) => return Err(err.into()),
    };
    if user.role != claims.role {
        return Err(ServerError::Unauthorized(
            "session is out of date, log in again".to_string(),
        ));
    }

    let auth_user = match impersonation {
        None => AuthUser {
            user,
            impersonated_by: None,
        },
        Some(TypedHeader(ImpersonationToken(token))) => {
            let delegation = state.tokens.verify_delegation(&token, now)?;
            if delegation.actor != user.id {
                return Err(ServerError::Forbidden(
                    "impersonation token belongs to another user".to_string(),
                ));
            }
            let target = state
                .engine
                .impersonation_target(user.id, delegation.target, delegation.target_role)
                .await?;
            tracing::debug!(actor = %user.id, target = %target.id, "request runs as impersonated user");
            AuthUser {
                user: target,
                impersonated_by: Some(user.id),
            }
        }
    };

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Allocation and withdrawal routes of one share role.
fn share_routes(share_role: ShareRole) -> Router<ServerState> {
    Router::new()
        .route(
            "/withdraw",
            get(withdrawals::overview).post(withdrawals::request),
        )
        .route("/allocations", get(allocations::own))
        .layer(Extension(share_role))
}

pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/api/me", get(auth::me))
        .nest("/api/cooperative", share_routes(ShareRole::Cooperative))
        .nest("/api/leader", share_routes(ShareRole::Leader))
        .nest(
            "/api/parent-organization",
            share_routes(ShareRole::ParentOrganization),
        )
        .route("/api/payments/registration", post(payments::start))
        .route("/api/admin/users/create-member", post(admin::create_member))
        .route("/api/admin/impersonation", post(admin::impersonate))
        .route("/api/admin/settings", get(admin::list_settings))
        .route("/api/admin/settings/{key}", put(admin::update_setting))
        .route("/api/admin/allocations", get(allocations::for_scope))
        .route("/api/admin/withdrawals", get(withdrawals::list))
        .route(
            "/api/admin/withdrawals/{id}/approve",
            post(withdrawals::approve),
        )
        .route("/api/admin/withdrawals/{id}/reject", post(withdrawals::reject))
        .route("/api/admin/audit", get(admin::audit))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    let public = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/mobile/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/korapay/verify", get(payments::verify));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(state: ServerState, addr: &str) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(state, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
