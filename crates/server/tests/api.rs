use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use engine::{
    CreateCooperativeCmd, Engine, GatewayVerification, Kobo, RegisterUserCmd, Role, User,
};
use migration::MigratorTrait;
use server::{GatewayError, PaymentGateway, ServerState, TokenSigner, router};

const SECRET: &[u8] = b"test-secret-test-secret-test-secret!";
const PASSWORD: &str = "s3cret-pass";

struct Fixture {
    app: Router,
    state: ServerState,
    super_admin: User,
    cooperative_account: User,
    member: User,
}

/// Answers every verification as paid with a fixed amount.
struct PaidGateway {
    amount: Kobo,
}

#[async_trait]
impl PaymentGateway for PaidGateway {
    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError> {
        Ok(GatewayVerification {
            reference: reference.to_string(),
            paid: true,
            amount: self.amount,
        })
    }
}

async fn register(engine: &Engine, name: &str, role: Role, cooperative_id: Option<Uuid>) -> User {
    let email = format!("{}@coop.test", name.to_lowercase().replace(' ', "."));
    let mut cmd = RegisterUserCmd::new(name, email, PASSWORD, role);
    cmd.cooperative_id = cooperative_id;
    engine.register_user(cmd).await.unwrap()
}

async fn fixture_with(gateway: Option<Arc<dyn PaymentGateway>>) -> Fixture {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    let mut state = ServerState::new(engine, TokenSigner::new(SECRET).unwrap());
    if let Some(gateway) = gateway {
        state = state.gateway(gateway);
    }

    let engine = state.engine.clone();
    let super_admin = register(&engine, "Root Admin", Role::SuperAdmin, None).await;
    let cooperative_account = register(&engine, "Coop Account", Role::Cooperative, None).await;
    let cooperative = engine
        .create_cooperative(
            CreateCooperativeCmd::new("Ikeja Farmers").account_user_id(cooperative_account.id),
        )
        .await
        .unwrap();
    let cooperative_account = engine.user(cooperative_account.id).await.unwrap();
    let member = register(&engine, "Ada Member", Role::Member, Some(cooperative.id)).await;

    Fixture {
        app: router(state.clone()),
        state,
        super_admin,
        cooperative_account,
        member,
    }
}

async fn fixture() -> Fixture {
    fixture_with(None).await
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, identifier: &str) -> String {
    let resp = send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "identifier": identifier, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await["token"].as_str().unwrap().to_string()
}

/// Settle a member registration fee of `naira` directly through the engine.
async fn pay_member_fee(state: &ServerState, member: &User, naira: i64) {
    let amount = Kobo::new(naira * 100);
    let tx = state
        .engine
        .start_registration_payment(member.id, engine::RegistrationKind::Member, amount)
        .await
        .unwrap();
    state
        .engine
        .settle_payment(&GatewayVerification {
            reference: tx.reference,
            paid: true,
            amount,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn login_token_opens_protected_routes() {
    let f = fixture().await;
    let token = login(&f.app, &f.member.email).await;

    let resp = send(&f.app, get("/api/me", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["email"], f.member.email.as_str());
    assert_eq!(body["role"], "MEMBER");
}

#[tokio::test]
async fn mobile_login_accepts_the_email_field() {
    let f = fixture().await;
    let resp = send(
        &f.app,
        json_request(
            "POST",
            "/api/auth/mobile/login",
            None,
            json!({ "email": f.member.email, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_json(resp).await["token"].as_str().is_some());
}

#[tokio::test]
async fn bad_credentials_are_401() {
    let f = fixture().await;
    let resp = send(
        &f.app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "identifier": f.member.email, "password": "wrong-password" }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "Unauthorized: invalid credentials");
}

#[tokio::test]
async fn missing_or_forged_token_is_401() {
    let f = fixture().await;
    let resp = send(&f.app, get("/api/me", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let forged = TokenSigner::new(b"another-secret-another-secret-12345".to_vec())
        .unwrap()
        .issue_session(
            f.super_admin.id,
            Role::SuperAdmin,
            chrono::Utc::now() + chrono::Duration::hours(1),
        )
        .unwrap();
    let resp = send(&f.app, get("/api/me", Some(&forged))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn legacy_impersonation_header_is_rejected() {
    let f = fixture().await;
    let token = login(&f.app, &f.super_admin.email).await;
    let req = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            "x-impersonation-data",
            json!({ "id": f.cooperative_account.id, "role": "COOPERATIVE" }).to_string(),
        )
        .body(Body::empty())
        .unwrap();
    let resp = send(&f.app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cooperative_withdrawals_are_capped_by_the_allocation() {
    let f = fixture().await;
    pay_member_fee(&f.state, &f.member, 10_000).await;
    let token = login(&f.app, &f.cooperative_account.email).await;

    // (10000 - 500) * 20%
    let resp = send(&f.app, get("/api/cooperative/allocations", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["total_allocation"], 1900.0);
    assert_eq!(body["member_registrations"], 1);
    assert_eq!(body["monthly"].as_array().unwrap().len(), 12);

    let resp = send(
        &f.app,
        json_request(
            "POST",
            "/api/cooperative/withdraw",
            Some(&token),
            json!({ "amount": 1000.0, "reason": "Office rent" }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["status"], "PENDING");

    let resp = send(
        &f.app,
        json_request(
            "POST",
            "/api/cooperative/withdraw",
            Some(&token),
            json!({ "amount": 1000.0, "reason": "More rent" }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&f.app, get("/api/cooperative/withdraw", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["available_balance"], 900.0);
    assert_eq!(body["pending"], 1000.0);
    assert_eq!(body["withdrawals"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn fractional_naira_amounts_round_to_the_nearest_kobo() {
    let f = fixture().await;
    pay_member_fee(&f.state, &f.member, 10_000).await;
    let token = login(&f.app, &f.cooperative_account.email).await;

    let resp = send(
        &f.app,
        json_request(
            "POST",
            "/api/cooperative/withdraw",
            Some(&token),
            json!({ "amount": 12.345, "reason": "Bank charges" }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["amount"], 12.35);

    let stored = f
        .state
        .engine
        .list_withdrawals(f.super_admin.id, None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, Kobo::new(1_235));
}

#[tokio::test]
async fn share_routes_require_the_matching_role() {
    let f = fixture().await;
    let token = login(&f.app, &f.member.email).await;
    let resp = send(&f.app, get("/api/cooperative/withdraw", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let token = login(&f.app, &f.cooperative_account.email).await;
    let resp = send(&f.app, get("/api/leader/allocations", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn super_admin_can_act_as_a_cooperative() {
    let f = fixture().await;
    pay_member_fee(&f.state, &f.member, 10_000).await;
    let admin_token = login(&f.app, &f.super_admin.email).await;

    let resp = send(
        &f.app,
        json_request(
            "POST",
            "/api/admin/impersonation",
            Some(&admin_token),
            json!({ "user_id": f.cooperative_account.id }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let delegation = body_json(resp).await["token"].as_str().unwrap().to_string();

    let req = Request::builder()
        .uri("/api/cooperative/withdraw")
        .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
        .header("x-impersonation-token", delegation.as_str())
        .body(Body::empty())
        .unwrap();
    let resp = send(&f.app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["total_allocation"], 1900.0);

    // The delegation only works with the issuing admin's own session.
    let member_token = login(&f.app, &f.member.email).await;
    let req = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {member_token}"))
        .header("x-impersonation-token", delegation.as_str())
        .body(Body::empty())
        .unwrap();
    let resp = send(&f.app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let audit = send(&f.app, get("/api/admin/audit", Some(&admin_token))).await;
    assert_eq!(audit.status(), StatusCode::OK);
    assert_eq!(body_json(audit).await[0]["action"], "impersonation_started");
}

#[tokio::test]
async fn only_super_admins_can_impersonate() {
    let f = fixture().await;
    let token = login(&f.app, &f.cooperative_account.email).await;
    let resp = send(
        &f.app,
        json_request(
            "POST",
            "/api/admin/impersonation",
            Some(&token),
            json!({ "user_id": f.member.id }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn session_token_is_not_a_delegation() {
    let f = fixture().await;
    let admin_token = login(&f.app, &f.super_admin.email).await;
    let req = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
        .header("x-impersonation-token", admin_token.as_str())
        .body(Body::empty())
        .unwrap();
    let resp = send(&f.app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cooperative_creates_members_and_duplicates_conflict() {
    let f = fixture().await;
    let token = login(&f.app, &f.cooperative_account.email).await;
    let payload = json!({
        "name": "Bola Member",
        "email": "bola@members.test",
        "phone": "08031234567",
        "nin": null,
        "password": PASSWORD,
        "cooperative_id": null,
    });

    let resp = send(
        &f.app,
        json_request("POST", "/api/admin/users/create-member", Some(&token), payload.clone()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["role"], "MEMBER");
    assert_eq!(body["cooperative_id"], json!(f.cooperative_account.cooperative_id));

    let resp = send(
        &f.app,
        json_request("POST", "/api/admin/users/create-member", Some(&token), payload),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["error"], "A user with this email already exists");
}

#[tokio::test]
async fn settings_are_super_admin_writable() {
    let f = fixture().await;
    let coop_token = login(&f.app, &f.cooperative_account.email).await;
    let req = json_request(
        "PUT",
        "/api/admin/settings/cooperative_allocation_percentage",
        Some(&coop_token),
        json!({ "value": "50" }),
    );
    assert_eq!(send(&f.app, req).await.status(), StatusCode::FORBIDDEN);

    let admin_token = login(&f.app, &f.super_admin.email).await;
    let req = json_request(
        "PUT",
        "/api/admin/settings/cooperative_allocation_percentage",
        Some(&admin_token),
        json!({ "value": "150" }),
    );
    assert_eq!(send(&f.app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = json_request(
        "PUT",
        "/api/admin/settings/cooperative_allocation_percentage",
        Some(&admin_token),
        json!({ "value": "50" }),
    );
    let resp = send(&f.app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["stored"], true);

    pay_member_fee(&f.state, &f.member, 10_000).await;
    let resp = send(&f.app, get("/api/cooperative/allocations", Some(&coop_token))).await;
    assert_eq!(body_json(resp).await["total_allocation"], 4750.0);
}

#[tokio::test]
async fn withdrawals_can_be_approved_by_super_admin() {
    let f = fixture().await;
    pay_member_fee(&f.state, &f.member, 10_000).await;
    let coop_token = login(&f.app, &f.cooperative_account.email).await;
    let resp = send(
        &f.app,
        json_request(
            "POST",
            "/api/cooperative/withdraw",
            Some(&coop_token),
            json!({ "amount": 500.0, "reason": "Stationery" }),
        ),
    )
    .await;
    let id = body_json(resp).await["id"].as_str().unwrap().to_string();

    let admin_token = login(&f.app, &f.super_admin.email).await;
    let resp = send(&f.app, get("/api/admin/withdrawals?status=pending", Some(&admin_token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);

    let uri = format!("/api/admin/withdrawals/{id}/approve");
    let resp = send(&f.app, json_request("POST", &uri, Some(&admin_token), json!({}))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "APPROVED");

    let resp = send(&f.app, json_request("POST", &uri, Some(&admin_token), json!({}))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_payment_is_verified_through_the_gateway() {
    let gateway: Arc<dyn PaymentGateway> = Arc::new(PaidGateway {
        amount: Kobo::new(1_000_000),
    });
    let f = fixture_with(Some(gateway)).await;
    let token = login(&f.app, &f.member.email).await;

    let resp = send(
        &f.app,
        json_request(
            "POST",
            "/api/payments/registration",
            Some(&token),
            json!({ "kind": "member", "amount": 10000.0 }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "PENDING");
    let reference = body["reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("REG_"));

    let resp = send(&f.app, get(&format!("/api/korapay/verify?reference={reference}"), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "SUCCESSFUL");

    let resp = send(&f.app, get("/api/korapay/verify?reference=REG_unknown", None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verification_without_gateway_is_502() {
    let f = fixture().await;
    let token = login(&f.app, &f.member.email).await;
    let resp = send(
        &f.app,
        json_request(
            "POST",
            "/api/payments/registration",
            Some(&token),
            json!({ "kind": "member", "amount": 10000.0 }),
        ),
    )
    .await;
    let reference = body_json(resp).await["reference"].as_str().unwrap().to_string();

    let resp = send(&f.app, get(&format!("/api/korapay/verify?reference={reference}"), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn forgot_password_answers_the_same_for_unknown_emails() {
    let f = fixture().await;
    let known = send(
        &f.app,
        json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({ "email": f.member.email }),
        ),
    )
    .await;
    let unknown = send(
        &f.app,
        json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({ "email": "nobody@coop.test" }),
        ),
    )
    .await;
    assert_eq!(known.status(), StatusCode::OK);
    assert_eq!(unknown.status(), StatusCode::OK);
    assert_eq!(body_json(known).await, body_json(unknown).await);
}
