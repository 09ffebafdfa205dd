mod common;

use chrono::{Duration, Utc};

use common::{PASSWORD, engine_with_db, member, org, user};
use engine::{EngineError, Kobo, RegisterUserCmd, RegistrationKind, Role, TransactionStatus};

#[tokio::test]
async fn login_accepts_email_phone_and_nin() {
    let (engine, _db) = engine_with_db().await;
    let org = org(&engine).await;
    let created = engine
        .register_user(
            RegisterUserCmd::new("Ngozi Eze", "Ngozi@Coop.NG", PASSWORD, Role::Member)
                .phone("+234 803 123 4567")
                .nin("12345678901")
                .cooperative_id(org.cooperative_id),
        )
        .await
        .unwrap();
    assert_eq!(created.email, "ngozi@coop.ng");
    assert_eq!(created.phone.as_deref(), Some("08031234567"));

    for identifier in ["ngozi@coop.ng", "08031234567", "8031234567", "+2348031234567", "12345678901"] {
        let user = engine.authenticate(identifier, PASSWORD).await.unwrap();
        assert_eq!(user.id, created.id, "identifier {identifier}");
    }
}

#[tokio::test]
async fn login_failures_look_the_same() {
    let (engine, _db) = engine_with_db().await;
    user(&engine, "Tunde", Role::Member).await;

    let wrong_password = engine
        .authenticate("tunde@coop.test", "not-the-password")
        .await
        .unwrap_err();
    let unknown_user = engine
        .authenticate("nobody@coop.test", PASSWORD)
        .await
        .unwrap_err();
    let garbage = engine.authenticate("12345", PASSWORD).await.unwrap_err();
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(unknown_user, garbage);
    assert!(matches!(wrong_password, EngineError::Unauthorized(_)));
}

#[tokio::test]
async fn duplicate_identity_fields_are_named() {
    let (engine, _db) = engine_with_db().await;
    engine
        .register_user(
            RegisterUserCmd::new("First", "first@coop.test", PASSWORD, Role::Member)
                .phone("08011111111")
                .nin("11111111111"),
        )
        .await
        .unwrap();

    let err = engine
        .register_user(RegisterUserCmd::new("Second", "FIRST@coop.test", PASSWORD, Role::Member))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::ExistingKey("A user with this email already exists".to_string())
    );

    let err = engine
        .register_user(
            RegisterUserCmd::new("Second", "second@coop.test", PASSWORD, Role::Member)
                .nin("11111111111"),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::ExistingKey("A user with this NIN already exists".to_string())
    );

    let err = engine
        .register_user(
            RegisterUserCmd::new("Second", "second@coop.test", PASSWORD, Role::Member)
                .phone("+2348011111111"),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::ExistingKey("A user with this phone number already exists".to_string())
    );
}

#[tokio::test]
async fn cooperative_accounts_add_members_to_their_own_cooperative() {
    let (engine, _db) = engine_with_db().await;
    let org = org(&engine).await;
    let other = engine
        .create_cooperative(engine::CreateCooperativeCmd::new("Other Coop"))
        .await
        .unwrap();

    let added = engine
        .create_member(
            org.cooperative_account.id,
            RegisterUserCmd::new("Kemi", "kemi@coop.test", PASSWORD, Role::SuperAdmin),
        )
        .await
        .unwrap();
    assert_eq!(added.role, Role::Member);
    assert_eq!(added.cooperative_id, Some(org.cooperative_id));

    let err = engine
        .create_member(
            org.cooperative_account.id,
            RegisterUserCmd::new("Lola", "lola@coop.test", PASSWORD, Role::Member)
                .cooperative_id(other.id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let by_leader = engine
        .create_member(
            org.leader.id,
            RegisterUserCmd::new("Musa", "musa@coop.test", PASSWORD, Role::Member),
        )
        .await
        .unwrap();
    assert_eq!(by_leader.cooperative_id, Some(org.cooperative_id));

    let err = engine
        .create_member(
            org.super_admin.id,
            RegisterUserCmd::new("Nneka", "nneka@coop.test", PASSWORD, Role::Member),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let ada = member(&engine, org.cooperative_id, "Ada").await;
    let err = engine
        .create_member(
            ada.id,
            RegisterUserCmd::new("Obi", "obi@coop.test", PASSWORD, Role::Member),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn reset_token_is_single_use_and_expires() {
    let (engine, _db) = engine_with_db().await;
    let tunde = user(&engine, "Tunde", Role::Member).await;
    let now = Utc::now();

    assert_eq!(
        engine
            .request_password_reset("ghost@coop.test", now)
            .await
            .unwrap(),
        None
    );

    let token = engine
        .request_password_reset("tunde@coop.test", now)
        .await
        .unwrap()
        .unwrap();
    engine
        .reset_password(&token, "brand-new-pass", now)
        .await
        .unwrap();
    assert_eq!(
        engine
            .authenticate("tunde@coop.test", "brand-new-pass")
            .await
            .unwrap()
            .id,
        tunde.id
    );
    assert!(engine.reset_password(&token, "another-pass", now).await.is_err());

    let stale = engine
        .request_password_reset("tunde@coop.test", now)
        .await
        .unwrap()
        .unwrap();
    let err = engine
        .reset_password(&stale, "another-pass", now + Duration::minutes(61))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn impersonation_is_limited_to_super_admins() {
    let (engine, _db) = engine_with_db().await;
    let org = org(&engine).await;
    let now = Utc::now();

    let target = engine
        .start_impersonation(org.super_admin.id, org.cooperative_account.id, now)
        .await
        .unwrap();
    assert_eq!(target.role, Role::Cooperative);
    assert_eq!(
        engine
            .impersonation_target(org.super_admin.id, target.id, Role::Cooperative)
            .await
            .unwrap()
            .id,
        target.id
    );

    let err = engine
        .impersonation_target(org.super_admin.id, target.id, Role::Leader)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .start_impersonation(org.leader.id, org.cooperative_account.id, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let audit = engine.audit_entries(org.super_admin.id, 10).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "impersonation_started");
}

#[tokio::test]
async fn payment_settlement_is_checked_and_idempotent() {
    let (engine, _db) = engine_with_db().await;
    let org = org(&engine).await;
    let ada = member(&engine, org.cooperative_id, "Ada").await;

    let err = engine
        .start_registration_payment(ada.id, RegistrationKind::Cooperative, Kobo::new(100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let pending = engine
        .start_registration_payment(ada.id, RegistrationKind::Member, Kobo::new(200_000))
        .await
        .unwrap();
    assert!(pending.reference.starts_with("REG_"));
    assert_eq!(pending.status, TransactionStatus::Pending);
    assert_eq!(pending.description.as_deref(), Some("Member registration fee"));

    let short = engine
        .settle_payment(&engine::GatewayVerification {
            reference: pending.reference.clone(),
            paid: true,
            amount: Kobo::new(100_000),
        })
        .await
        .unwrap();
    assert_eq!(short.status, TransactionStatus::Failed);

    // A later verification does not reopen a settled row.
    let again = engine
        .settle_payment(&engine::GatewayVerification {
            reference: pending.reference.clone(),
            paid: true,
            amount: Kobo::new(200_000),
        })
        .await
        .unwrap();
    assert_eq!(again.status, TransactionStatus::Failed);

    let err = engine
        .settle_payment(&engine::GatewayVerification {
            reference: "REG_missing".to_string(),
            paid: true,
            amount: Kobo::new(1),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn organizations_link_accounts_and_leaders() {
    let (engine, _db) = engine_with_db().await;
    let org = org(&engine).await;

    let cooperative = engine.cooperative(org.cooperative_id).await.unwrap();
    assert_eq!(cooperative.name, "Ikeja Farmers");
    assert_eq!(cooperative.parent_organization_id, Some(org.parent_id));
    assert_eq!(cooperative.user_id, Some(org.cooperative_account.id));

    let account = engine.user(org.cooperative_account.id).await.unwrap();
    assert_eq!(account.cooperative_id, Some(org.cooperative_id));
    let leader = engine.user(org.leader.id).await.unwrap();
    assert_eq!(leader.cooperative_id, Some(org.cooperative_id));

    let listed = engine.list_cooperatives(Some(org.parent_id)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(
        engine
            .list_cooperatives(Some(uuid::Uuid::new_v4()))
            .await
            .unwrap()
            .is_empty()
    );

    let err = engine.cooperative(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
