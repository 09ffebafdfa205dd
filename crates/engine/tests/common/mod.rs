#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    CreateCooperativeCmd, Engine, GatewayVerification, Kobo, RegisterUserCmd, RegistrationKind,
    Role, SettingsProvider, User,
};
use migration::MigratorTrait;

pub const PASSWORD: &str = "s3cret-pass";

pub async fn connect() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = connect().await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn engine_with_provider(provider: Arc<dyn SettingsProvider>) -> (Engine, DatabaseConnection) {
    let db = connect().await;
    let engine = Engine::builder()
        .database(db.clone())
        .settings_provider(provider)
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn engine_with_file_db() -> (Engine, DatabaseConnection, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db, path)
}

pub async fn user(engine: &Engine, name: &str, role: Role) -> User {
    let email = format!("{}@coop.test", name.to_lowercase().replace(' ', "."));
    engine
        .register_user(RegisterUserCmd::new(name, email, PASSWORD, role))
        .await
        .unwrap()
}

/// A parent organization with one cooperative, its account and a leader.
pub struct Org {
    pub super_admin: User,
    pub parent_account: User,
    pub parent_id: Uuid,
    pub cooperative_account: User,
    pub cooperative_id: Uuid,
    pub leader: User,
}

pub async fn org(engine: &Engine) -> Org {
    let super_admin = user(engine, "Root Admin", Role::SuperAdmin).await;
    let parent_account = user(engine, "Parent Account", Role::ParentOrganization).await;
    let parent = engine
        .create_parent_organization("Lagos Union", Some(parent_account.id))
        .await
        .unwrap();
    let cooperative_account = user(engine, "Coop Account", Role::Cooperative).await;
    let cooperative = engine
        .create_cooperative(
            CreateCooperativeCmd::new("Ikeja Farmers")
                .parent_organization_id(parent.id)
                .account_user_id(cooperative_account.id),
        )
        .await
        .unwrap();
    let leader = user(engine, "Coop Leader", Role::Leader).await;
    engine.assign_leader(leader.id, cooperative.id).await.unwrap();

    Org {
        super_admin,
        parent_account,
        parent_id: parent.id,
        cooperative_account,
        cooperative_id: cooperative.id,
        leader,
    }
}

pub async fn member(engine: &Engine, cooperative_id: Uuid, name: &str) -> User {
    let email = format!("{}@members.test", name.to_lowercase().replace(' ', "."));
    engine
        .register_user(
            RegisterUserCmd::new(name, email, PASSWORD, Role::Member).cooperative_id(cooperative_id),
        )
        .await
        .unwrap()
}

/// Start and settle a registration fee of `naira`.
pub async fn pay(engine: &Engine, payer: &User, kind: RegistrationKind, naira: i64) {
    let amount = Kobo::new(naira * 100);
    let tx = engine
        .start_registration_payment(payer.id, kind, amount)
        .await
        .unwrap();
    engine
        .settle_payment(&GatewayVerification {
            reference: tx.reference,
            paid: true,
            amount,
        })
        .await
        .unwrap();
}

/// Insert a transaction row directly, the way older records were written.
#[allow(clippy::too_many_arguments)]
pub async fn insert_raw_transaction(
    db: &DatabaseConnection,
    user_id: Uuid,
    amount_kobo: i64,
    status: &str,
    reference: &str,
    description: Option<&str>,
    created_at: DateTime<Utc>,
) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO transactions (id, user_id, amount, status, kind, reference, description, registration_kind, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'FEE', ?, ?, NULL, ?, ?)",
        vec![
            Uuid::new_v4().into(),
            user_id.into(),
            amount_kobo.into(),
            status.into(),
            reference.into(),
            description.map(str::to_string).into(),
            created_at.into(),
            created_at.into(),
        ],
    ))
    .await
    .unwrap();
}
