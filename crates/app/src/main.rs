use std::sync::Arc;

use chrono::Duration;
use migration::{Migrator, MigratorTrait};
use server::{HttpGateway, ServerState, TokenSigner};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "coophub={level},server={level},engine={level},tower_http={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;
    let engine = engine::Engine::builder().database(db).build().await?;
    let tokens = TokenSigner::new(settings.server.token_secret.as_bytes())?;

    let mut state = ServerState::new(engine, tokens);
    if let Some(hours) = settings.server.session_ttl_hours {
        state = state.session_ttl(Duration::hours(hours));
    }
    match settings.payments {
        Some(payments) => {
            tracing::info!(provider = ?payments.provider, "payment verification enabled");
            state = state.gateway(Arc::new(HttpGateway::new(
                payments.provider,
                payments.base_url,
                payments.secret_key,
            )));
        }
        None => tracing::warn!("no payments section, payment verification is disabled"),
    }

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    server::run_with_listener(state, listener).await?;

    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
        Database::Url(url) => url.clone(),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
