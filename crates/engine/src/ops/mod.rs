use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection};
use tokio::sync::Mutex;

use crate::{AllocationRates, ResultEngine, SettingsProvider, SettingsSnapshot, ShareRole};

mod access;
mod allocations;
mod audit;
mod organizations;
mod payments;
mod settings;
mod users;
mod withdrawals;

pub use payments::GatewayVerification;
pub use withdrawals::WithdrawalOverview;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// The `serializable` form asks the backend for serializable isolation; use it
/// when a read decides whether a write is allowed.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
    ($self:expr, serializable |$tx:ident| $body:expr) => {{
        let $tx = $self
            .database
            .begin_with_config(Some(sea_orm::IsolationLevel::Serializable), None)
            .await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    settings_override: Option<Arc<dyn SettingsProvider>>,
    /// Serialises withdrawal submissions in this process. SQLite ignores the
    /// requested isolation level, so the balance check relies on this.
    withdrawal_lock: Mutex<()>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Allocation rates for `role`, read from the override provider when one
    /// was injected, from the `settings` table otherwise.
    async fn rates<C: ConnectionTrait>(&self, db: &C, role: ShareRole) -> ResultEngine<AllocationRates> {
        if let Some(provider) = &self.settings_override {
            return Ok(AllocationRates::from_provider(provider.as_ref(), role));
        }
        let snapshot = SettingsSnapshot::load(db).await?;
        Ok(AllocationRates::from_provider(&snapshot, role))
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    settings_provider: Option<Arc<dyn SettingsProvider>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Read allocation settings from `provider` instead of the `settings`
    /// table.
    pub fn settings_provider(mut self, provider: Arc<dyn SettingsProvider>) -> EngineBuilder {
        self.settings_provider = Some(provider);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            settings_override: self.settings_provider,
            withdrawal_lock: Mutex::new(()),
        })
    }
}
