use sea_orm::{QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{AuditEntry, ResultEngine, Role, audit_log};

use super::{Engine, with_tx};

impl Engine {
    /// Most recent audit entries, newest first.
    pub async fn audit_entries(&self, actor_id: Uuid, limit: u64) -> ResultEngine<Vec<AuditEntry>> {
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, actor_id, &[Role::SuperAdmin])
                .await?;
            let models = audit_log::Entity::find()
                .order_by_desc(audit_log::Column::CreatedAt)
                .limit(limit)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(AuditEntry::from).collect())
        })
    }
}
