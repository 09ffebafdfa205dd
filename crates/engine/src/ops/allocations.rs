use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, JoinType, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Query,
};
use uuid::Uuid;

use crate::{
    AllocationScope, AllocationSummary, REGISTRATION_REFERENCE_PREFIX, RegistrationFee,
    ResultEngine, ShareRole, Transaction, TransactionStatus, cooperatives, transactions, users,
};

use super::{Engine, with_tx};

impl Engine {
    /// Every successful registration fee paid by users inside `scope`.
    pub(super) async fn scoped_fees(
        &self,
        db: &DatabaseTransaction,
        scope: AllocationScope,
    ) -> ResultEngine<Vec<RegistrationFee>> {
        let query = transactions::Entity::find()
            .join(JoinType::InnerJoin, transactions::Relation::User.def())
            .filter(transactions::Column::Status.eq(TransactionStatus::Successful.as_str()))
            .filter(transactions::Column::Reference.starts_with(REGISTRATION_REFERENCE_PREFIX))
            .filter(transactions::Column::Amount.gt(0));
        let query = match scope {
            AllocationScope::Cooperative(id) => query.filter(users::Column::CooperativeId.eq(id)),
            AllocationScope::ParentOrganization(id) => query.filter(
                users::Column::CooperativeId.in_subquery(
                    Query::select()
                        .column(cooperatives::Column::Id)
                        .from(cooperatives::Entity)
                        .and_where(cooperatives::Column::ParentOrganizationId.eq(id))
                        .to_owned(),
                ),
            ),
        };
        let models = query
            .order_by_desc(transactions::Column::CreatedAt)
            .all(db)
            .await?;

        let mut fees = Vec::with_capacity(models.len());
        for model in models {
            // LIKE treats `_` as a wildcard.
            if !model.reference.starts_with(REGISTRATION_REFERENCE_PREFIX) {
                continue;
            }
            let tx = Transaction::try_from(model)?;
            fees.push(RegistrationFee::from(&tx));
        }
        Ok(fees)
    }

    pub(super) async fn summary_in(
        &self,
        db: &DatabaseTransaction,
        share_role: ShareRole,
        scope: AllocationScope,
        now: DateTime<Utc>,
    ) -> ResultEngine<AllocationSummary> {
        let rates = self.rates(db, share_role).await?;
        let fees = self.scoped_fees(db, scope).await?;
        Ok(AllocationSummary::build(share_role, scope, &rates, &fees, now))
    }

    /// Allocation of `share_role` over the fees of `scope`, with the recent
    /// fees and the trailing monthly breakdown.
    pub async fn allocation_summary(
        &self,
        share_role: ShareRole,
        scope: AllocationScope,
        now: DateTime<Utc>,
    ) -> ResultEngine<AllocationSummary> {
        with_tx!(self, |db_tx| self.summary_in(&db_tx, share_role, scope, now).await)
    }

    /// Allocation summary for the caller's own scope.
    pub async fn allocation_summary_for_user(
        &self,
        user_id: Uuid,
        share_role: ShareRole,
        now: DateTime<Utc>,
    ) -> ResultEngine<AllocationSummary> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let scope = self.resolve_scope_in(&db_tx, &user, share_role).await?;
            self.summary_in(&db_tx, share_role, scope, now).await
        })
    }
}
