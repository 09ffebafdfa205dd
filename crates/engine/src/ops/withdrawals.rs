use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AuditAction, EngineError, Kobo, RECENT_LIMIT, ResultEngine, Role, ShareRole, Withdrawal,
    WithdrawalStatus, allocation::available_balance, audit_log, commands::RequestWithdrawalCmd,
    util::required_text, withdrawals,
};

use super::{Engine, with_tx};

/// Balance and history shown on a withdrawal page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WithdrawalOverview {
    pub share_role: ShareRole,
    pub allocation: Kobo,
    pub pending: Kobo,
    pub available: Kobo,
    pub recent: Vec<Withdrawal>,
}

const PROCESSOR_ROLES: [Role; 2] = [Role::SuperAdmin, Role::Finance];

impl Engine {
    async fn pending_total(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
        share_role: ShareRole,
    ) -> ResultEngine<Kobo> {
        let pending = withdrawals::Entity::find()
            .filter(withdrawals::Column::UserId.eq(user_id))
            .filter(withdrawals::Column::ShareRole.eq(share_role.as_str()))
            .filter(withdrawals::Column::Status.eq(WithdrawalStatus::Pending.as_str()))
            .all(db)
            .await?;
        Ok(pending.iter().map(|row| Kobo::new(row.amount)).sum())
    }

    /// Available balance: allocation minus this user's pending requests.
    async fn balance_in(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
        share_role: ShareRole,
        now: DateTime<Utc>,
    ) -> ResultEngine<(Kobo, Kobo, Kobo)> {
        let user = self.require_user(db, user_id).await?;
        let scope = self.resolve_scope_in(db, &user, share_role).await?;
        let summary = self.summary_in(db, share_role, scope, now).await?;
        let pending = self.pending_total(db, user_id, share_role).await?;
        Ok((
            summary.total_allocation,
            pending,
            available_balance(summary.total_allocation, pending),
        ))
    }

    /// Submit a withdrawal request.
    ///
    /// The balance check and the insert run in one transaction, and
    /// submissions are serialised, so two concurrent requests can never both
    /// pass the check against the same balance.
    ///
    /// Only PENDING requests are held back. Approved and rejected rows do not
    /// reduce the balance, so once a request is approved the same allocation
    /// can be requested again. This is not a payout ledger.
    pub async fn request_withdrawal(&self, cmd: RequestWithdrawalCmd) -> ResultEngine<Withdrawal> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }
        let reason = required_text(&cmd.reason, "reason")?;

        let _guard = self.withdrawal_lock.lock().await;
        with_tx!(self, serializable |db_tx| {
            let (_, _, available) = self
                .balance_in(&db_tx, cmd.user_id, cmd.share_role, cmd.requested_at)
                .await?;
            if cmd.amount > available {
                return Err(EngineError::InsufficientFunds(format!(
                    "requested {}, available {}",
                    cmd.amount,
                    available.floor_zero()
                )));
            }

            let withdrawal = Withdrawal::pending(
                cmd.user_id,
                cmd.share_role,
                cmd.amount,
                reason,
                cmd.requested_at,
            );
            let model: withdrawals::ActiveModel = (&withdrawal).into();
            model.insert(&db_tx).await?;
            tracing::info!(
                withdrawal_id = %withdrawal.id,
                user_id = %withdrawal.user_id,
                share_role = withdrawal.share_role.as_str(),
                amount = withdrawal.amount.kobo(),
                "withdrawal requested"
            );
            Ok(withdrawal)
        })
    }

    /// Balance plus the most recent withdrawals of `user_id` for `share_role`.
    pub async fn withdrawal_overview(
        &self,
        user_id: Uuid,
        share_role: ShareRole,
        now: DateTime<Utc>,
    ) -> ResultEngine<WithdrawalOverview> {
        with_tx!(self, |db_tx| {
            let (allocation, pending, available) =
                self.balance_in(&db_tx, user_id, share_role, now).await?;
            let models = withdrawals::Entity::find()
                .filter(withdrawals::Column::UserId.eq(user_id))
                .filter(withdrawals::Column::ShareRole.eq(share_role.as_str()))
                .order_by_desc(withdrawals::Column::RequestedAt)
                .order_by_desc(withdrawals::Column::Id)
                .limit(RECENT_LIMIT as u64)
                .all(&db_tx)
                .await?;
            let recent = models
                .into_iter()
                .map(Withdrawal::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(WithdrawalOverview {
                share_role,
                allocation,
                pending,
                available,
                recent,
            })
        })
    }

    /// Withdrawals across all users, newest first, for back-office review.
    pub async fn list_withdrawals(
        &self,
        actor_id: Uuid,
        status: Option<WithdrawalStatus>,
    ) -> ResultEngine<Vec<Withdrawal>> {
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, actor_id, &[Role::SuperAdmin, Role::Apex, Role::Finance])
                .await?;
            let mut query = withdrawals::Entity::find();
            if let Some(status) = status {
                query = query.filter(withdrawals::Column::Status.eq(status.as_str()));
            }
            query
                .order_by_desc(withdrawals::Column::RequestedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Withdrawal::try_from)
                .collect()
        })
    }

    pub async fn approve_withdrawal(
        &self,
        actor_id: Uuid,
        withdrawal_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<Withdrawal> {
        self.process_withdrawal(actor_id, withdrawal_id, WithdrawalStatus::Approved, now)
            .await
    }

    pub async fn reject_withdrawal(
        &self,
        actor_id: Uuid,
        withdrawal_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<Withdrawal> {
        self.process_withdrawal(actor_id, withdrawal_id, WithdrawalStatus::Rejected, now)
            .await
    }

    async fn process_withdrawal(
        &self,
        actor_id: Uuid,
        withdrawal_id: Uuid,
        outcome: WithdrawalStatus,
        now: DateTime<Utc>,
    ) -> ResultEngine<Withdrawal> {
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, actor_id, &PROCESSOR_ROLES).await?;
            let model = withdrawals::Entity::find_by_id(withdrawal_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("withdrawal not exists".to_string()))?;
            let mut withdrawal = Withdrawal::try_from(model)?;
            if withdrawal.status != WithdrawalStatus::Pending {
                return Err(EngineError::InvalidState(format!(
                    "withdrawal is already {}",
                    withdrawal.status.as_str()
                )));
            }

            let update = withdrawals::ActiveModel {
                id: ActiveValue::Unchanged(withdrawal.id),
                status: ActiveValue::Set(outcome.as_str().to_string()),
                processed_at: ActiveValue::Set(Some(now)),
                processed_by: ActiveValue::Set(Some(actor_id)),
                ..Default::default()
            };
            update.update(&db_tx).await?;

            let action = match outcome {
                WithdrawalStatus::Approved => AuditAction::WithdrawalApproved,
                _ => AuditAction::WithdrawalRejected,
            };
            audit_log::ActiveModel::record(actor_id, action, format!("withdrawal:{}", withdrawal.id), now)
                .insert(&db_tx)
                .await?;

            withdrawal.status = outcome;
            withdrawal.processed_at = Some(now);
            withdrawal.processed_by = Some(actor_id);
            tracing::info!(
                withdrawal_id = %withdrawal.id,
                %actor_id,
                status = outcome.as_str(),
                "withdrawal processed"
            );
            Ok(withdrawal)
        })
    }
}
