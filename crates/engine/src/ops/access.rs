use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    AllocationScope, AuditAction, EngineError, ResultEngine, Role, ShareRole, User, audit_log,
    cooperatives, leaders, parent_organizations, users,
};

use super::{Engine, with_tx};

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
    ) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
        User::try_from(model)
    }

    /// Load `user_id` and check it holds one of `allowed`.
    pub(super) async fn require_role(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
        allowed: &[Role],
    ) -> ResultEngine<User> {
        let user = self.require_user(db, user_id).await?;
        if !allowed.contains(&user.role) {
            return Err(EngineError::Forbidden(format!(
                "role {} cannot perform this action",
                user.role
            )));
        }
        Ok(user)
    }

    pub(super) async fn resolve_scope_in(
        &self,
        db: &DatabaseTransaction,
        user: &User,
        share_role: ShareRole,
    ) -> ResultEngine<AllocationScope> {
        if user.role != share_role.required_role() {
            return Err(EngineError::Forbidden(format!(
                "{} share requires role {}",
                share_role.as_str(),
                share_role.required_role()
            )));
        }

        match share_role {
            ShareRole::Cooperative => cooperatives::Entity::find()
                .filter(cooperatives::Column::UserId.eq(user.id))
                .one(db)
                .await?
                .map(|coop| AllocationScope::Cooperative(coop.id))
                .ok_or_else(|| {
                    EngineError::MissingScope("no cooperative is linked to this account".to_string())
                }),
            ShareRole::Leader => leaders::Entity::find()
                .filter(leaders::Column::UserId.eq(user.id))
                .one(db)
                .await?
                .map(|leader| AllocationScope::Cooperative(leader.cooperative_id))
                .ok_or_else(|| {
                    EngineError::MissingScope("leader is not assigned to a cooperative".to_string())
                }),
            ShareRole::ParentOrganization => parent_organizations::Entity::find()
                .filter(parent_organizations::Column::UserId.eq(user.id))
                .one(db)
                .await?
                .map(|org| AllocationScope::ParentOrganization(org.id))
                .ok_or_else(|| {
                    EngineError::MissingScope(
                        "no parent organization is linked to this account".to_string(),
                    )
                }),
        }
    }

    /// The scope whose fees feed `user_id`'s `share_role` allocation.
    pub async fn resolve_scope(
        &self,
        user_id: Uuid,
        share_role: ShareRole,
    ) -> ResultEngine<AllocationScope> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            self.resolve_scope_in(&db_tx, &user, share_role).await
        })
    }

    /// Return a user by id.
    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        with_tx!(self, |db_tx| self.require_user(&db_tx, user_id).await)
    }

    /// Let a super admin act as `target_id`. Returns the target and records
    /// the start of the session in the audit log.
    pub async fn start_impersonation(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<User> {
        if actor_id == target_id {
            return Err(EngineError::InvalidInput(
                "cannot impersonate yourself".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, actor_id, &[Role::SuperAdmin])
                .await?;
            let target = self.require_user(&db_tx, target_id).await?;
            audit_log::ActiveModel::record(
                actor_id,
                AuditAction::ImpersonationStarted,
                format!("user:{} role:{}", target.id, target.role),
                now,
            )
            .insert(&db_tx)
            .await?;
            tracing::info!(%actor_id, target_id = %target.id, role = %target.role, "impersonation started");
            Ok(target)
        })
    }

    /// Re-check a delegation on every request: the actor must still be a super
    /// admin and the target must still hold `target_role`.
    pub async fn impersonation_target(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        target_role: Role,
    ) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, actor_id, &[Role::SuperAdmin])
                .await?;
            let target = self.require_user(&db_tx, target_id).await?;
            if target.role != target_role {
                return Err(EngineError::Forbidden(
                    "impersonated user no longer holds the delegated role".to_string(),
                ));
            }
            Ok(target)
        })
    }
}
