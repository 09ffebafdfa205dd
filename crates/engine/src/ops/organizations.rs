use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Cooperative, EngineError, ParentOrganization, ResultEngine, Role, commands::CreateCooperativeCmd,
    cooperatives, leaders, parent_organizations, users,
    util::{display_name, optional_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Check that `user_id` exists and holds `role`.
    async fn require_account(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
        role: Role,
    ) -> ResultEngine<()> {
        let user = self.require_user(db, user_id).await?;
        if user.role != role {
            return Err(EngineError::InvalidRole(format!(
                "account must have role {role}, found {}",
                user.role
            )));
        }
        Ok(())
    }

    async fn set_user_cooperative(
        &self,
        db: &DatabaseTransaction,
        user_id: Uuid,
        cooperative_id: Uuid,
    ) -> ResultEngine<()> {
        users::ActiveModel {
            id: ActiveValue::Unchanged(user_id),
            cooperative_id: ActiveValue::Set(Some(cooperative_id)),
            ..Default::default()
        }
        .update(db)
        .await?;
        Ok(())
    }

    pub async fn create_parent_organization(
        &self,
        name: &str,
        account_user_id: Option<Uuid>,
    ) -> ResultEngine<ParentOrganization> {
        let org = ParentOrganization {
            id: Uuid::new_v4(),
            name: display_name(name, "parent organization name")?,
            user_id: account_user_id,
            created_at: Utc::now(),
        };
        with_tx!(self, |db_tx| {
            if let Some(user_id) = account_user_id {
                self.require_account(&db_tx, user_id, Role::ParentOrganization)
                    .await?;
            }
            let model: parent_organizations::ActiveModel = (&org).into();
            model.insert(&db_tx).await.map_err(EngineError::from_insert)?;
            Ok(org)
        })
    }

    /// Create a cooperative. The account user, when given, is attached to it
    /// so its own registration fee lands in the cooperative's scope.
    pub async fn create_cooperative(&self, cmd: CreateCooperativeCmd) -> ResultEngine<Cooperative> {
        let coop = Cooperative {
            id: Uuid::new_v4(),
            name: display_name(&cmd.name, "cooperative name")?,
            registration_number: optional_text(cmd.registration_number.as_deref()),
            parent_organization_id: cmd.parent_organization_id,
            user_id: cmd.account_user_id,
            created_at: Utc::now(),
        };
        with_tx!(self, |db_tx| {
            if let Some(parent_id) = coop.parent_organization_id
                && parent_organizations::Entity::find_by_id(parent_id)
                    .one(&db_tx)
                    .await?
                    .is_none()
            {
                return Err(EngineError::KeyNotFound(
                    "parent organization not exists".to_string(),
                ));
            }
            if let Some(user_id) = coop.user_id {
                self.require_account(&db_tx, user_id, Role::Cooperative)
                    .await?;
            }

            let model: cooperatives::ActiveModel = (&coop).into();
            model.insert(&db_tx).await.map_err(EngineError::from_insert)?;
            if let Some(user_id) = coop.user_id {
                self.set_user_cooperative(&db_tx, user_id, coop.id).await?;
            }
            tracing::info!(cooperative_id = %coop.id, name = %coop.name, "cooperative created");
            Ok(coop)
        })
    }

    /// Attach a `LEADER` account to a cooperative, replacing any previous
    /// assignment.
    pub async fn assign_leader(&self, user_id: Uuid, cooperative_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, user_id, Role::Leader).await?;
            if cooperatives::Entity::find_by_id(cooperative_id)
                .one(&db_tx)
                .await?
                .is_none()
            {
                return Err(EngineError::KeyNotFound("cooperative not exists".to_string()));
            }

            leaders::Entity::delete_many()
                .filter(leaders::Column::UserId.eq(user_id))
                .exec(&db_tx)
                .await?;
            leaders::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(user_id),
                cooperative_id: ActiveValue::Set(cooperative_id),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            self.set_user_cooperative(&db_tx, user_id, cooperative_id)
                .await?;
            Ok(())
        })
    }

    pub async fn cooperative(&self, cooperative_id: Uuid) -> ResultEngine<Cooperative> {
        with_tx!(self, |db_tx| {
            cooperatives::Entity::find_by_id(cooperative_id)
                .one(&db_tx)
                .await?
                .map(Cooperative::from)
                .ok_or_else(|| EngineError::KeyNotFound("cooperative not exists".to_string()))
        })
    }

    pub async fn list_cooperatives(
        &self,
        parent_organization_id: Option<Uuid>,
    ) -> ResultEngine<Vec<Cooperative>> {
        with_tx!(self, |db_tx| {
            let mut query = cooperatives::Entity::find();
            if let Some(parent_id) = parent_organization_id {
                query = query.filter(cooperatives::Column::ParentOrganizationId.eq(parent_id));
            }
            let models = query
                .order_by_asc(cooperatives::Column::Name)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(Cooperative::from).collect())
        })
    }
}
