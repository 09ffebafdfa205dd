//! Withdrawal requests against a role's registration-fee allocation.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Kobo, ShareRole};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl TryFrom<&str> for WithdrawalStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(EngineError::InvalidInput(format!(
                "invalid withdrawal status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub share_role: ShareRole,
    pub amount: Kobo,
    pub reason: String,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
}

impl Withdrawal {
    pub(crate) fn pending(
        user_id: Uuid,
        share_role: ShareRole,
        amount: Kobo,
        reason: String,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            share_role,
            amount,
            reason,
            status: WithdrawalStatus::Pending,
            requested_at,
            processed_at: None,
            processed_by: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub share_role: String,
    pub amount: i64,
    pub reason: String,
    pub status: String,
    pub requested_at: DateTimeUtc,
    pub processed_at: Option<DateTimeUtc>,
    pub processed_by: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Withdrawal> for ActiveModel {
    fn from(withdrawal: &Withdrawal) -> Self {
        Self {
            id: ActiveValue::Set(withdrawal.id),
            user_id: ActiveValue::Set(withdrawal.user_id),
            share_role: ActiveValue::Set(withdrawal.share_role.as_str().to_string()),
            amount: ActiveValue::Set(withdrawal.amount.kobo()),
            reason: ActiveValue::Set(withdrawal.reason.clone()),
            status: ActiveValue::Set(withdrawal.status.as_str().to_string()),
            requested_at: ActiveValue::Set(withdrawal.requested_at),
            processed_at: ActiveValue::Set(withdrawal.processed_at),
            processed_by: ActiveValue::Set(withdrawal.processed_by),
        }
    }
}

impl TryFrom<Model> for Withdrawal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            share_role: ShareRole::try_from(model.share_role.as_str())?,
            amount: Kobo::new(model.amount),
            reason: model.reason,
            status: WithdrawalStatus::try_from(model.status.as_str())?,
            requested_at: model.requested_at,
            processed_at: model.processed_at,
            processed_by: model.processed_by,
        })
    }
}
