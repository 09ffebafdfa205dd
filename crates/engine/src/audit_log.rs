use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Security-relevant actions kept for review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ImpersonationStarted,
    WithdrawalApproved,
    WithdrawalRejected,
    SettingUpdated,
    PasswordReset,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ImpersonationStarted => "impersonation_started",
            Self::WithdrawalApproved => "withdrawal_approved",
            Self::WithdrawalRejected => "withdrawal_rejected",
            Self::SettingUpdated => "setting_updated",
            Self::PasswordReset => "password_reset",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub subject: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn record(
        actor_id: Uuid,
        action: AuditAction,
        subject: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActiveValue::Set(Uuid::new_v4()),
            actor_id: ActiveValue::Set(actor_id),
            action: ActiveValue::Set(action.as_str().to_string()),
            subject: ActiveValue::Set(subject.into()),
            created_at: ActiveValue::Set(at),
        }
    }
}

impl From<Model> for AuditEntry {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            actor_id: model.actor_id,
            action: model.action,
            subject: model.subject,
            created_at: model.created_at,
        }
    }
}
