//! Payment transactions.
//!
//! Only `FEE` rows whose reference starts with `REG_` and whose status is
//! `SUCCESSFUL` count as registration fees for allocations.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Kobo, RegistrationFee, RegistrationKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Successful,
    Pending,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Successful => "SUCCESSFUL",
            Self::Pending => "PENDING",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "SUCCESSFUL" => Ok(Self::Successful),
            "PENDING" => Ok(Self::Pending),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Fee,
    Contribution,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fee => "FEE",
            Self::Contribution => "CONTRIBUTION",
            Self::Withdrawal => "WITHDRAWAL",
        }
    }
}

impl TryFrom<&str> for TransactionType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "FEE" => Ok(Self::Fee),
            "CONTRIBUTION" => Ok(Self::Contribution),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Kobo,
    pub status: TransactionStatus,
    pub kind: TransactionType,
    pub reference: String,
    pub description: Option<String>,
    pub registration_kind: Option<RegistrationKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Classification used by allocations: the explicit column when present,
    /// the description markers otherwise.
    pub fn resolved_registration_kind(&self) -> Option<RegistrationKind> {
        self.registration_kind.or_else(|| {
            self.description
                .as_deref()
                .and_then(RegistrationKind::from_description)
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub status: String,
    pub kind: String,
    #[sea_orm(unique)]
    pub reference: String,
    pub description: Option<String>,
    pub registration_kind: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id),
            user_id: ActiveValue::Set(tx.user_id),
            amount: ActiveValue::Set(tx.amount.kobo()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            reference: ActiveValue::Set(tx.reference.clone()),
            description: ActiveValue::Set(tx.description.clone()),
            registration_kind: ActiveValue::Set(
                tx.registration_kind.map(|kind| kind.as_str().to_string()),
            ),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        // Unknown kinds in old rows fall back to the description markers.
        let registration_kind = model
            .registration_kind
            .as_deref()
            .and_then(|kind| RegistrationKind::try_from(kind).ok());
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            amount: Kobo::new(model.amount),
            status: TransactionStatus::try_from(model.status.as_str())?,
            kind: TransactionType::try_from(model.kind.as_str())?,
            reference: model.reference,
            description: model.description,
            registration_kind,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Transaction> for RegistrationFee {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            reference: tx.reference.clone(),
            amount: tx.amount,
            kind: tx.resolved_registration_kind(),
            description: tx.description.clone(),
            created_at: tx.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(registration_kind: Option<&str>, description: Option<&str>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: 200_000,
            status: "SUCCESSFUL".to_string(),
            kind: "FEE".to_string(),
            reference: "REG_abc".to_string(),
            description: description.map(str::to_string),
            registration_kind: registration_kind.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn explicit_kind_wins_over_description() {
        let tx = Transaction::try_from(model(
            Some("cooperative"),
            Some("Member registration fee"),
        ))
        .unwrap();
        assert_eq!(
            tx.resolved_registration_kind(),
            Some(RegistrationKind::Cooperative)
        );
    }

    #[test]
    fn legacy_rows_use_description() {
        let tx = Transaction::try_from(model(None, Some("Member registration fee"))).unwrap();
        assert_eq!(tx.resolved_registration_kind(), Some(RegistrationKind::Member));

        let tx = Transaction::try_from(model(Some("bogus"), None)).unwrap();
        assert_eq!(tx.resolved_registration_kind(), None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut bad = model(None, None);
        bad.status = "DONE".to_string();
        assert!(Transaction::try_from(bad).is_err());
    }
}
