use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Kobo, REGISTRATION_REFERENCE_PREFIX, RegistrationKind, ResultEngine, Transaction,
    TransactionStatus, TransactionType, transactions,
};

use super::{Engine, with_tx};

/// What a payment provider reported for a reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayVerification {
    pub reference: String,
    pub paid: bool,
    /// Amount the provider collected.
    pub amount: Kobo,
}

impl Engine {
    /// Open a registration-fee payment. The returned reference is handed to
    /// the payment provider checkout.
    pub async fn start_registration_payment(
        &self,
        user_id: Uuid,
        kind: RegistrationKind,
        amount: Kobo,
    ) -> ResultEngine<Transaction> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            if user.role != kind.payer_role() {
                return Err(EngineError::Forbidden(format!(
                    "{} registration is paid by role {}",
                    kind.as_str(),
                    kind.payer_role()
                )));
            }

            let now = Utc::now();
            let tx = Transaction {
                id: Uuid::new_v4(),
                user_id,
                amount,
                status: TransactionStatus::Pending,
                kind: TransactionType::Fee,
                reference: format!("{REGISTRATION_REFERENCE_PREFIX}{}", Uuid::new_v4().simple()),
                description: Some(kind.fee_description().to_string()),
                registration_kind: Some(kind),
                created_at: now,
                updated_at: now,
            };
            let model: transactions::ActiveModel = (&tx).into();
            model.insert(&db_tx).await.map_err(EngineError::from_insert)?;
            tracing::info!(reference = %tx.reference, %user_id, amount = amount.kobo(), "payment started");
            Ok(tx)
        })
    }

    /// Apply a provider verification to the matching pending transaction.
    ///
    /// A paid verification with the expected amount settles the row as
    /// `SUCCESSFUL`; anything else marks it `FAILED`. Rows that are no longer
    /// pending are returned unchanged.
    pub async fn settle_payment(&self, verification: &GatewayVerification) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find()
                .filter(transactions::Column::Reference.eq(verification.reference.clone()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
            let mut tx = Transaction::try_from(model)?;
            if tx.status != TransactionStatus::Pending {
                return Ok(tx);
            }

            let status = if verification.paid && verification.amount == tx.amount {
                TransactionStatus::Successful
            } else {
                if verification.paid {
                    tracing::warn!(
                        reference = %tx.reference,
                        expected = tx.amount.kobo(),
                        received = verification.amount.kobo(),
                        "payment amount mismatch"
                    );
                }
                TransactionStatus::Failed
            };
            let now = Utc::now();
            transactions::ActiveModel {
                id: ActiveValue::Unchanged(tx.id),
                status: ActiveValue::Set(status.as_str().to_string()),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            tx.status = status;
            tx.updated_at = now;
            tracing::info!(reference = %tx.reference, status = status.as_str(), "payment settled");
            Ok(tx)
        })
    }

    pub async fn transaction_by_reference(&self, reference: &str) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find()
                .filter(transactions::Column::Reference.eq(reference.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
            Transaction::try_from(model)
        })
    }
}
