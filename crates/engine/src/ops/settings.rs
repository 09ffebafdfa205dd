use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, TransactionTrait, prelude::*, sea_query::OnConflict};
use uuid::Uuid;

use crate::{AuditAction, ResultEngine, Role, Setting, SettingKey, audit_log, settings};

use super::{Engine, with_tx};

impl Engine {
    /// Every known setting with its effective value.
    pub async fn list_settings(&self) -> ResultEngine<Vec<Setting>> {
        with_tx!(self, |db_tx| {
            let rows = settings::Entity::find().all(&db_tx).await?;
            Ok(SettingKey::ALL
                .into_iter()
                .map(|key| {
                    if let Some(provider) = &self.settings_override {
                        return Setting {
                            key: key.as_str().to_string(),
                            value: provider.get(key.as_str()).unwrap_or_else(|| key.default_value()),
                            stored: false,
                            updated_at: None,
                        };
                    }
                    match rows.iter().find(|row| row.key == key.as_str()) {
                        Some(row) => Setting {
                            key: row.key.clone(),
                            value: row.value.clone(),
                            stored: true,
                            updated_at: Some(row.updated_at),
                        },
                        None => Setting {
                            key: key.as_str().to_string(),
                            value: key.default_value(),
                            stored: false,
                            updated_at: None,
                        },
                    }
                })
                .collect())
        })
    }

    /// Store a validated value for `key`. Super admin only.
    pub async fn update_setting(
        &self,
        actor_id: Uuid,
        key: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Setting> {
        let key = SettingKey::try_from(key)?;
        let value = key.validate(value)?;
        with_tx!(self, |db_tx| {
            self.require_role(&db_tx, actor_id, &[Role::SuperAdmin])
                .await?;
            settings::Entity::insert(settings::ActiveModel {
                key: ActiveValue::Set(key.as_str().to_string()),
                value: ActiveValue::Set(value.clone()),
                updated_at: ActiveValue::Set(now),
            })
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&db_tx)
            .await?;
            audit_log::ActiveModel::record(
                actor_id,
                AuditAction::SettingUpdated,
                format!("{}={value}", key.as_str()),
                now,
            )
            .insert(&db_tx)
            .await?;
            tracing::info!(key = key.as_str(), %value, "setting updated");
            Ok(Setting {
                key: key.as_str().to_string(),
                value,
                stored: true,
                updated_at: Some(now),
            })
        })
    }
}
