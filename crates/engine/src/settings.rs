//! Key-value configuration rows and the provider abstraction used to read
//! them.
//!
//! Allocation code never queries the `settings` table directly: it asks a
//! [`SettingsProvider`]. The engine builds a [`SettingsSnapshot`] from the
//! table inside each request's transaction unless an override provider was
//! injected through the builder.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{AllocationRates, EngineError, Kobo, Percentage, ResultEngine, ShareRole};

pub const MEMBER_CARVE_OUT_KEY: &str = "super_admin_member_registration_allocation";
pub const COOPERATIVE_CARVE_OUT_KEY: &str = "super_admin_cooperative_registration_allocation";

/// Fallback carve-outs, in naira.
const DEFAULT_MEMBER_CARVE_OUT_NAIRA: i64 = 500;
const DEFAULT_COOPERATIVE_CARVE_OUT_NAIRA: i64 = 5_000;

/// Read-only lookup of configuration values.
pub trait SettingsProvider: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
}

/// Settings captured at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsSnapshot(HashMap<String, String>);

impl SettingsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub(crate) async fn load<C: ConnectionTrait>(db: &C) -> ResultEngine<Self> {
        let rows = Entity::find().all(db).await?;
        Ok(Self(rows.into_iter().map(|row| (row.key, row.value)).collect()))
    }
}

impl SettingsProvider for SettingsSnapshot {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

impl FromIterator<(String, String)> for SettingsSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The settings the engine knows how to interpret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingKey {
    MemberCarveOut,
    CooperativeCarveOut,
    Share(ShareRole),
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::MemberCarveOut,
        SettingKey::CooperativeCarveOut,
        SettingKey::Share(ShareRole::Cooperative),
        SettingKey::Share(ShareRole::Leader),
        SettingKey::Share(ShareRole::ParentOrganization),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MemberCarveOut => MEMBER_CARVE_OUT_KEY,
            Self::CooperativeCarveOut => COOPERATIVE_CARVE_OUT_KEY,
            Self::Share(role) => role.setting_key(),
        }
    }

    pub fn default_value(self) -> String {
        match self {
            Self::MemberCarveOut => DEFAULT_MEMBER_CARVE_OUT_NAIRA.to_string(),
            Self::CooperativeCarveOut => DEFAULT_COOPERATIVE_CARVE_OUT_NAIRA.to_string(),
            Self::Share(role) => {
                let bp = role.default_percentage().basis_points();
                if bp % 100 == 0 {
                    (bp / 100).to_string()
                } else {
                    format!("{}.{:02}", bp / 100, bp % 100)
                }
            }
        }
    }

    /// Checks that `value` parses for this key and returns it trimmed.
    pub fn validate(self, value: &str) -> ResultEngine<String> {
        let value = value.trim();
        match self {
            Self::MemberCarveOut | Self::CooperativeCarveOut => {
                let amount: Kobo = value.parse().map_err(|err| {
                    EngineError::InvalidSetting(format!("{}: {err}", self.as_str()))
                })?;
                if amount.is_negative() {
                    return Err(EngineError::InvalidSetting(format!(
                        "{}: carve-out must not be negative",
                        self.as_str()
                    )));
                }
            }
            Self::Share(_) => {
                value.parse::<Percentage>()?;
            }
        }
        Ok(value.to_string())
    }
}

impl TryFrom<&str> for SettingKey {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| EngineError::InvalidSetting(format!("unknown setting: {value}")))
    }
}

fn carve_out(provider: &dyn SettingsProvider, key: &str, default_naira: i64) -> Kobo {
    let default = Kobo::new(default_naira * 100);
    match provider.get(key) {
        None => default,
        Some(raw) => match raw.parse::<Kobo>() {
            Ok(amount) if !amount.is_negative() => amount,
            _ => {
                tracing::warn!(key, value = %raw, "unreadable carve-out setting, using default");
                default
            }
        },
    }
}

fn share(provider: &dyn SettingsProvider, role: ShareRole) -> Percentage {
    let key = role.setting_key();
    match provider.get(key) {
        None => role.default_percentage(),
        Some(raw) => raw.parse::<Percentage>().unwrap_or_else(|err| {
            tracing::warn!(key, value = %raw, "unreadable share setting, using default: {err}");
            role.default_percentage()
        }),
    }
}

impl AllocationRates {
    /// Reads carve-outs and the share for `role`, falling back to the
    /// hardcoded defaults for anything missing or malformed.
    pub fn from_provider(provider: &dyn SettingsProvider, role: ShareRole) -> Self {
        Self {
            member_carve_out: carve_out(provider, MEMBER_CARVE_OUT_KEY, DEFAULT_MEMBER_CARVE_OUT_NAIRA),
            cooperative_carve_out: carve_out(
                provider,
                COOPERATIVE_CARVE_OUT_KEY,
                DEFAULT_COOPERATIVE_CARVE_OUT_NAIRA,
            ),
            share: share(provider, role),
        }
    }
}

/// A configuration row as exposed to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    /// `false` when the value is the built-in default rather than a stored row.
    pub stored: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub value: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
