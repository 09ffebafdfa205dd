use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An umbrella body grouping several cooperatives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentOrganization {
    pub id: Uuid,
    pub name: String,
    /// The `PARENT_ORGANIZATION` account that manages this organization.
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "parent_organizations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(unique)]
    pub user_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ParentOrganization> for ActiveModel {
    fn from(org: &ParentOrganization) -> Self {
        Self {
            id: ActiveValue::Set(org.id),
            name: ActiveValue::Set(org.name.clone()),
            user_id: ActiveValue::Set(org.user_id),
            created_at: ActiveValue::Set(org.created_at),
        }
    }
}

impl From<Model> for ParentOrganization {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            user_id: model.user_id,
            created_at: model.created_at,
        }
    }
}
