//! Cooperatives and their parent organizations.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooperative {
    pub id: Uuid,
    pub name: String,
    /// CAC registration number, when known.
    pub registration_number: Option<String>,
    pub parent_organization_id: Option<Uuid>,
    /// The `COOPERATIVE` account that manages this cooperative.
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cooperatives")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub registration_number: Option<String>,
    pub parent_organization_id: Option<Uuid>,
    #[sea_orm(unique)]
    pub user_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::parent_organizations::Entity",
        from = "Column::ParentOrganizationId",
        to = "super::parent_organizations::Column::Id"
    )]
    ParentOrganization,
}

impl Related<super::parent_organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ParentOrganization.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Cooperative> for ActiveModel {
    fn from(coop: &Cooperative) -> Self {
        Self {
            id: ActiveValue::Set(coop.id),
            name: ActiveValue::Set(coop.name.clone()),
            registration_number: ActiveValue::Set(coop.registration_number.clone()),
            parent_organization_id: ActiveValue::Set(coop.parent_organization_id),
            user_id: ActiveValue::Set(coop.user_id),
            created_at: ActiveValue::Set(coop.created_at),
        }
    }
}

impl From<Model> for Cooperative {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            registration_number: model.registration_number,
            parent_organization_id: model.parent_organization_id,
            user_id: model.user_id,
            created_at: model.created_at,
        }
    }
}
