//! User accounts.
//!
//! Members, cooperative accounts and leaders point at their cooperative via
//! `cooperative_id`; that column is what scopes registration-fee queries.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Role};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub nin: Option<String>,
    pub role: Role,
    pub cooperative_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub phone: Option<String>,
    #[sea_orm(unique)]
    pub nin: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub cooperative_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cooperatives::Entity",
        from = "Column::CooperativeId",
        to = "super::cooperatives::Column::Id"
    )]
    Cooperative,
}

impl Related<super::cooperatives::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cooperative.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl User {
    pub(crate) fn active_model(&self, password_hash: String) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id),
            name: ActiveValue::Set(self.name.clone()),
            email: ActiveValue::Set(self.email.clone()),
            phone: ActiveValue::Set(self.phone.clone()),
            nin: ActiveValue::Set(self.nin.clone()),
            password_hash: ActiveValue::Set(password_hash),
            role: ActiveValue::Set(self.role.as_str().to_string()),
            cooperative_id: ActiveValue::Set(self.cooperative_id),
            created_at: ActiveValue::Set(self.created_at),
        }
    }
}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            nin: model.nin,
            role: Role::try_from(model.role.as_str())?,
            cooperative_id: model.cooperative_id,
            created_at: model.created_at,
        })
    }
}
