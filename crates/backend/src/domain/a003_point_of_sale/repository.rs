use chrono::Utc;
use contracts::domain::a003_point_of_sale::aggregate::PointOfSale;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "point_of_sale")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub name: String,
    pub matricula_id: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for PointOfSale {
    fn from(m: Model) -> Self {
        PointOfSale {
            id: m.id,
            name: m.name,
            matricula_id: m.matricula_id,
            created_at: m.created_at,
        }
    }
}

pub async fn get_by_id<C: ConnectionTrait>(db: &C, id: i32) -> anyhow::Result<Option<PointOfSale>> {
    let result = Entity::find_by_id(id).one(db).await?;
    Ok(result.map(Into::into))
}

/// Вставка PV с идентификатором из файла
pub async fn insert<C: ConnectionTrait>(db: &C, id: i32, name: &str) -> anyhow::Result<PointOfSale> {
    let now = Utc::now();
    let active = ActiveModel {
        id: Set(id),
        name: Set(name.trim().to_string()),
        matricula_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let model = active.insert(db).await?;
    Ok(model.into())
}
