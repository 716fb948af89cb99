use chrono::Utc;
use contracts::domain::a006_contract_metadata::aggregate::ContractMetadata;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contract_metadata")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub value: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ContractMetadata {
    fn from(m: Model) -> Self {
        ContractMetadata {
            id: m.id,
            name: m.name,
            value: m.value,
        }
    }
}

pub async fn find<C: ConnectionTrait>(
    db: &C,
    name: &str,
    value: &str,
) -> anyhow::Result<Option<ContractMetadata>> {
    let result = Entity::find()
        .filter(Column::Name.eq(name))
        .filter(Column::Value.eq(value))
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

/// Возвращает существующую запись (name, value) или создаёт новую
pub async fn get_or_create<C: ConnectionTrait>(
    db: &C,
    name: &str,
    value: &str,
) -> anyhow::Result<ContractMetadata> {
    let value = value.trim();
    if let Some(existing) = find(db, name, value).await? {
        return Ok(existing);
    }
    let active = ActiveModel {
        name: Set(name.to_string()),
        value: Set(value.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let model = active.insert(db).await?;
    tracing::debug!("Created contract metadata {}={}", name, value);
    Ok(model.into())
}
