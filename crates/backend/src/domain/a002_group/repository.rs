use chrono::Utc;
use contracts::domain::a002_group::aggregate::Group;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub import_session_id: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Group {
    fn from(m: Model) -> Self {
        Group {
            id: m.id,
            name: m.name,
            description: m.description,
            is_active: m.is_active,
            import_session_id: m.import_session_id,
            created_at: m.created_at,
        }
    }
}

pub async fn get_active_by_id<C: ConnectionTrait>(db: &C, id: i32) -> anyhow::Result<Option<Group>> {
    let result = Entity::find_by_id(id)
        .filter(Column::IsActive.eq(true))
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

/// Поиск активной группы по имени без учёта регистра
pub async fn find_active_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> anyhow::Result<Option<Group>> {
    let result = Entity::find()
        .filter(
            Expr::expr(Func::lower(Expr::col(Column::Name)))
                .eq(name.trim().to_lowercase()),
        )
        .filter(Column::IsActive.eq(true))
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    name: &str,
    import_session_id: Option<i32>,
) -> anyhow::Result<Group> {
    let now = Utc::now();
    let active = ActiveModel {
        name: Set(name.trim().to_string()),
        description: Set(Some("Created by import".to_string())),
        is_active: Set(true),
        import_session_id: Set(import_session_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = active.insert(db).await?;
    Ok(model.into())
}

pub async fn list_by_import_session<C: ConnectionTrait>(
    db: &C,
    session_id: i32,
) -> anyhow::Result<Vec<Group>> {
    let items = Entity::find()
        .filter(Column::ImportSessionId.eq(session_id))
        .all(db)
        .await?;
    Ok(items.into_iter().map(Into::into).collect())
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> anyhow::Result<bool> {
    let result = Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}
