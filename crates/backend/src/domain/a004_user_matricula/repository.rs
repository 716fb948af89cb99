use chrono::Utc;
use contracts::domain::a004_user_matricula::aggregate::{MatriculaStatus, UserMatricula};
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_matriculas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub matricula_number: String,
    pub start_date: chrono::DateTime<chrono::Utc>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
    pub is_active: bool,
    pub status: String,
    pub is_owner: bool,
    pub import_session_id: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for UserMatricula {
    fn from(m: Model) -> Self {
        UserMatricula {
            id: m.id,
            user_id: m.user_id,
            matricula_number: m.matricula_number,
            start_date: m.start_date,
            end_date: m.end_date,
            is_active: m.is_active,
            status: MatriculaStatus::parse(&m.status).unwrap_or_default(),
            is_owner: m.is_owner,
            import_session_id: m.import_session_id,
        }
    }
}

/// Активная матрикула по номеру; при нескольких записях приоритет у владельца
pub async fn find_active_by_number<C: ConnectionTrait>(
    db: &C,
    number: &str,
) -> anyhow::Result<Option<UserMatricula>> {
    let result = Entity::find()
        .filter(Column::MatriculaNumber.eq(number.trim()))
        .filter(Column::IsActive.eq(true))
        .order_by_desc(Column::IsOwner)
        .order_by_asc(Column::Id)
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

pub async fn find_active_owner<C: ConnectionTrait>(
    db: &C,
    number: &str,
) -> anyhow::Result<Option<UserMatricula>> {
    let result = Entity::find()
        .filter(Column::MatriculaNumber.eq(number.trim()))
        .filter(Column::IsActive.eq(true))
        .filter(Column::IsOwner.eq(true))
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    number: &str,
    is_owner: bool,
    import_session_id: Option<i32>,
) -> anyhow::Result<UserMatricula> {
    let now = Utc::now();
    let active = ActiveModel {
        user_id: Set(user_id.to_string()),
        matricula_number: Set(number.trim().to_string()),
        start_date: Set(now),
        end_date: Set(None),
        is_active: Set(true),
        status: Set(MatriculaStatus::Active.as_str().to_string()),
        is_owner: Set(is_owner),
        import_session_id: Set(import_session_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = active.insert(db).await?;
    Ok(model.into())
}

pub async fn ids_by_import_session<C: ConnectionTrait>(
    db: &C,
    session_id: i32,
) -> anyhow::Result<Vec<i32>> {
    let items = Entity::find()
        .filter(Column::ImportSessionId.eq(session_id))
        .all(db)
        .await?;
    Ok(items.into_iter().map(|m| m.id).collect())
}

pub async fn delete_by_import_session<C: ConnectionTrait>(
    db: &C,
    session_id: i32,
) -> anyhow::Result<u64> {
    let result = Entity::delete_many()
        .filter(Column::ImportSessionId.eq(session_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
