use chrono::Utc;
use contracts::domain::a001_user::aggregate::{User, UserRole};
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub surname: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub parent_user_id: Option<String>,
    pub is_active: bool,
    pub import_session_id: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(m: Model) -> Self {
        User {
            id: m.id,
            name: m.name,
            surname: m.surname,
            email: m.email,
            role: UserRole::parse(&m.role).unwrap_or_default(),
            parent_user_id: m.parent_user_id,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Новый пользователь из строки импорта
pub struct NewUser {
    pub name: String,
    pub surname: Option<String>,
    pub email: String,
    pub role: UserRole,
    pub parent_user_id: Option<String>,
    pub password_hash: String,
    pub import_session_id: Option<i32>,
}

/// Поиск по email без учёта регистра (колонка объявлена COLLATE NOCASE)
pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> anyhow::Result<Option<User>> {
    let result = Entity::find()
        .filter(Column::Email.eq(email.trim()))
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}

pub async fn find_active_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> anyhow::Result<Option<User>> {
    Ok(find_by_email(db, email).await?.filter(|u| u.is_active))
}

pub async fn email_exists<C: ConnectionTrait>(db: &C, email: &str) -> anyhow::Result<bool> {
    Ok(find_by_email(db, email).await?.is_some())
}

pub async fn insert<C: ConnectionTrait>(db: &C, user: NewUser) -> anyhow::Result<User> {
    let now = Utc::now();
    let active = ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        name: Set(user.name),
        surname: Set(user.surname),
        email: Set(user.email.trim().to_string()),
        password_hash: Set(user.password_hash),
        role: Set(user.role.as_str().to_string()),
        parent_user_id: Set(user.parent_user_id),
        is_active: Set(true),
        import_session_id: Set(user.import_session_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let model = active.insert(db).await?;
    Ok(model.into())
}

/// Деактивирует пользователей, созданных сессией импорта
pub async fn deactivate_by_import_session<C: ConnectionTrait>(
    db: &C,
    session_id: i32,
) -> anyhow::Result<u64> {
    let result = Entity::update_many()
        .col_expr(Column::IsActive, Expr::value(false))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::ImportSessionId.eq(session_id))
        .filter(Column::IsActive.eq(true))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
