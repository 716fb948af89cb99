use chrono::Utc;
use contracts::domain::a005_contract::aggregate::{Contract, ContractDraft};
use contracts::domain::a005_contract::status::{ContractStatus, ContractType};
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contracts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub contract_number: String,
    pub user_id: Option<String>,
    pub total_amount: f64,
    pub group_id: Option<i32>,
    pub status: String,
    pub sale_start_date: chrono::DateTime<chrono::Utc>,
    pub sale_end_date: Option<chrono::DateTime<chrono::Utc>>,
    pub is_active: bool,
    pub upload_id: Option<String>,
    pub pv_id: Option<i32>,
    pub customer_name: Option<String>,
    pub contract_type: Option<i32>,
    pub quota: Option<String>,
    pub matricula_id: Option<i32>,
    pub category_id: Option<i32>,
    pub plano_venda_id: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Contract {
    fn from(m: Model) -> Self {
        Contract {
            id: m.id,
            contract_number: m.contract_number,
            user_id: m.user_id,
            total_amount: m.total_amount,
            group_id: m.group_id,
            status: ContractStatus::from_db(&m.status),
            sale_start_date: m.sale_start_date,
            sale_end_date: m.sale_end_date,
            is_active: m.is_active,
            upload_id: m.upload_id,
            pv_id: m.pv_id,
            customer_name: m.customer_name,
            contract_type: m.contract_type.and_then(ContractType::from_code),
            quota: m.quota,
            matricula_id: m.matricula_id,
            category_id: m.category_id,
            plano_venda_id: m.plano_venda_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Результат upsert по номеру контракта
pub enum UpsertOutcome {
    Created(Contract),
    Updated(Contract),
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn find_by_number(contract_number: &str) -> anyhow::Result<Option<Contract>> {
    let result = Entity::find()
        .filter(Column::ContractNumber.eq(contract_number.trim()))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

/// Вставка или обновление по натуральному ключу `contract_number`.
/// upload_id выставляется только при создании.
pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    draft: &ContractDraft,
    upload_id: &str,
) -> anyhow::Result<UpsertOutcome> {
    let now = Utc::now();
    let existing = Entity::find()
        .filter(Column::ContractNumber.eq(draft.contract_number.trim()))
        .one(db)
        .await?;

    match existing {
        Some(model) => {
            let mut active: ActiveModel = model.into();
            active.user_id = Set(draft.user_id.clone());
            active.total_amount = Set(draft.total_amount);
            active.group_id = Set(draft.group_id);
            active.status = Set(draft.status.as_str().to_string());
            if let Some(start) = draft.sale_start_date {
                active.sale_start_date = Set(start);
            }
            active.sale_end_date = Set(draft.sale_end_date);
            active.is_active = Set(true);
            active.pv_id = Set(draft.pv_id);
            active.customer_name = Set(draft.customer_name.clone());
            active.contract_type = Set(draft.contract_type.map(|t| t.code()));
            active.quota = Set(draft.quota.clone());
            active.matricula_id = Set(draft.matricula_id);
            active.category_id = Set(draft.category_id);
            active.plano_venda_id = Set(draft.plano_venda_id);
            active.updated_at = Set(now);
            let model = active.update(db).await?;
            Ok(UpsertOutcome::Updated(model.into()))
        }
        None => {
            let active = ActiveModel {
                contract_number: Set(draft.contract_number.trim().to_string()),
                user_id: Set(draft.user_id.clone()),
                total_amount: Set(draft.total_amount),
                group_id: Set(draft.group_id),
                status: Set(draft.status.as_str().to_string()),
                sale_start_date: Set(draft.sale_start_date.unwrap_or(now)),
                sale_end_date: Set(draft.sale_end_date),
                is_active: Set(true),
                upload_id: Set(Some(upload_id.to_string())),
                pv_id: Set(draft.pv_id),
                customer_name: Set(draft.customer_name.clone()),
                contract_type: Set(draft.contract_type.map(|t| t.code())),
                quota: Set(draft.quota.clone()),
                matricula_id: Set(draft.matricula_id),
                category_id: Set(draft.category_id),
                plano_venda_id: Set(draft.plano_venda_id),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            let model = active.insert(db).await?;
            Ok(UpsertOutcome::Created(model.into()))
        }
    }
}

/// Мягкая деактивация всех контрактов загрузки
pub async fn deactivate_by_upload_id(upload_id: &str) -> anyhow::Result<u64> {
    let result = Entity::update_many()
        .col_expr(Column::IsActive, Expr::value(false))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::UploadId.eq(upload_id))
        .exec(conn())
        .await?;
    Ok(result.rows_affected)
}

pub async fn delete_by_upload_id<C: ConnectionTrait>(db: &C, upload_id: &str) -> anyhow::Result<u64> {
    let result = Entity::delete_many()
        .filter(Column::UploadId.eq(upload_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Снимает ссылки на матрикулы перед их удалением
pub async fn clear_matricula_refs<C: ConnectionTrait>(
    db: &C,
    matricula_ids: &[i32],
) -> anyhow::Result<u64> {
    if matricula_ids.is_empty() {
        return Ok(0);
    }
    let result = Entity::update_many()
        .col_expr(Column::MatriculaId, Expr::value(Option::<i32>::None))
        .filter(Column::MatriculaId.is_in(matricula_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn count_by_group<C: ConnectionTrait>(db: &C, group_id: i32) -> anyhow::Result<u64> {
    let count = Entity::find()
        .filter(Column::GroupId.eq(group_id))
        .count(db)
        .await?;
    Ok(count)
}
