use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use crate::shared::data::db::get_connection;
use crate::usecases::u501_file_import::file_parser::Row;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_rows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub session_id: i32,
    pub row_index: i32,
    /// JSON-объект колонка -> значение
    pub row_data: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

/// Строка из хранилища вместе с исходным номером
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub index: usize,
    pub data: Row,
}

impl TryFrom<Model> for StoredRow {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(StoredRow {
            index: usize::try_from(m.row_index)?,
            data: serde_json::from_str(&m.row_data)?,
        })
    }
}

/// Сохраняет строки файла пачками по `batch_size`
pub async fn insert_many(session_id: i32, rows: &[Row], batch_size: usize) -> anyhow::Result<()> {
    let batch_size = batch_size.max(1);
    for (batch_no, batch) in rows.chunks(batch_size).enumerate() {
        let offset = batch_no * batch_size;
        let models = batch
            .iter()
            .enumerate()
            .map(|(i, row)| -> anyhow::Result<ActiveModel> {
                Ok(ActiveModel {
                    session_id: Set(session_id),
                    row_index: Set(i32::try_from(offset + i)?),
                    row_data: Set(serde_json::to_string(row)?),
                    ..Default::default()
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Entity::insert_many(models).exec(conn()).await?;
    }
    tracing::debug!("Stored {} rows for import session {}", rows.len(), session_id);
    Ok(())
}

/// Chunk of rows ordered by row_index
pub async fn load_chunk(session_id: i32, offset: u64, limit: u64) -> anyhow::Result<Vec<StoredRow>> {
    Entity::find()
        .filter(Column::SessionId.eq(session_id))
        .order_by_asc(Column::RowIndex)
        .offset(offset)
        .limit(limit)
        .all(conn())
        .await?
        .into_iter()
        .map(StoredRow::try_from)
        .collect()
}

/// Первые `cap` строк сессии (для проверки)
pub async fn load_first(session_id: i32, cap: usize) -> anyhow::Result<Vec<StoredRow>> {
    load_chunk(session_id, 0, cap as u64).await
}
