use chrono::Utc;
use contracts::usecases::u501_file_import::{
    ImportOptions, ImportSessionDto, ImportSessionStatus, ImportStatusResponse,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub upload_id: String,
    pub template_id: i32,
    pub file_name: String,
    pub file_type: String,
    pub uploaded_by_user_id: String,
    pub status: String,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub failed_rows: i32,
    pub skipped_rows: i32,
    pub mappings: Option<String>,
    pub options: Option<String>,
    pub errors: Option<String>,
    pub created_groups: Option<String>,
    pub created_pvs: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn json_or_default<T: serde::de::DeserializeOwned + Default>(raw: &Option<String>) -> T {
    raw.as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string(value)?)
}

impl Model {
    pub fn status(&self) -> ImportSessionStatus {
        ImportSessionStatus::parse(&self.status).unwrap_or(ImportSessionStatus::Failed)
    }

    /// source column -> target field
    pub fn mappings(&self) -> BTreeMap<String, String> {
        json_or_default(&self.mappings)
    }

    pub fn options(&self) -> ImportOptions {
        json_or_default(&self.options)
    }

    pub fn errors(&self) -> Vec<String> {
        json_or_default(&self.errors)
    }

    pub fn created_groups(&self) -> Vec<String> {
        json_or_default(&self.created_groups)
    }

    pub fn created_pvs(&self) -> Vec<String> {
        json_or_default(&self.created_pvs)
    }

    pub fn to_dto(&self) -> ImportSessionDto {
        let mappings = self.mappings();
        ImportSessionDto {
            id: self.id,
            upload_id: self.upload_id.clone(),
            template_id: self.template_id,
            file_name: self.file_name.clone(),
            file_type: self.file_type.clone(),
            uploaded_by_user_id: self.uploaded_by_user_id.clone(),
            status: self.status(),
            total_rows: self.total_rows,
            processed_rows: self.processed_rows,
            failed_rows: self.failed_rows,
            skipped_rows: self.skipped_rows,
            mappings: (!mappings.is_empty()).then_some(mappings),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }

    pub fn to_status_response(&self) -> ImportStatusResponse {
        ImportStatusResponse {
            upload_id: self.upload_id.clone(),
            status: self.status.clone(),
            total_rows: self.total_rows,
            processed_rows: self.processed_rows,
            failed_rows: self.failed_rows,
            skipped_rows: self.skipped_rows,
            created_groups: self.created_groups(),
            created_pvs: self.created_pvs(),
            errors: self.errors(),
        }
    }
}

pub struct NewSession<'a> {
    pub upload_id: &'a str,
    pub template_id: i32,
    pub file_name: &'a str,
    pub file_type: &'a str,
    pub uploaded_by_user_id: &'a str,
    pub total_rows: i32,
}

/// Counters persisted after each processed chunk and at the end
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCounts {
    pub processed: i32,
    pub failed: i32,
    pub skipped: i32,
}

/// Итог выполнения, записывается одной операцией
pub struct SessionOutcome<'a> {
    pub status: ImportSessionStatus,
    pub counts: SessionCounts,
    pub errors: &'a [String],
    pub created_groups: &'a [String],
    pub created_pvs: &'a [String],
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn create(new: NewSession<'_>) -> anyhow::Result<Model> {
    let active = ActiveModel {
        upload_id: Set(new.upload_id.to_string()),
        template_id: Set(new.template_id),
        file_name: Set(new.file_name.to_string()),
        file_type: Set(new.file_type.to_string()),
        uploaded_by_user_id: Set(new.uploaded_by_user_id.to_string()),
        status: Set(ImportSessionStatus::Preview.as_str().to_string()),
        total_rows: Set(new.total_rows),
        processed_rows: Set(0),
        failed_rows: Set(0),
        skipped_rows: Set(0),
        mappings: Set(None),
        options: Set(None),
        errors: Set(None),
        created_groups: Set(None),
        created_pvs: Set(None),
        created_at: Set(Utc::now()),
        completed_at: Set(None),
        ..Default::default()
    };
    Ok(active.insert(conn()).await?)
}

pub async fn get_by_upload_id(upload_id: &str) -> anyhow::Result<Option<Model>> {
    Ok(Entity::find()
        .filter(Column::UploadId.eq(upload_id))
        .one(conn())
        .await?)
}

pub async fn get_by_id(id: i32) -> anyhow::Result<Option<Model>> {
    Ok(Entity::find_by_id(id).one(conn()).await?)
}

/// Результат шага mappings: сопоставление, флаги и рекомендательные ошибки
pub async fn save_mappings(
    id: i32,
    mappings: &BTreeMap<String, String>,
    options: &ImportOptions,
    failed_rows: i32,
    errors: &[String],
) -> anyhow::Result<Model> {
    let active = ActiveModel {
        id: Set(id),
        mappings: Set(Some(to_json(mappings)?)),
        options: Set(Some(to_json(options)?)),
        status: Set(ImportSessionStatus::Ready.as_str().to_string()),
        failed_rows: Set(failed_rows),
        errors: Set(Some(to_json(&errors)?)),
        ..Default::default()
    };
    Ok(active.update(conn()).await?)
}

pub async fn update_progress(id: i32, counts: SessionCounts) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(id),
        processed_rows: Set(counts.processed),
        failed_rows: Set(counts.failed),
        skipped_rows: Set(counts.skipped),
        ..Default::default()
    };
    active.update(conn()).await?;
    Ok(())
}

pub async fn finish(id: i32, outcome: SessionOutcome<'_>) -> anyhow::Result<Model> {
    let active = ActiveModel {
        id: Set(id),
        status: Set(outcome.status.as_str().to_string()),
        processed_rows: Set(outcome.counts.processed),
        failed_rows: Set(outcome.counts.failed),
        skipped_rows: Set(outcome.counts.skipped),
        errors: Set(Some(to_json(&outcome.errors)?)),
        created_groups: Set(Some(to_json(&outcome.created_groups)?)),
        created_pvs: Set(Some(to_json(&outcome.created_pvs)?)),
        completed_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    Ok(active.update(conn()).await?)
}

pub async fn set_status<C: ConnectionTrait>(
    db: &C,
    id: i32,
    status: ImportSessionStatus,
) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(id),
        status: Set(status.as_str().to_string()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}

pub async fn list_all() -> anyhow::Result<Vec<Model>> {
    Ok(Entity::find()
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .all(conn())
        .await?)
}

/// completed, completed_with_errors и undone
pub async fn list_history() -> anyhow::Result<Vec<Model>> {
    let statuses = [
        ImportSessionStatus::Completed,
        ImportSessionStatus::CompletedWithErrors,
        ImportSessionStatus::Undone,
    ]
    .map(|s| s.as_str());
    Ok(Entity::find()
        .filter(Column::Status.is_in(statuses))
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .all(conn())
        .await?)
}
