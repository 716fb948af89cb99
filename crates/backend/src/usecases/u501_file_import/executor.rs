use anyhow::Context;
use chrono::Utc;
use contracts::system::auth::TokenClaims;
use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u501_file_import::{
    ColumnMappingRequest, ConfirmImportRequest, DeactivateResponse, EntityType, ImportFromFile,
    ImportPreviewResponse, ImportResultDto, ImportSessionDto, ImportSessionStatus,
    ImportStatusResponse, ImportTemplate, UndoResponse,
};
use sea_orm::TransactionTrait;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ImportError, ImportResult};
use super::importers::{
    ContractImporter, CreatedRecords, DashboardImporter, ImportContext, RowError, RowImporter,
    RowOutcome, UserImporter,
};
use super::progress_tracker::ProgressTracker;
use super::repository::rows;
use super::repository::sessions::{self, NewSession, SessionCounts, SessionOutcome};
use super::validation::{self, DbLookup, ValidationLookup};
use super::values::DateOrder;
use super::{auto_mapping, cota, file_parser, templates};
use crate::domain::{a001_user, a002_group, a004_user_matricula, a005_contract};
use crate::shared::config::ImportConfig;
use crate::shared::data::db::get_connection;
use crate::shared::format::{format_number, format_row_error};

/// Finished progress entries are kept in memory this long
const PROGRESS_RETENTION_HOURS: i64 = 24;

/// `yyyyMMddHHmmss-xxxxxxxx`
pub fn new_upload_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), &suffix[..8])
}

/// Executor для UseCase импорта из файла: загрузка, сопоставление, выполнение, откат
pub struct ImportExecutor {
    config: ImportConfig,
    progress_tracker: Arc<ProgressTracker>,
    lookup: Arc<dyn ValidationLookup>,
}

impl ImportExecutor {
    pub fn new(config: ImportConfig, progress_tracker: Arc<ProgressTracker>) -> Self {
        Self::with_lookup(config, progress_tracker, Arc::new(DbLookup))
    }

    pub fn with_lookup(
        config: ImportConfig,
        progress_tracker: Arc<ProgressTracker>,
        lookup: Arc<dyn ValidationLookup>,
    ) -> Self {
        Self {
            config,
            progress_tracker,
            lookup,
        }
    }

    pub fn list_templates(
        &self,
        entity_type: Option<&str>,
        caller: &TokenClaims,
    ) -> ImportResult<Vec<ImportTemplate>> {
        let entity_type = match entity_type.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(EntityType::parse(raw).ok_or_else(|| {
                ImportError::bad_request(format!("Unknown entity type: {}", raw))
            })?),
            None => None,
        };
        Ok(templates::list(entity_type, caller))
    }

    pub fn get_template(&self, id: i32, caller: &TokenClaims) -> ImportResult<ImportTemplate> {
        let template =
            templates::get(id).ok_or_else(|| ImportError::not_found("Template not found"))?;
        if !templates::can_use(&template, caller) {
            return Err(ImportError::forbidden(
                "You do not have permission to use this template",
            ));
        }
        Ok(template)
    }

    /// Шаг 1: разбор файла, создание сессии, предложение сопоставления
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        template_id: Option<i32>,
        caller: &TokenClaims,
    ) -> ImportResult<ImportPreviewResponse> {
        let template_id = template_id.unwrap_or_else(|| templates::default_for(caller));
        let template = self.get_template(template_id, caller)?;

        let file_type = file_parser::detect_file_type(file_name)
            .map_err(|e| ImportError::bad_request(e.to_string()))?;
        let mut parsed = file_parser::parse(file_type, bytes)
            .map_err(|e| ImportError::bad_request(e.to_string()))?;

        if parsed.rows.len() > self.config.max_rows {
            return Err(ImportError::bad_request(format!(
                "File exceeds the maximum of {} rows",
                self.config.max_rows
            )));
        }
        if parsed.rows.is_empty() {
            return Err(ImportError::bad_request("File contains no data rows"));
        }

        if templates::is_dashboard(&template) {
            cota::apply(&mut parsed);
        }

        let total_rows = i32::try_from(parsed.rows.len()).context("Row count overflow")?;
        let upload_id = new_upload_id();
        let session = sessions::create(NewSession {
            upload_id: &upload_id,
            template_id: template.id,
            file_name,
            file_type: file_type.as_str(),
            uploaded_by_user_id: &caller.sub,
            total_rows,
        })
        .await
        .context("Failed to create import session")?;

        rows::insert_many(session.id, &parsed.rows, self.config.chunk_size)
            .await
            .context("Failed to store import rows")?;

        let suggested_mappings = auto_mapping::suggest_for_template(&parsed.columns, &template);
        let (is_template_match, match_message) =
            auto_mapping::template_match(&suggested_mappings, &template);

        tracing::info!(
            "Upload {}: '{}' ({}), template '{}', {} rows, {} columns",
            upload_id,
            file_name,
            file_type.as_str(),
            template.name,
            format_number(parsed.rows.len()),
            parsed.columns.len()
        );

        Ok(ImportPreviewResponse {
            upload_id,
            session_id: session.id,
            template_id: template.id,
            template_name: template.name.clone(),
            entity_type: template.entity_type.as_str().to_string(),
            file_name: file_name.to_string(),
            sample_rows: parsed
                .rows
                .iter()
                .take(self.config.preview_rows)
                .cloned()
                .collect(),
            detected_columns: parsed.columns,
            total_rows,
            suggested_mappings,
            required_fields: template.required_fields,
            optional_fields: template.optional_fields,
            is_template_match,
            match_message,
        })
    }

    async fn session_by_upload(&self, upload_id: &str) -> ImportResult<sessions::Model> {
        sessions::get_by_upload_id(upload_id)
            .await?
            .ok_or_else(|| ImportError::not_found("Import session not found"))
    }

    fn session_template(session: &sessions::Model) -> anyhow::Result<ImportTemplate> {
        templates::get(session.template_id)
            .with_context(|| format!("Template {} no longer exists", session.template_id))
    }

    /// Шаг 2: сохранить сопоставление и проверить строки. Ошибки носят рекомендательный характер.
    pub async fn configure_mappings(
        &self,
        upload_id: &str,
        request: ColumnMappingRequest,
    ) -> ImportResult<ImportStatusResponse> {
        let session = self.session_by_upload(upload_id).await?;
        if !session.status().accepts_mappings() {
            return Err(ImportError::bad_request(format!(
                "Mappings can no longer be changed for an import in status '{}'",
                session.status
            )));
        }

        let mappings: auto_mapping::Mappings = request
            .mappings
            .into_iter()
            .map(|(source, target)| (source.trim().to_string(), target.trim().to_string()))
            .filter(|(source, target)| !source.is_empty() && !target.is_empty())
            .collect();
        if mappings.is_empty() {
            return Err(ImportError::bad_request("No mappings provided."));
        }
        let duplicate = validation::duplicate_targets(&mappings).into_iter().next();
        if let Some((target, sources)) = duplicate {
            return Err(ImportError::bad_request(format!(
                "Field '{}' is mapped from more than one column: {}",
                target,
                sources.join(", ")
            )));
        }

        let template = Self::session_template(&session)?;
        let data: Vec<file_parser::Row> =
            rows::load_first(session.id, self.config.validation_row_cap)
                .await?
                .into_iter()
                .map(|r| r.data)
                .collect();

        let report = validation::validate_rows(
            &data,
            &mappings,
            &template,
            &request.options,
            self.lookup.as_ref(),
        )
        .await?;

        let messages = report.messages();
        let failed_rows = i32::try_from(report.failed_rows()).unwrap_or(i32::MAX);
        let updated =
            sessions::save_mappings(session.id, &mappings, &request.options, failed_rows, &messages)
                .await?;

        tracing::info!(
            "Upload {}: {} mappings saved, {} of {} checked rows with errors",
            upload_id,
            mappings.len(),
            failed_rows,
            data.len()
        );
        Ok(updated.to_status_response())
    }

    /// Шаг 3: выполнение импорта
    pub async fn confirm(
        &self,
        upload_id: &str,
        request: ConfirmImportRequest,
    ) -> ImportResult<ImportResultDto> {
        let session = self.session_by_upload(upload_id).await?;
        if session.status() != ImportSessionStatus::Ready {
            return Err(ImportError::bad_request("Import session is not ready."));
        }
        if session.mappings().is_empty() {
            return Err(ImportError::bad_request("No mappings configured."));
        }

        self.progress_tracker
            .cleanup_old_sessions(PROGRESS_RETENTION_HOURS);
        if !self
            .progress_tracker
            .try_start(upload_id, session.total_rows)
        {
            return Err(ImportError::Conflict(
                "Import is already running for this upload".to_string(),
            ));
        }

        let result = self.run(&session, &request).await;
        self.progress_tracker.finish(upload_id);

        match result {
            Ok(dto) => Ok(dto),
            Err(e) => {
                tracing::error!("Upload {}: import failed: {:#}", upload_id, e);
                if let Err(status_err) =
                    sessions::set_status(get_connection(), session.id, ImportSessionStatus::Failed)
                        .await
                {
                    tracing::error!("Upload {}: could not mark session failed: {}", upload_id, status_err);
                }
                Err(ImportError::Internal(e))
            }
        }
    }

    async fn run(
        &self,
        session: &sessions::Model,
        request: &ConfirmImportRequest,
    ) -> anyhow::Result<ImportResultDto> {
        let template = Self::session_template(session)?;
        let options = session.options().merge(request.options);
        let ctx = ImportContext {
            session_id: session.id,
            upload_id: session.upload_id.clone(),
            options,
            date_order: DateOrder::from_format(&request.date_format),
            send_emails: request.send_emails,
            reverse: session
                .mappings()
                .into_iter()
                .map(|(source, target)| (target, source))
                .collect(),
        };

        let importer: Box<dyn RowImporter> = match template.entity_type {
            EntityType::User => Box::new(UserImporter),
            EntityType::Contract if templates::is_dashboard(&template) => {
                Box::new(DashboardImporter)
            }
            EntityType::Contract => Box::new(ContractImporter),
        };

        tracing::info!(
            "[{}] Upload {}: executing '{}' import of {} rows",
            ImportFromFile::full_name(),
            session.upload_id,
            template.name,
            format_number(session.total_rows.max(0) as usize)
        );

        let mut counts = SessionCounts::default();
        let mut result = ImportResultDto {
            upload_id: session.upload_id.clone(),
            total_rows: session.total_rows,
            ..Default::default()
        };
        let mut created = CreatedRecords::default();
        let chunk_size = self.config.chunk_size.max(1) as u64;
        let mut offset = 0u64;

        loop {
            let chunk = rows::load_chunk(session.id, offset, chunk_size).await?;
            if chunk.is_empty() {
                break;
            }
            offset += chunk.len() as u64;

            for row in &chunk {
                let txn = get_connection()
                    .begin()
                    .await
                    .context("Failed to open row transaction")?;
                let mut row_created = CreatedRecords::default();

                match importer.import_row(&txn, &row.data, &ctx, &mut row_created).await {
                    Ok(outcome) => {
                        txn.commit()
                            .await
                            .with_context(|| format!("Failed to commit row {}", row.index + 1))?;
                        created.absorb(row_created);
                        if outcome != RowOutcome::Skipped {
                            counts.processed += 1;
                        }
                        match outcome {
                            RowOutcome::Skipped => counts.skipped += 1,
                            RowOutcome::CreatedContract => result.created_contracts += 1,
                            RowOutcome::UpdatedContract => result.updated_contracts += 1,
                            RowOutcome::CreatedUser => result.created_users += 1,
                        }
                    }
                    Err(RowError::Invalid(message)) => {
                        txn.rollback()
                            .await
                            .with_context(|| format!("Failed to roll back row {}", row.index + 1))?;
                        counts.failed += 1;
                        let line = format_row_error(row.index, &message);
                        tracing::debug!("Upload {}: {}", session.upload_id, line);
                        result.errors.push(line);
                    }
                    Err(RowError::Fatal(e)) => {
                        if let Err(rollback_err) = txn.rollback().await {
                            tracing::warn!(
                                "Upload {}: rollback of row {} failed: {}",
                                session.upload_id,
                                row.index + 1,
                                rollback_err
                            );
                        }
                        return Err(e.context(format!("Row {}", row.index + 1)));
                    }
                }
            }

            sessions::update_progress(session.id, counts).await?;
            self.progress_tracker.update(&session.upload_id, counts);
        }

        let status = if counts.failed > 0 {
            ImportSessionStatus::CompletedWithErrors
        } else {
            ImportSessionStatus::Completed
        };

        sessions::finish(
            session.id,
            SessionOutcome {
                status,
                counts,
                errors: &result.errors,
                created_groups: &created.groups,
                created_pvs: &created.pvs,
            },
        )
        .await?;

        tracing::info!(
            "Upload {}: {} (processed {}, failed {}, skipped {}, contracts +{} ~{}, users +{})",
            session.upload_id,
            status.as_str(),
            counts.processed,
            counts.failed,
            counts.skipped,
            result.created_contracts,
            result.updated_contracts,
            result.created_users
        );

        result.status = status.as_str().to_string();
        result.processed_rows = counts.processed;
        result.failed_rows = counts.failed;
        result.skipped_rows = counts.skipped;
        result.created_groups = created.groups;
        result.created_pvs = created.pvs;
        Ok(result)
    }

    pub async fn status(&self, upload_id: &str) -> ImportResult<ImportStatusResponse> {
        let session = self.session_by_upload(upload_id).await?;
        let mut response = session.to_status_response();
        if let Some(live) = self
            .progress_tracker
            .get_progress(upload_id)
            .filter(|p| p.is_running())
        {
            response.status = "running".to_string();
            response.processed_rows = live.processed_rows;
            response.failed_rows = live.failed_rows;
            response.skipped_rows = live.skipped_rows;
        }
        Ok(response)
    }

    pub async fn sessions(&self) -> ImportResult<Vec<ImportSessionDto>> {
        let items = sessions::list_all().await?;
        Ok(items.iter().map(sessions::Model::to_dto).collect())
    }

    pub async fn history(&self) -> ImportResult<Vec<ImportSessionDto>> {
        let items = sessions::list_history().await?;
        Ok(items.iter().map(sessions::Model::to_dto).collect())
    }

    /// Мягкое удаление: контракты загрузки помечаются неактивными
    pub async fn delete_by_upload(&self, upload_id: &str) -> ImportResult<DeactivateResponse> {
        let deactivated = a005_contract::repository::deactivate_by_upload_id(upload_id).await?;
        if deactivated == 0 {
            return Err(ImportError::not_found("No contracts found for this upload ID"));
        }
        tracing::info!("Upload {}: {} contracts deactivated", upload_id, deactivated);
        Ok(DeactivateResponse {
            upload_id: upload_id.to_string(),
            deactivated_contracts: deactivated,
        })
    }

    /// Откат импорта по id сессии или upload_id, в одной транзакции
    pub async fn undo(&self, key: &str) -> ImportResult<UndoResponse> {
        let key = key.trim();
        let mut session = match key.parse::<i32>() {
            Ok(id) => sessions::get_by_id(id).await?,
            Err(_) => None,
        };
        if session.is_none() {
            session = sessions::get_by_upload_id(key).await?;
        }
        let session = session.ok_or_else(|| ImportError::not_found("Import session not found"))?;

        match session.status() {
            ImportSessionStatus::Undone => {
                return Err(ImportError::bad_request("This import has already been undone"))
            }
            status if !status.is_undoable() => {
                return Err(ImportError::bad_request(
                    "Only completed or failed imports can be undone",
                ))
            }
            _ => {}
        }

        let txn = get_connection()
            .begin()
            .await
            .context("Failed to open undo transaction")?;

        let deleted_contracts =
            a005_contract::repository::delete_by_upload_id(&txn, &session.upload_id).await?;

        let matricula_ids =
            a004_user_matricula::repository::ids_by_import_session(&txn, session.id).await?;
        a005_contract::repository::clear_matricula_refs(&txn, &matricula_ids).await?;
        let deleted_matriculas =
            a004_user_matricula::repository::delete_by_import_session(&txn, session.id).await?;

        let deactivated_users =
            a001_user::repository::deactivate_by_import_session(&txn, session.id).await?;

        let mut deleted_groups = 0u64;
        for group in a002_group::repository::list_by_import_session(&txn, session.id).await? {
            if a005_contract::repository::count_by_group(&txn, group.id).await? == 0
                && a002_group::repository::delete(&txn, group.id).await?
            {
                deleted_groups += 1;
            }
        }

        sessions::set_status(&txn, session.id, ImportSessionStatus::Undone).await?;
        txn.commit().await.context("Failed to commit undo")?;

        tracing::info!(
            "Upload {}: undone ({} contracts, {} matriculas, {} users, {} groups)",
            session.upload_id,
            deleted_contracts,
            deleted_matriculas,
            deactivated_users,
            deleted_groups
        );

        Ok(UndoResponse {
            session_id: session.id,
            upload_id: session.upload_id,
            deleted_contracts,
            deleted_matriculas,
            deactivated_users,
            deleted_groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_id_format() {
        let id = new_upload_id();
        let (stamp, suffix) = id.split_once('-').unwrap();
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_upload_id(), id);
    }
}
