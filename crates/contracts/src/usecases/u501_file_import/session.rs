use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Жизненный цикл сессии импорта:
/// preview -> ready -> completed | completed_with_errors | failed, completed* -> undone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSessionStatus {
    Preview,
    Ready,
    Completed,
    CompletedWithErrors,
    Failed,
    Undone,
}

impl ImportSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSessionStatus::Preview => "preview",
            ImportSessionStatus::Ready => "ready",
            ImportSessionStatus::Completed => "completed",
            ImportSessionStatus::CompletedWithErrors => "completed_with_errors",
            ImportSessionStatus::Failed => "failed",
            ImportSessionStatus::Undone => "undone",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "preview" => Some(ImportSessionStatus::Preview),
            "ready" => Some(ImportSessionStatus::Ready),
            "completed" => Some(ImportSessionStatus::Completed),
            "completed_with_errors" => Some(ImportSessionStatus::CompletedWithErrors),
            "failed" => Some(ImportSessionStatus::Failed),
            "undone" => Some(ImportSessionStatus::Undone),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            ImportSessionStatus::Completed | ImportSessionStatus::CompletedWithErrors
        )
    }

    /// A run that stopped midway may still have committed rows
    pub fn is_undoable(&self) -> bool {
        self.is_completed() || *self == ImportSessionStatus::Failed
    }

    /// Сессии, которые попадают в историю импорта
    pub fn is_history(&self) -> bool {
        self.is_completed() || *self == ImportSessionStatus::Undone
    }

    /// Mappings may be (re)configured only before execution
    pub fn accepts_mappings(&self) -> bool {
        matches!(self, ImportSessionStatus::Preview | ImportSessionStatus::Ready)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSessionDto {
    pub id: i32,
    pub upload_id: String,
    pub template_id: i32,
    pub file_name: String,
    pub file_type: String,
    pub uploaded_by_user_id: String,
    pub status: ImportSessionStatus,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub failed_rows: i32,
    pub skipped_rows: i32,
    pub mappings: Option<BTreeMap<String, String>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
