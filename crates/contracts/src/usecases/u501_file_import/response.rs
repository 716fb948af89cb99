use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ответ шага загрузки: колонки файла, образцы строк и предлагаемое сопоставление
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreviewResponse {
    pub upload_id: String,
    pub session_id: i32,
    pub template_id: i32,
    pub template_name: String,
    pub entity_type: String,
    pub file_name: String,
    pub detected_columns: Vec<String>,
    pub sample_rows: Vec<BTreeMap<String, String>>,
    pub total_rows: i32,
    /// source column -> target field
    pub suggested_mappings: BTreeMap<String, String>,
    pub required_fields: Vec<String>,
    pub optional_fields: Vec<String>,
    pub is_template_match: bool,
    pub match_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatusResponse {
    pub upload_id: String,
    pub status: String,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub failed_rows: i32,
    pub skipped_rows: i32,
    pub created_groups: Vec<String>,
    #[serde(rename = "createdPVs")]
    pub created_pvs: Vec<String>,
    pub errors: Vec<String>,
}

/// Итог выполнения импорта (confirm)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResultDto {
    pub upload_id: String,
    pub status: String,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub failed_rows: i32,
    pub skipped_rows: i32,
    pub created_contracts: i32,
    pub updated_contracts: i32,
    pub created_users: i32,
    pub created_groups: Vec<String>,
    #[serde(rename = "createdPVs")]
    pub created_pvs: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateResponse {
    pub upload_id: String,
    pub deactivated_contracts: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoResponse {
    pub session_id: i32,
    pub upload_id: String,
    pub deleted_contracts: u64,
    pub deleted_matriculas: u64,
    pub deactivated_users: u64,
    pub deleted_groups: u64,
}
