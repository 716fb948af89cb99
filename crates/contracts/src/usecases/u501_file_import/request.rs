use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_DATE_FORMAT: &str = "MM/DD/YYYY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatesQuery {
    pub entity_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub template_id: Option<i32>,
}

/// Флаги обработки строк, сохраняются в сессии на шаге mappings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    #[serde(default)]
    pub allow_auto_create_groups: bool,
    #[serde(default, rename = "allowAutoCreatePVs")]
    pub allow_auto_create_pvs: bool,
    #[serde(default)]
    pub skip_missing_contract_number: bool,
}

impl ImportOptions {
    /// Флаг включён, если он включён хотя бы в одном из источников
    pub fn merge(self, other: ImportOptions) -> ImportOptions {
        ImportOptions {
            allow_auto_create_groups: self.allow_auto_create_groups
                || other.allow_auto_create_groups,
            allow_auto_create_pvs: self.allow_auto_create_pvs || other.allow_auto_create_pvs,
            skip_missing_contract_number: self.skip_missing_contract_number
                || other.skip_missing_contract_number,
        }
    }
}

/// POST /api/imports/:upload_id/mappings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMappingRequest {
    /// source column -> target field
    pub mappings: BTreeMap<String, String>,
    #[serde(flatten)]
    pub options: ImportOptions,
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// POST /api/imports/:upload_id/confirm
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmImportRequest {
    /// "MM/DD/YYYY" или "DD/MM/YYYY"
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Приветственное письмо всем созданным пользователям, независимо от колонки SendEmail
    #[serde(default)]
    pub send_emails: bool,
    #[serde(flatten)]
    pub options: ImportOptions,
}

impl Default for ConfirmImportRequest {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            send_emails: false,
            options: ImportOptions::default(),
        }
    }
}
