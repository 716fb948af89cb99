use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Группа (команда) для начисления комиссий
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    /// Сессия импорта, которая создала группу (для undo)
    #[serde(rename = "importSessionId")]
    pub import_session_id: Option<i32>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
