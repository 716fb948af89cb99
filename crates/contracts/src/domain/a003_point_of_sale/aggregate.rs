use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Точка продаж (PV). Идентификатор приходит из внешних данных, не автоинкремент.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointOfSale {
    pub id: i32,
    pub name: String,
    #[serde(rename = "matriculaId")]
    pub matricula_id: Option<i32>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl PointOfSale {
    /// Имя по умолчанию, если в файле нет колонки с названием PV
    pub fn default_name(id: i32) -> String {
        format!("PV {}", id)
    }
}
