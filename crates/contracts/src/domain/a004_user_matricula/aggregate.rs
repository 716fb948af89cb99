use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatriculaStatus {
    #[default]
    Active,
    Pending,
    Inactive,
    Approved,
    Rejected,
}

impl MatriculaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatriculaStatus::Active => "active",
            MatriculaStatus::Pending => "pending",
            MatriculaStatus::Inactive => "inactive",
            MatriculaStatus::Approved => "approved",
            MatriculaStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" => Some(MatriculaStatus::Active),
            "pending" => Some(MatriculaStatus::Pending),
            "inactive" => Some(MatriculaStatus::Inactive),
            "approved" => Some(MatriculaStatus::Approved),
            "rejected" => Some(MatriculaStatus::Rejected),
            _ => None,
        }
    }
}

/// Матрикула: регистрационный номер, закреплённый за пользователем.
/// У номера может быть не более одного активного владельца.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMatricula {
    pub id: i32,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "matriculaNumber")]
    pub matricula_number: String,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    pub status: MatriculaStatus,
    #[serde(rename = "isOwner")]
    pub is_owner: bool,
    #[serde(rename = "importSessionId")]
    pub import_session_id: Option<i32>,
}
