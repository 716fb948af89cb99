use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Роль пользователя в системе
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    Superadmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Superadmin => "superadmin",
        }
    }

    /// Case-insensitive parse of the API representation
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            "superadmin" => Some(UserRole::Superadmin),
            _ => None,
        }
    }
}

/// Пользователь (продавец / менеджер), участвует в иерархии parent/child
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub surname: Option<String>,
    pub email: String,
    pub role: UserRole,
    #[serde(rename = "parentUserId")]
    pub parent_user_id: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        match &self.surname {
            Some(s) if !s.is_empty() => format!("{} {}", self.name, s),
            _ => self.name.clone(),
        }
    }
}
