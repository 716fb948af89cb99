use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Целевая сущность шаблона импорта
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    User,
    Contract,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "User",
            EntityType::Contract => "Contract",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "user" | "users" => Some(EntityType::User),
            "contract" | "contracts" => Some(EntityType::Contract),
            _ => None,
        }
    }
}

/// Шаблон импорта: какие поля обязательны, какие колонки сопоставляются по умолчанию
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportTemplate {
    pub id: i32,
    pub name: String,
    pub entity_type: EntityType,
    pub description: String,
    pub required_fields: Vec<String>,
    pub optional_fields: Vec<String>,
    /// source column -> target field
    pub default_mappings: BTreeMap<String, String>,
    pub is_active: bool,
}

impl ImportTemplate {
    pub fn all_fields(&self) -> Vec<String> {
        self.required_fields
            .iter()
            .chain(self.optional_fields.iter())
            .cloned()
            .collect()
    }
}
