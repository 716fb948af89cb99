use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{ContractStatus, ContractType};

/// Контракт (бывш. "продажа"). `contract_number` является натуральным ключом.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: i32,
    #[serde(rename = "contractNumber")]
    pub contract_number: String,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
    #[serde(rename = "groupId")]
    pub group_id: Option<i32>,
    pub status: ContractStatus,
    #[serde(rename = "saleStartDate")]
    pub sale_start_date: DateTime<Utc>,
    #[serde(rename = "saleEndDate")]
    pub sale_end_date: Option<DateTime<Utc>>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    /// upload_id сессии, которая впервые создала контракт
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    #[serde(rename = "pvId")]
    pub pv_id: Option<i32>,
    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,
    #[serde(rename = "contractType")]
    pub contract_type: Option<ContractType>,
    pub quota: Option<String>,
    #[serde(rename = "matriculaId")]
    pub matricula_id: Option<i32>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i32>,
    #[serde(rename = "planoVendaId")]
    pub plano_venda_id: Option<i32>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Поля контракта, собранные из строки файла, до записи в БД
#[derive(Debug, Clone, Default)]
pub struct ContractDraft {
    pub contract_number: String,
    pub user_id: Option<String>,
    pub total_amount: f64,
    pub group_id: Option<i32>,
    pub status: ContractStatus,
    pub sale_start_date: Option<DateTime<Utc>>,
    pub sale_end_date: Option<DateTime<Utc>>,
    pub pv_id: Option<i32>,
    pub customer_name: Option<String>,
    pub contract_type: Option<ContractType>,
    pub quota: Option<String>,
    pub matricula_id: Option<i32>,
    pub category_id: Option<i32>,
    pub plano_venda_id: Option<i32>,
}
