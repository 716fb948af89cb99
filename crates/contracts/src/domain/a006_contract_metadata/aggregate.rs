use serde::{Deserialize, Serialize};

/// Справочное значение, на которое ссылается контракт (категория, план продаж)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub id: i32,
    pub name: String,
    pub value: String,
}

pub const METADATA_CATEGORY: &str = "Category";
pub const METADATA_PLANO_VENDA: &str = "PlanoVenda";
