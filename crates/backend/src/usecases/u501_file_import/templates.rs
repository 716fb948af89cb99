use contracts::system::auth::TokenClaims;
use contracts::usecases::u501_file_import::{EntityType, ImportTemplate};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

pub const USERS_TEMPLATE_ID: i32 = 1;
pub const CONTRACTS_TEMPLATE_ID: i32 = 2;
pub const DASHBOARD_TEMPLATE_ID: i32 = 3;

pub const DASHBOARD_TEMPLATE_NAME: &str = "contractDashboard";

/// Встроенные шаблоны импорта
static TEMPLATES: Lazy<Vec<ImportTemplate>> = Lazy::new(|| {
    vec![
        ImportTemplate {
            id: USERS_TEMPLATE_ID,
            name: "Users".to_string(),
            entity_type: EntityType::User,
            description: "Onboard sellers with optional parent and matricula".to_string(),
            required_fields: strings(&["Name", "Email"]),
            optional_fields: strings(&[
                "Surname",
                "Role",
                "ParentEmail",
                "SendEmail",
                "Matricula",
                "IsMatriculaOwner",
            ]),
            default_mappings: BTreeMap::new(),
            is_active: true,
        },
        ImportTemplate {
            id: CONTRACTS_TEMPLATE_ID,
            name: "Contracts".to_string(),
            entity_type: EntityType::Contract,
            description: "Contracts keyed by contract number, owned by a user email".to_string(),
            required_fields: strings(&["ContractNumber", "UserEmail", "TotalAmount"]),
            optional_fields: strings(&[
                "GroupId",
                "Status",
                "SaleStartDate",
                "SaleEndDate",
                "ContractType",
                "Quota",
                "PvId",
                "CustomerName",
                "Version",
            ]),
            default_mappings: BTreeMap::new(),
            is_active: true,
        },
        ImportTemplate {
            id: DASHBOARD_TEMPLATE_ID,
            name: DASHBOARD_TEMPLATE_NAME.to_string(),
            entity_type: EntityType::Contract,
            description: "Vendor contract dashboard export with composite Cota column"
                .to_string(),
            required_fields: strings(&[
                "ContractNumber",
                "TotalAmount",
                "SaleStartDate",
                "GroupId",
                "Quota",
                "CustomerName",
            ]),
            optional_fields: strings(&[
                "Status",
                "PvId",
                "PvName",
                "Version",
                "Matricula",
                "Category",
                "PlanoVenda",
            ]),
            default_mappings: dashboard_default_mappings(),
            is_active: true,
        },
    ]
});

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn dashboard_default_mappings() -> BTreeMap<String, String> {
    [
        ("cota.group", "GroupId"),
        ("cota.cota", "Quota"),
        ("cota.customer", "CustomerName"),
        ("cota.contract", "ContractNumber"),
        ("DtVenda", "SaleStartDate"),
        ("Dt Venda", "SaleStartDate"),
        ("Situação Cobrança", "Status"),
        ("SituacaoCobranca", "Status"),
        ("CodPV", "PvId"),
        ("Cód. PV", "PvId"),
        ("PV", "PvName"),
        ("Versao", "Version"),
        ("Matricula", "Matricula"),
        ("Categoria", "Category"),
        ("PlanoVenda", "PlanoVenda"),
        ("Valor", "TotalAmount"),
    ]
    .into_iter()
    .map(|(src, dst)| (src.to_string(), dst.to_string()))
    .collect()
}

pub fn is_dashboard(template: &ImportTemplate) -> bool {
    template.id == DASHBOARD_TEMPLATE_ID
}

/// Не-суперадмины работают только с шаблоном contractDashboard
pub fn can_use(template: &ImportTemplate, caller: &TokenClaims) -> bool {
    caller.is_superadmin() || is_dashboard(template)
}

pub fn list(entity_type: Option<EntityType>, caller: &TokenClaims) -> Vec<ImportTemplate> {
    TEMPLATES
        .iter()
        .filter(|t| t.is_active)
        .filter(|t| entity_type.map_or(true, |e| t.entity_type == e))
        .filter(|t| can_use(t, caller))
        .cloned()
        .collect()
}

pub fn get(id: i32) -> Option<ImportTemplate> {
    TEMPLATES.iter().find(|t| t.id == id && t.is_active).cloned()
}

/// Шаблон по умолчанию, когда templateId не передан
pub fn default_for(caller: &TokenClaims) -> i32 {
    if caller.is_superadmin() {
        CONTRACTS_TEMPLATE_ID
    } else {
        DASHBOARD_TEMPLATE_ID
    }
}
