use contracts::usecases::u501_file_import::{EntityType, ImportTemplate};
use std::collections::{BTreeMap, HashSet};

use super::templates;

/// source column -> target field
pub type Mappings = BTreeMap<String, String>;

struct Rule {
    target: &'static str,
    patterns: &'static [&'static str],
}

const CONTRACT_RULES: &[Rule] = &[
    Rule {
        target: "ContractNumber",
        patterns: &["contract number", "contractnumber", "contract #", "contract#", "contrato", "number"],
    },
    Rule {
        target: "UserEmail",
        patterns: &["user email", "useremail", "client email", "customer email", "e mail", "email"],
    },
    Rule {
        target: "TotalAmount",
        patterns: &["total amount", "totalamount", "amount", "value", "price", "valor"],
    },
    Rule {
        target: "GroupId",
        patterns: &["group id", "groupid", "team id", "teamid", "group"],
    },
    Rule {
        target: "Status",
        patterns: &["contract status", "status", "state"],
    },
    Rule {
        target: "SaleStartDate",
        patterns: &[
            "start date",
            "startdate",
            "sale start",
            "contract start",
            "begin date",
            "data da venda",
            "data venda",
        ],
    },
    Rule {
        target: "SaleEndDate",
        patterns: &["end date", "enddate", "sale end", "contract end", "finish date"],
    },
    Rule {
        target: "PvId",
        patterns: &["pv id", "pvid", "point of sale", "codigo pv", "código pv", "pv"],
    },
    Rule {
        target: "Quota",
        patterns: &["quota", "cota"],
    },
    Rule {
        target: "ContractType",
        patterns: &["contract type", "contracttype", "tipo", "type"],
    },
    Rule {
        target: "CustomerName",
        patterns: &[
            "customer name",
            "customername",
            "client name",
            "clientname",
            "nome do cliente",
            "nome cliente",
            "cliente",
        ],
    },
];

// Surname и ParentEmail раньше Name/Email: "last name" и "parent email" иначе заберут общие правила
const USER_RULES: &[Rule] = &[
    Rule {
        target: "Surname",
        patterns: &["surname", "last name", "lastname", "sobrenome"],
    },
    Rule {
        target: "ParentEmail",
        patterns: &["parent email", "parent", "manager email"],
    },
    Rule {
        target: "Name",
        patterns: &["first name", "firstname", "user name", "username", "name"],
    },
    Rule {
        target: "Email",
        patterns: &["email address", "e mail", "email", "mail"],
    },
    Rule {
        target: "Role",
        patterns: &["role"],
    },
];

fn rules_for(entity_type: EntityType) -> &'static [Rule] {
    match entity_type {
        EntityType::Contract => CONTRACT_RULES,
        EntityType::User => USER_RULES,
    }
}

/// lowercase, `_`/`-` -> пробел, схлопнуть пробелы
pub fn normalize(column: &str) -> String {
    column
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Heuristic column -> field suggestion.
///
/// Exact (case-insensitive) field names win, then the entity's rule table is tried in
/// declaration order. Each target is assigned at most once.
pub fn suggest_mappings(
    columns: &[String],
    entity_type: EntityType,
    template_fields: &[String],
) -> Mappings {
    let mut result = Mappings::new();
    let mut used: HashSet<String> = HashSet::new();

    for column in columns {
        if let Some(field) = template_fields
            .iter()
            .find(|f| f.eq_ignore_ascii_case(column.trim()))
        {
            if used.insert(field.clone()) {
                result.insert(column.clone(), field.clone());
            }
        }
    }

    for column in columns {
        if result.contains_key(column) {
            continue;
        }
        let normalized = normalize(column);
        if normalized.is_empty() {
            continue;
        }
        let hit = rules_for(entity_type).iter().find(|rule| {
            !used.contains(rule.target)
                && rule
                    .patterns
                    .iter()
                    .any(|p| normalized == *p || normalized.contains(p))
        });
        if let Some(rule) = hit {
            used.insert(rule.target.to_string());
            result.insert(column.clone(), rule.target.to_string());
        }
    }

    if !template_fields.is_empty() {
        result.retain(|_, target| template_fields.iter().any(|f| f == target));
    }
    result
}

/// Default mappings of the template resolved against the file's real column names
pub fn apply_template_mappings(defaults: &Mappings, columns: &[String]) -> Mappings {
    let mut applied = Mappings::new();
    for (source, target) in defaults {
        let found = columns
            .iter()
            .find(|c| *c == source)
            .or_else(|| {
                let lower = source.to_lowercase();
                columns.iter().find(|c| c.to_lowercase() == lower)
            });
        if let Some(column) = found {
            applied.entry(column.clone()).or_insert_with(|| target.clone());
        }
    }
    applied
}

/// Шаблонные сопоставления перекрывают эвристику; конфликтующие автоматические удаляются
pub fn combine(auto: Mappings, applied: Mappings) -> Mappings {
    let claimed: HashSet<&String> = applied.values().collect();
    let mut merged: Mappings = auto
        .into_iter()
        .filter(|(source, target)| !applied.contains_key(source) && !claimed.contains(target))
        .collect();
    merged.extend(applied);
    merged
}

/// Does the file look like it belongs to `template`?
pub fn template_match(suggested: &Mappings, template: &ImportTemplate) -> (bool, Option<String>) {
    let targets: HashSet<&String> = suggested.values().collect();
    let required = template.required_fields.len();
    let mapped = template
        .required_fields
        .iter()
        .filter(|f| targets.contains(f))
        .count();

    let threshold = (required + 1) / 2;
    let too_few_for_dashboard = templates::is_dashboard(template) && mapped < 3;

    if mapped < threshold || too_few_for_dashboard {
        let message = format!(
            "Only {} of {} required fields could be mapped. This file may not match the '{}' template.",
            mapped, required, template.name
        );
        (false, Some(message))
    } else {
        (true, None)
    }
}

/// Full suggestion for an uploaded file: heuristics plus template defaults
pub fn suggest_for_template(columns: &[String], template: &ImportTemplate) -> Mappings {
    let auto = suggest_mappings(columns, template.entity_type, &template.all_fields());
    let applied = apply_template_mappings(&template.default_mappings, columns);
    combine(auto, applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::u501_file_import::templates::{
        CONTRACTS_TEMPLATE_ID, DASHBOARD_TEMPLATE_ID, USERS_TEMPLATE_ID,
    };

    fn cols(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Contract_Number "), "contract number");
        assert_eq!(normalize("E-Mail"), "e mail");
        assert_eq!(normalize("Data   da  Venda"), "data da venda");
    }

    #[test]
    fn test_contract_columns() {
        let template = templates::get(CONTRACTS_TEMPLATE_ID).unwrap();
        let columns = cols(&["contract_number", "Client E-mail", "Valor", "Team ID", "Data Venda", "Nome do Cliente"]);
        let m = suggest_mappings(&columns, EntityType::Contract, &template.all_fields());
        assert_eq!(m["contract_number"], "ContractNumber");
        assert_eq!(m["Client E-mail"], "UserEmail");
        assert_eq!(m["Valor"], "TotalAmount");
        assert_eq!(m["Team ID"], "GroupId");
        assert_eq!(m["Data Venda"], "SaleStartDate");
        assert_eq!(m["Nome do Cliente"], "CustomerName");
    }

    #[test]
    fn test_exact_match_wins_and_targets_are_unique() {
        let template = templates::get(CONTRACTS_TEMPLATE_ID).unwrap();
        let columns = cols(&["amount", "totalamount"]);
        let m = suggest_mappings(&columns, EntityType::Contract, &template.all_fields());
        assert_eq!(m.get("totalamount").map(String::as_str), Some("TotalAmount"));
        assert!(!m.contains_key("amount"));
    }

    #[test]
    fn test_user_rule_order() {
        let template = templates::get(USERS_TEMPLATE_ID).unwrap();
        let columns = cols(&["First Name", "Last Name", "Parent Email", "E-mail", "Role"]);
        let m = suggest_mappings(&columns, EntityType::User, &template.all_fields());
        assert_eq!(m["First Name"], "Name");
        assert_eq!(m["Last Name"], "Surname");
        assert_eq!(m["Parent Email"], "ParentEmail");
        assert_eq!(m["E-mail"], "Email");
        assert_eq!(m["Role"], "Role");
    }

    #[test]
    fn test_targets_outside_template_are_dropped() {
        let fields = cols(&["Name", "Email"]);
        let m = suggest_mappings(&cols(&["Nome", "Email", "Role"]), EntityType::User, &fields);
        assert_eq!(m.len(), 1);
        assert_eq!(m["Email"], "Email");
    }

    #[test]
    fn test_dashboard_defaults_override_heuristics() {
        let template = templates::get(DASHBOARD_TEMPLATE_ID).unwrap();
        let columns = cols(&[
            "Cota",
            "valor",
            "Dt Venda",
            "Situação Cobrança",
            "cota.group",
            "cota.cota",
            "cota.customer",
            "cota.contract",
        ]);
        let m = suggest_for_template(&columns, &template);
        assert_eq!(m["valor"], "TotalAmount");
        assert_eq!(m["cota.cota"], "Quota");
        assert_eq!(m["cota.contract"], "ContractNumber");
        assert_eq!(m["Situação Cobrança"], "Status");
        // the raw Cota column would claim Quota heuristically; the template default wins
        assert!(!m.contains_key("Cota"));

        let (is_match, message) = template_match(&m, &template);
        assert!(is_match);
        assert!(message.is_none());
    }

    #[test]
    fn test_template_mismatch() {
        let template = templates::get(DASHBOARD_TEMPLATE_ID).unwrap();
        let mut m = Mappings::new();
        m.insert("Valor".into(), "TotalAmount".into());
        m.insert("Data".into(), "SaleStartDate".into());
        let (is_match, message) = template_match(&m, &template);
        assert!(!is_match);
        assert!(message.unwrap().contains("Only 2 of 6"));

        let contracts = templates::get(CONTRACTS_TEMPLATE_ID).unwrap();
        let (is_match, _) = template_match(&m, &contracts);
        assert!(!is_match);
        m.insert("Contrato".into(), "ContractNumber".into());
        assert!(template_match(&m, &contracts).0);
    }
}
