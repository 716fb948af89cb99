use async_trait::async_trait;
use contracts::domain::a005_contract::status::{ContractStatus, ContractType};
use contracts::usecases::u501_file_import::{EntityType, ImportOptions, ImportTemplate};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::auto_mapping::Mappings;
use super::file_parser::Row;
use super::values::{self, DateOrder};
use crate::domain::{a001_user, a002_group};
use crate::domain::a001_user::service::is_valid_email;
use crate::shared::data::db::get_connection;
use crate::shared::format::format_row_error;

/// Group ids at or above this value are treated as names created by import, not lookups
const GROUP_LOOKUP_CEILING: i32 = 10_000;

/// Обращения к БД, нужные проверке строк
#[async_trait]
pub trait ValidationLookup: Send + Sync {
    async fn group_exists(&self, id: i32) -> anyhow::Result<bool>;
    async fn email_exists(&self, email: &str) -> anyhow::Result<bool>;
}

/// Lookup backed by the repositories
pub struct DbLookup;

#[async_trait]
impl ValidationLookup for DbLookup {
    async fn group_exists(&self, id: i32) -> anyhow::Result<bool> {
        Ok(a002_group::repository::get_active_by_id(get_connection(), id)
            .await?
            .is_some())
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        a001_user::repository::email_exists(get_connection(), email).await
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Ошибки сопоставления, относятся ко всему файлу
    pub mapping_errors: Vec<String>,
    /// row index (0-based) -> messages
    pub row_errors: BTreeMap<usize, Vec<String>>,
}

impl ValidationReport {
    pub fn failed_rows(&self) -> usize {
        self.row_errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.mapping_errors.is_empty() && self.row_errors.is_empty()
    }

    /// Mapping errors first, then `Row n: msg` for every row message
    pub fn messages(&self) -> Vec<String> {
        let mut out = self.mapping_errors.clone();
        for (index, errors) in &self.row_errors {
            out.extend(errors.iter().map(|e| format_row_error(*index, e)));
        }
        out
    }
}

/// target field -> source column
pub fn reverse_mappings(mappings: &Mappings) -> HashMap<&str, &str> {
    mappings
        .iter()
        .filter(|(_, target)| !target.trim().is_empty())
        .map(|(source, target)| (target.as_str(), source.as_str()))
        .collect()
}

/// Targets claimed by more than one source column, with those columns
pub fn duplicate_targets(mappings: &Mappings) -> BTreeMap<&str, Vec<&str>> {
    let mut by_target: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (source, target) in mappings {
        let target = target.trim();
        if !target.is_empty() {
            by_target.entry(target).or_default().push(source.as_str());
        }
    }
    by_target.retain(|_, sources| sources.len() > 1);
    by_target
}

/// Non-empty trimmed value of `field` in the row
pub fn field_value<'a>(row: &'a Row, reverse: &HashMap<&str, &str>, field: &str) -> Option<&'a str> {
    let source = reverse.get(field)?;
    row.get(*source)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

struct RowChecker<'a, L: ValidationLookup + ?Sized> {
    lookup: &'a L,
    options: &'a ImportOptions,
    seen_contracts: HashSet<String>,
    seen_emails: HashSet<String>,
    group_cache: HashMap<i32, bool>,
}

impl<'a, L: ValidationLookup + ?Sized> RowChecker<'a, L> {
    async fn check_contract(
        &mut self,
        row: &Row,
        reverse: &HashMap<&str, &str>,
        errors: &mut Vec<String>,
    ) -> anyhow::Result<()> {
        if let Some(amount) = field_value(row, reverse, "TotalAmount") {
            if values::parse_amount(amount).is_none() {
                errors.push(format!("Invalid total amount format: {}", amount));
            }
        }

        if let Some(status) = field_value(row, reverse, "Status") {
            if ContractStatus::from_alias(status).is_none() {
                errors.push(format!("Invalid status: {}", status));
            }
        }

        if let Some(kind) = field_value(row, reverse, "ContractType") {
            if ContractType::parse(kind).is_none() {
                errors.push(format!("Invalid contract type: {}", kind));
            }
        }

        for field in ["SaleStartDate", "SaleEndDate"] {
            if let Some(date) = field_value(row, reverse, field) {
                if values::parse_date_any(date, DateOrder::MonthFirst).is_none() {
                    errors.push(format!("Invalid date: {}", date));
                }
            }
        }

        if let Some(number) = field_value(row, reverse, "ContractNumber") {
            if !self.seen_contracts.insert(number.to_string()) {
                errors.push(format!("Duplicate contract number in file: {}", number));
            }
        }

        if !self.options.allow_auto_create_groups {
            if let Some(raw) = field_value(row, reverse, "GroupId") {
                if let Ok(id) = raw.parse::<i32>() {
                    if id != 0 && id < GROUP_LOOKUP_CEILING {
                        let exists = match self.group_cache.get(&id) {
                            Some(known) => *known,
                            None => {
                                let found = self.lookup.group_exists(id).await?;
                                self.group_cache.insert(id, found);
                                found
                            }
                        };
                        if !exists {
                            errors.push(format!("Group not found: {}", raw));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn check_user(
        &mut self,
        row: &Row,
        reverse: &HashMap<&str, &str>,
        errors: &mut Vec<String>,
    ) -> anyhow::Result<()> {
        let Some(email) = field_value(row, reverse, "Email") else {
            return Ok(());
        };
        if !is_valid_email(email) {
            errors.push(format!("Invalid email format: {}", email));
            return Ok(());
        }
        if !self.seen_emails.insert(email.to_lowercase()) {
            errors.push(format!("Duplicate email in file: {}", email));
        } else if self.lookup.email_exists(email).await? {
            errors.push(format!("Email already exists: {}", email));
        }
        Ok(())
    }
}

/// Проверка строк до выполнения импорта. Существующие номера контрактов ошибкой не считаются.
pub async fn validate_rows<L: ValidationLookup + ?Sized>(
    rows: &[Row],
    mappings: &Mappings,
    template: &ImportTemplate,
    options: &ImportOptions,
    lookup: &L,
) -> anyhow::Result<ValidationReport> {
    let reverse = reverse_mappings(mappings);
    let mut report = ValidationReport::default();

    let mapped_required: Vec<&str> = template
        .required_fields
        .iter()
        .map(String::as_str)
        .filter(|field| {
            let mapped = reverse.contains_key(field);
            if !mapped {
                report
                    .mapping_errors
                    .push(format!("Missing required field mapping: {}", field));
            }
            mapped
        })
        .collect();

    let mut checker = RowChecker {
        lookup,
        options,
        seen_contracts: HashSet::new(),
        seen_emails: HashSet::new(),
        group_cache: HashMap::new(),
    };

    for (index, row) in rows.iter().enumerate() {
        let mut errors = Vec::new();

        let missing: Vec<&str> = mapped_required
            .iter()
            .copied()
            .filter(|field| field_value(row, &reverse, field).is_none())
            .collect();
        let only_contract_number = missing == ["ContractNumber"];
        if !(options.skip_missing_contract_number && only_contract_number) {
            errors.extend(
                missing
                    .iter()
                    .map(|field| format!("Missing required value for field: {}", field)),
            );
        }

        match template.entity_type {
            EntityType::Contract => checker.check_contract(row, &reverse, &mut errors).await?,
            EntityType::User => checker.check_user(row, &reverse, &mut errors).await?,
        }

        if !errors.is_empty() {
            report.row_errors.insert(index, errors);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::u501_file_import::templates::{self, CONTRACTS_TEMPLATE_ID, USERS_TEMPLATE_ID};

    struct FakeLookup {
        groups: Vec<i32>,
        emails: Vec<&'static str>,
    }

    #[async_trait]
    impl ValidationLookup for FakeLookup {
        async fn group_exists(&self, id: i32) -> anyhow::Result<bool> {
            Ok(self.groups.contains(&id))
        }

        async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
            Ok(self.emails.iter().any(|e| e.eq_ignore_ascii_case(email)))
        }
    }

    fn lookup() -> FakeLookup {
        FakeLookup {
            groups: vec![7],
            emails: vec!["taken@example.com"],
        }
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn identity(fields: &[&str]) -> Mappings {
        fields
            .iter()
            .map(|f| (f.to_string(), f.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_contract_rows() {
        let template = templates::get(CONTRACTS_TEMPLATE_ID).unwrap();
        let mappings = identity(&["ContractNumber", "UserEmail", "TotalAmount", "GroupId", "Status", "SaleStartDate"]);
        let rows = vec![
            row(&[("ContractNumber", "C-1"), ("UserEmail", "a@x.com"), ("TotalAmount", "1.500,00"), ("GroupId", "7"), ("Status", "NCONT 1 AT"), ("SaleStartDate", "31/12/2024")]),
            row(&[("ContractNumber", "C-1"), ("UserEmail", "a@x.com"), ("TotalAmount", "abc"), ("GroupId", "8"), ("Status", "weird")]),
            row(&[("ContractNumber", ""), ("UserEmail", "a@x.com"), ("TotalAmount", "10"), ("GroupId", "12345")]),
        ];

        let report = validate_rows(&rows, &mappings, &template, &ImportOptions::default(), &lookup())
            .await
            .unwrap();

        assert!(report.mapping_errors.is_empty());
        assert!(!report.row_errors.contains_key(&0));
        let second = &report.row_errors[&1];
        assert!(second.contains(&"Invalid total amount format: abc".to_string()));
        assert!(second.contains(&"Invalid status: weird".to_string()));
        assert!(second.contains(&"Duplicate contract number in file: C-1".to_string()));
        assert!(second.contains(&"Group not found: 8".to_string()));
        assert_eq!(
            report.row_errors[&2],
            vec!["Missing required value for field: ContractNumber".to_string()]
        );
        assert_eq!(report.failed_rows(), 2);
        assert!(report.messages().iter().any(|m| m.starts_with("Row 3: ")));
    }

    #[tokio::test]
    async fn test_skip_and_auto_create_options() {
        let template = templates::get(CONTRACTS_TEMPLATE_ID).unwrap();
        let mappings = identity(&["ContractNumber", "UserEmail", "TotalAmount", "GroupId"]);
        let rows = vec![row(&[("ContractNumber", ""), ("UserEmail", "a@x.com"), ("TotalAmount", "10"), ("GroupId", "99")])];
        let options = ImportOptions {
            allow_auto_create_groups: true,
            skip_missing_contract_number: true,
            ..Default::default()
        };

        let report = validate_rows(&rows, &mappings, &template, &options, &lookup())
            .await
            .unwrap();
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_missing_mapping_is_reported_once() {
        let template = templates::get(CONTRACTS_TEMPLATE_ID).unwrap();
        let mappings = identity(&["ContractNumber", "TotalAmount"]);
        let rows = vec![row(&[("ContractNumber", "C-9"), ("TotalAmount", "5")])];

        let report = validate_rows(&rows, &mappings, &template, &ImportOptions::default(), &lookup())
            .await
            .unwrap();
        assert_eq!(
            report.mapping_errors,
            vec!["Missing required field mapping: UserEmail".to_string()]
        );
        assert!(report.row_errors.is_empty());
    }

    #[tokio::test]
    async fn test_user_rows() {
        let template = templates::get(USERS_TEMPLATE_ID).unwrap();
        let mut mappings = Mappings::new();
        mappings.insert("Nome".into(), "Name".into());
        mappings.insert("E-mail".into(), "Email".into());
        let rows = vec![
            row(&[("Nome", "Ana"), ("E-mail", "ana@example.com")]),
            row(&[("Nome", "Ana 2"), ("E-mail", "ANA@example.com")]),
            row(&[("Nome", "Bia"), ("E-mail", "not-an-email")]),
            row(&[("Nome", "Caio"), ("E-mail", "taken@example.com")]),
        ];

        let report = validate_rows(&rows, &mappings, &template, &ImportOptions::default(), &lookup())
            .await
            .unwrap();
        assert!(!report.row_errors.contains_key(&0));
        assert_eq!(report.row_errors[&1], vec!["Duplicate email in file: ANA@example.com".to_string()]);
        assert_eq!(report.row_errors[&2], vec!["Invalid email format: not-an-email".to_string()]);
        assert_eq!(report.row_errors[&3], vec!["Email already exists: taken@example.com".to_string()]);
    }

    #[test]
    fn test_duplicate_targets() {
        let mut mappings = Mappings::new();
        mappings.insert("Valor".into(), "TotalAmount".into());
        mappings.insert("Valor Bem".into(), "TotalAmount".into());
        mappings.insert("Contrato".into(), "ContractNumber".into());

        let dups = duplicate_targets(&mappings);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups["TotalAmount"], vec!["Valor", "Valor Bem"]);

        mappings.remove("Valor Bem");
        assert!(duplicate_targets(&mappings).is_empty());
    }
}
