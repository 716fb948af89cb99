use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::domain::a001_user::aggregate::UserRole;
use contracts::domain::a003_point_of_sale::aggregate::PointOfSale;
use contracts::domain::a005_contract::aggregate::ContractDraft;
use contracts::domain::a005_contract::status::{ContractStatus, ContractType};
use contracts::domain::a006_contract_metadata::aggregate::{
    METADATA_CATEGORY, METADATA_PLANO_VENDA,
};
use contracts::usecases::u501_file_import::ImportOptions;
use sea_orm::DatabaseTransaction;
use std::collections::HashMap;

use super::file_parser::Row;
use super::values::{self, DateOrder};
use crate::domain::a001_user::{self, service::is_valid_email};
use crate::domain::a005_contract::repository::UpsertOutcome;
use crate::domain::{
    a002_group, a003_point_of_sale, a004_user_matricula, a005_contract, a006_contract_metadata,
};

const MISSING_REQUIRED: &str = "Missing required fields";

/// Ошибка обработки строки
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    /// Строка отклонена, импорт продолжается
    #[error("{0}")]
    Invalid(String),
    /// Infrastructure failure, aborts the whole run
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

fn invalid(message: impl Into<String>) -> RowError {
    RowError::Invalid(message.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    CreatedContract,
    UpdatedContract,
    CreatedUser,
    Skipped,
}

/// Параметры запуска, общие для всех строк
pub struct ImportContext {
    pub session_id: i32,
    pub upload_id: String,
    pub options: ImportOptions,
    pub date_order: DateOrder,
    pub send_emails: bool,
    /// target field -> source column
    pub reverse: HashMap<String, String>,
}

impl ImportContext {
    /// Non-empty trimmed value of a target field
    pub fn value<'r>(&self, row: &'r Row, field: &str) -> Option<&'r str> {
        let source = self.reverse.get(field)?;
        row.get(source).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    fn require<'r>(&self, row: &'r Row, field: &str) -> Result<&'r str, RowError> {
        self.value(row, field).ok_or_else(|| invalid(MISSING_REQUIRED))
    }
}

/// Группы и PV, созданные за время выполнения, без повторов, в порядке создания
#[derive(Debug, Default)]
pub struct CreatedRecords {
    pub groups: Vec<String>,
    pub pvs: Vec<String>,
}

impl CreatedRecords {
    fn add_group(&mut self, name: &str) {
        if !self.groups.iter().any(|g| g == name) {
            self.groups.push(name.to_string());
        }
    }

    fn add_pv(&mut self, name: &str) {
        if !self.pvs.iter().any(|p| p == name) {
            self.pvs.push(name.to_string());
        }
    }

    /// Records of a committed row join the run totals
    pub fn absorb(&mut self, row: CreatedRecords) {
        row.groups.iter().for_each(|g| self.add_group(g));
        row.pvs.iter().for_each(|p| self.add_pv(p));
    }
}

/// Импорт одной строки файла в доменные агрегаты.
/// Все чтения и записи строки идут через `db`: строка фиксируется или откатывается целиком.
#[async_trait]
pub trait RowImporter: Send + Sync {
    async fn import_row(
        &self,
        db: &DatabaseTransaction,
        row: &Row,
        ctx: &ImportContext,
        created: &mut CreatedRecords,
    ) -> Result<RowOutcome, RowError>;
}

// ---------------------------------------------------------------------------
// shared resolution
// ---------------------------------------------------------------------------

/// `0` or empty means no group; numbers are tried as id, then as name
async fn resolve_group(
    db: &DatabaseTransaction,
    raw: Option<&str>,
    ctx: &ImportContext,
    created: &mut CreatedRecords,
) -> Result<Option<i32>, RowError> {
    let Some(raw) = raw.filter(|v| *v != "0") else {
        return Ok(None);
    };

    if let Ok(id) = raw.parse::<i32>() {
        if let Some(group) = a002_group::repository::get_active_by_id(db, id).await? {
            return Ok(Some(group.id));
        }
    }
    if let Some(group) = a002_group::repository::find_active_by_name(db, raw).await? {
        return Ok(Some(group.id));
    }

    if !ctx.options.allow_auto_create_groups {
        return Err(invalid(format!("Group not found: {}", raw)));
    }
    let group = a002_group::repository::insert(db, raw, Some(ctx.session_id)).await?;
    tracing::info!("Import {}: created group '{}' (id {})", ctx.upload_id, group.name, group.id);
    created.add_group(&group.name);
    Ok(Some(group.id))
}

/// PV по идентификатору из файла; при отсутствии создаётся (если разрешено)
async fn resolve_pv(
    db: &DatabaseTransaction,
    raw_id: Option<&str>,
    raw_name: Option<&str>,
    missing_is_error: bool,
    ctx: &ImportContext,
    created: &mut CreatedRecords,
) -> Result<Option<i32>, RowError> {
    let Some(raw_id) = raw_id else {
        return Ok(None);
    };
    let id: i32 = raw_id
        .parse()
        .map_err(|_| invalid(format!("Invalid PV id: {}", raw_id)))?;

    if let Some(pv) = a003_point_of_sale::repository::get_by_id(db, id).await? {
        return Ok(Some(pv.id));
    }

    if ctx.options.allow_auto_create_pvs {
        let name = raw_name
            .map(str::to_string)
            .unwrap_or_else(|| PointOfSale::default_name(id));
        let pv = a003_point_of_sale::repository::insert(db, id, &name).await?;
        tracing::info!("Import {}: created PV {} '{}'", ctx.upload_id, pv.id, pv.name);
        created.add_pv(&pv.name);
        return Ok(Some(pv.id));
    }

    if missing_is_error {
        return Err(invalid(format!("PV not found: {}", raw_id)));
    }
    tracing::debug!("Import {}: PV {} not found, left empty", ctx.upload_id, id);
    Ok(None)
}

fn parse_amount(raw: &str) -> Result<f64, RowError> {
    values::parse_amount(raw).ok_or_else(|| invalid(format!("Invalid total amount: {}", raw)))
}

fn parse_status(raw: Option<&str>) -> Result<ContractStatus, RowError> {
    match raw {
        None => Ok(ContractStatus::Active),
        Some(v) => {
            ContractStatus::from_alias(v).ok_or_else(|| invalid(format!("Invalid status: {}", v)))
        }
    }
}

/// Preferred day/month order first, then the other one
fn parse_date(raw: Option<&str>, order: DateOrder) -> Result<Option<DateTime<Utc>>, RowError> {
    raw.map(|v| {
        values::parse_date_any(v, order).ok_or_else(|| invalid(format!("Invalid date: {}", v)))
    })
    .transpose()
}

fn parse_contract_type(raw: Option<&str>) -> Result<Option<ContractType>, RowError> {
    raw.map(|v| {
        ContractType::parse(v).ok_or_else(|| invalid(format!("Invalid contract type: {}", v)))
    })
    .transpose()
}

async fn upsert(
    db: &DatabaseTransaction,
    draft: &ContractDraft,
    ctx: &ImportContext,
) -> Result<RowOutcome, RowError> {
    let outcome = match a005_contract::repository::upsert(db, draft, &ctx.upload_id).await? {
        UpsertOutcome::Created(_) => RowOutcome::CreatedContract,
        UpsertOutcome::Updated(_) => RowOutcome::UpdatedContract,
    };
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Шаблон Contracts: владелец контракта задаётся email
pub struct ContractImporter;

#[async_trait]
impl RowImporter for ContractImporter {
    async fn import_row(
        &self,
        db: &DatabaseTransaction,
        row: &Row,
        ctx: &ImportContext,
        created: &mut CreatedRecords,
    ) -> Result<RowOutcome, RowError> {
        let Some(number) = ctx.value(row, "ContractNumber") else {
            if ctx.options.skip_missing_contract_number {
                return Ok(RowOutcome::Skipped);
            }
            return Err(invalid(MISSING_REQUIRED));
        };
        let email = ctx.require(row, "UserEmail")?;
        let amount_raw = ctx.require(row, "TotalAmount")?;

        let user = a001_user::repository::find_active_by_email(db, email)
            .await?
            .ok_or_else(|| invalid(format!("User not found or inactive: {}", email)))?;
        let total_amount = parse_amount(amount_raw)?;
        let status = parse_status(ctx.value(row, "Status"))?;
        let sale_start_date = parse_date(ctx.value(row, "SaleStartDate"), ctx.date_order)?;
        let sale_end_date = parse_date(ctx.value(row, "SaleEndDate"), ctx.date_order)?;
        let contract_type = parse_contract_type(ctx.value(row, "ContractType"))?;

        // lookups that may create records go after every pure field check
        let pv_id = resolve_pv(db, ctx.value(row, "PvId"), None, true, ctx, created).await?;
        let group_id = resolve_group(db, ctx.value(row, "GroupId"), ctx, created).await?;

        let draft = ContractDraft {
            contract_number: number.to_string(),
            user_id: Some(user.id),
            total_amount,
            group_id,
            status,
            sale_start_date,
            sale_end_date,
            pv_id,
            customer_name: ctx.value(row, "CustomerName").map(str::to_string),
            contract_type,
            quota: ctx.value(row, "Quota").map(str::to_string),
            ..Default::default()
        };
        upsert(db, &draft, ctx).await
    }
}

// ---------------------------------------------------------------------------
// contractDashboard
// ---------------------------------------------------------------------------

/// Выгрузка дашборда: без email, владелец определяется по матрикуле
pub struct DashboardImporter;

const DASHBOARD_REQUIRED: [&str; 5] = [
    "TotalAmount",
    "SaleStartDate",
    "GroupId",
    "Quota",
    "CustomerName",
];

#[async_trait]
impl RowImporter for DashboardImporter {
    async fn import_row(
        &self,
        db: &DatabaseTransaction,
        row: &Row,
        ctx: &ImportContext,
        created: &mut CreatedRecords,
    ) -> Result<RowOutcome, RowError> {
        let Some(number) = ctx.value(row, "ContractNumber") else {
            if ctx.options.skip_missing_contract_number {
                return Ok(RowOutcome::Skipped);
            }
            return Err(invalid(MISSING_REQUIRED));
        };
        for field in DASHBOARD_REQUIRED {
            ctx.require(row, field)?;
        }

        let total_amount = parse_amount(ctx.require(row, "TotalAmount")?)?;
        let status = parse_status(ctx.value(row, "Status"))?;
        let sale_start_date = parse_date(ctx.value(row, "SaleStartDate"), ctx.date_order)?;
        let pv_id = resolve_pv(
            db,
            ctx.value(row, "PvId"),
            ctx.value(row, "PvName"),
            false,
            ctx,
            created,
        )
        .await?;

        let (matricula_id, user_id) = match ctx.value(row, "Matricula") {
            Some(number) => {
                match a004_user_matricula::repository::find_active_by_number(db, number).await? {
                    Some(m) => (Some(m.id), Some(m.user_id)),
                    None => {
                        tracing::warn!("Import {}: matricula {} not found", ctx.upload_id, number);
                        (None, None)
                    }
                }
            }
            None => (None, None),
        };

        let category_id = match ctx.value(row, "Category") {
            Some(v) => Some(
                a006_contract_metadata::repository::get_or_create(db, METADATA_CATEGORY, v)
                    .await?
                    .id,
            ),
            None => None,
        };
        let plano_venda_id = match ctx.value(row, "PlanoVenda") {
            Some(v) => Some(
                a006_contract_metadata::repository::get_or_create(db, METADATA_PLANO_VENDA, v)
                    .await?
                    .id,
            ),
            None => None,
        };
        let group_id = resolve_group(db, ctx.value(row, "GroupId"), ctx, created).await?;

        let draft = ContractDraft {
            contract_number: number.to_string(),
            user_id,
            total_amount,
            group_id,
            status,
            sale_start_date,
            sale_end_date: None,
            pv_id,
            customer_name: ctx.value(row, "CustomerName").map(str::to_string),
            contract_type: None,
            quota: ctx.value(row, "Quota").map(str::to_string),
            matricula_id,
            category_id,
            plano_venda_id,
        };
        upsert(db, &draft, ctx).await
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub struct UserImporter;

#[async_trait]
impl RowImporter for UserImporter {
    async fn import_row(
        &self,
        db: &DatabaseTransaction,
        row: &Row,
        ctx: &ImportContext,
        _created: &mut CreatedRecords,
    ) -> Result<RowOutcome, RowError> {
        let name = ctx.require(row, "Name")?;
        let email = ctx.require(row, "Email")?;

        if !is_valid_email(email) {
            return Err(invalid(format!("Invalid email format: {}", email)));
        }
        if a001_user::repository::email_exists(db, email).await? {
            return Err(invalid(format!("Email already exists: {}", email)));
        }

        let role = match ctx.value(row, "Role") {
            Some(v) => UserRole::parse(v).ok_or_else(|| invalid(format!("Invalid role: {}", v)))?,
            None => UserRole::User,
        };

        let parent_user_id = match ctx.value(row, "ParentEmail") {
            Some(parent_email) => Some(
                a001_user::repository::find_by_email(db, parent_email)
                    .await?
                    .ok_or_else(|| invalid(format!("Parent user not found: {}", parent_email)))?
                    .id,
            ),
            None => None,
        };

        let matricula = ctx.value(row, "Matricula");
        let is_owner = ctx.value(row, "IsMatriculaOwner").is_some_and(values::parse_bool);
        if let (Some(number), true) = (matricula, is_owner) {
            if a004_user_matricula::repository::find_active_owner(db, number)
                .await?
                .is_some()
            {
                return Err(invalid(format!("Matricula {} already has an owner", number)));
            }
        }

        let created_user = a001_user::service::create_imported_user(
            db,
            name.to_string(),
            ctx.value(row, "Surname").map(str::to_string),
            email.to_string(),
            role,
            parent_user_id,
            ctx.session_id,
        )
        .await?;

        if let Some(number) = matricula {
            a004_user_matricula::repository::insert(
                db,
                &created_user.user.id,
                number,
                is_owner,
                Some(ctx.session_id),
            )
            .await?;
        }

        let send_email = ctx.send_emails || ctx.value(row, "SendEmail").is_some_and(values::parse_bool);
        if send_email {
            a001_user::service::queue_welcome_email(db, &created_user, ctx.session_id).await?;
        }

        tracing::debug!("Import {}: created user {}", ctx.upload_id, created_user.user.email);
        Ok(RowOutcome::CreatedUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_date_falls_back_to_other_order() {
        let date = parse_date(Some("31/12/2024"), DateOrder::MonthFirst)
            .unwrap()
            .unwrap();
        assert_eq!(date.date_naive(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        let date = parse_date(Some("02/03/2024"), DateOrder::MonthFirst)
            .unwrap()
            .unwrap();
        assert_eq!(date.date_naive(), NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());

        assert!(parse_date(None, DateOrder::DayFirst).unwrap().is_none());
        assert!(matches!(
            parse_date(Some("31/31/2024"), DateOrder::MonthFirst),
            Err(RowError::Invalid(ref m)) if m == "Invalid date: 31/31/2024"
        ));
    }

    #[test]
    fn test_absorb_keeps_first_seen_order() {
        let mut run = CreatedRecords::default();
        run.add_group("Norte");

        let mut row = CreatedRecords::default();
        row.add_group("Sul");
        row.add_group("Norte");
        row.add_pv("PV 7");
        run.absorb(row);

        assert_eq!(run.groups, vec!["Norte", "Sul"]);
        assert_eq!(run.pvs, vec!["PV 7"]);
    }
}
