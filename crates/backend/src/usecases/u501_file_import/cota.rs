use super::file_parser::ParsedFile;

pub const COTA_COLUMN: &str = "Cota";

pub const COTA_GROUP: &str = "cota.group";
pub const COTA_QUOTA: &str = "cota.cota";
pub const COTA_CUSTOMER: &str = "cota.customer";
pub const COTA_CONTRACT: &str = "cota.contract";

pub const VIRTUAL_COLUMNS: [&str; 4] = [COTA_GROUP, COTA_QUOTA, COTA_CUSTOMER, COTA_CONTRACT];

/// Части составного значения Cota: группа, квота, клиент, номер контракта
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CotaParts {
    pub group: String,
    pub quota: String,
    pub customer: String,
    pub contract: String,
}

/// `12153;001;0;MARIA SILVA;...;C-77` -> group=12153, quota=001, customer=MARIA SILVA, contract=C-77
pub fn split_cota(value: &str) -> Option<CotaParts> {
    let parts: Vec<&str> = value.split(';').map(str::trim).collect();
    if parts.len() < 5 {
        return None;
    }
    Some(CotaParts {
        group: parts[0].to_string(),
        quota: parts[1].to_string(),
        customer: parts[3].to_string(),
        contract: parts[parts.len() - 1].to_string(),
    })
}

/// Adds the four virtual `cota.*` columns to every row of a dashboard upload.
/// Rows with a splittable Cota value get its parts; the others keep what they had, or "".
/// Returns the number of rows that were split.
pub fn apply(parsed: &mut ParsedFile) -> usize {
    let source = parsed
        .columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(COTA_COLUMN))
        .cloned();

    let mut split = 0usize;
    let mut unsplit = 0usize;
    for row in parsed.rows.iter_mut() {
        for column in VIRTUAL_COLUMNS {
            row.entry(column.to_string()).or_default();
        }
        let Some(value) = source.as_ref().and_then(|s| row.get(s)).filter(|v| !v.trim().is_empty())
        else {
            continue;
        };
        match split_cota(value) {
            Some(parts) => {
                row.insert(COTA_GROUP.to_string(), parts.group);
                row.insert(COTA_QUOTA.to_string(), parts.quota);
                row.insert(COTA_CUSTOMER.to_string(), parts.customer);
                row.insert(COTA_CONTRACT.to_string(), parts.contract);
                split += 1;
            }
            None => unsplit += 1,
        }
    }

    for column in VIRTUAL_COLUMNS {
        if !parsed.columns.iter().any(|c| c == column) {
            parsed.columns.push(column.to_string());
        }
    }

    if unsplit > 0 {
        tracing::warn!("Cota column: {} row(s) could not be split", unsplit);
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::u501_file_import::file_parser::Row;

    #[test]
    fn test_split_cota() {
        let parts = split_cota("12153; 001 ;0;MARIA SILVA;X;C-77").unwrap();
        assert_eq!(parts.group, "12153");
        assert_eq!(parts.quota, "001");
        assert_eq!(parts.customer, "MARIA SILVA");
        assert_eq!(parts.contract, "C-77");
        assert!(split_cota("12153;001;0;MARIA").is_none());
    }

    #[test]
    fn test_apply_adds_virtual_columns() {
        let mut row = Row::new();
        row.insert("COTA".into(), "500;12;0;JOAO;9;CT-1".into());
        let mut short = Row::new();
        short.insert("COTA".into(), "500;12".into());
        let mut parsed = ParsedFile {
            columns: vec!["COTA".into()],
            rows: vec![row, short],
        };

        assert_eq!(apply(&mut parsed), 1);
        assert_eq!(parsed.columns.len(), 5);
        assert_eq!(parsed.rows[0][COTA_CONTRACT], "CT-1");
        assert_eq!(parsed.rows[0][COTA_CUSTOMER], "JOAO");
        assert_eq!(parsed.rows[1][COTA_GROUP], "");
    }

    #[test]
    fn test_apply_without_cota_column() {
        let mut row = Row::new();
        row.insert("Valor".into(), "10".into());
        let mut parsed = ParsedFile {
            columns: vec!["Valor".into()],
            rows: vec![row],
        };

        assert_eq!(apply(&mut parsed), 0);
        assert_eq!(
            parsed.columns,
            vec!["Valor", COTA_GROUP, COTA_QUOTA, COTA_CUSTOMER, COTA_CONTRACT]
        );
        assert_eq!(parsed.rows[0][COTA_GROUP], "");
        assert_eq!(parsed.rows[0][COTA_CONTRACT], "");
    }

    #[test]
    fn test_apply_keeps_existing_virtual_values() {
        let mut row = Row::new();
        row.insert(COTA_CONTRACT.into(), "C-9".into());
        let mut parsed = ParsedFile {
            columns: vec![COTA_CONTRACT.into()],
            rows: vec![row],
        };

        assert_eq!(apply(&mut parsed), 0);
        assert_eq!(parsed.rows[0][COTA_CONTRACT], "C-9");
        assert_eq!(parsed.columns.iter().filter(|c| *c == COTA_CONTRACT).count(), 1);
    }
}
