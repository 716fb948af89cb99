use anyhow::{anyhow, bail, Context};
use calamine::{Data, DataType, Reader, Xlsx};
use std::collections::BTreeMap;
use std::io::Cursor;

use super::delimiter;

/// Строка файла: имя колонки -> значение
pub type Row = BTreeMap<String, String>;

/// Stop reading a worksheet after this many empty rows in a row
const MAX_CONSECUTIVE_EMPTY_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Csv,
    Xlsx,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Xlsx => "xlsx",
        }
    }
}

/// Разобранный файл: колонки в исходном порядке и строки
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ParsedFile {
    fn push_column(&mut self, name: &str) -> bool {
        if name.is_empty() || self.columns.iter().any(|c| c == name) {
            return false;
        }
        self.columns.push(name.to_string());
        true
    }
}

pub fn detect_file_type(file_name: &str) -> anyhow::Result<FileType> {
    let lower = file_name.trim().to_lowercase();
    if lower.ends_with(".csv") {
        Ok(FileType::Csv)
    } else if lower.ends_with(".xlsx") {
        Ok(FileType::Xlsx)
    } else {
        bail!("Unsupported file type. Use .csv or .xlsx")
    }
}

pub fn parse(file_type: FileType, bytes: &[u8]) -> anyhow::Result<ParsedFile> {
    match file_type {
        FileType::Csv => parse_csv(bytes),
        FileType::Xlsx => parse_xlsx(bytes),
    }
}

/// Header positions that survive: non-empty and first occurrence of each name
fn header_slots(parsed: &mut ParsedFile, headers: &[String]) -> Vec<Option<String>> {
    headers
        .iter()
        .map(|h| {
            let name = h.trim();
            if parsed.push_column(name) {
                Some(name.to_string())
            } else {
                if !name.is_empty() {
                    tracing::warn!("Duplicate column '{}' ignored", name);
                }
                None
            }
        })
        .collect()
}

fn build_row<'a>(slots: &[Option<String>], values: impl Iterator<Item = &'a str>) -> Option<Row> {
    let mut row = Row::new();
    let mut values = values;
    let mut any = false;
    for slot in slots {
        let value = values.next().unwrap_or("").trim();
        if let Some(name) = slot {
            any |= !value.is_empty();
            row.insert(name.clone(), value.to_string());
        }
    }
    any.then_some(row)
}

pub fn parse_csv(bytes: &[u8]) -> anyhow::Result<ParsedFile> {
    let text = String::from_utf8_lossy(bytes);
    let text = delimiter::strip_bom(&text);
    let delimiter = delimiter::detect_delimiter(text)?;

    // Строку-подсказку `sep=` csv-ридеру не отдаём
    let body = match text.split_once('\n') {
        Some((first, rest)) if delimiter::sep_hint(first).is_some() => rest,
        _ => text,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut parsed = ParsedFile::default();
    let slots = header_slots(&mut parsed, &headers);
    if parsed.columns.is_empty() {
        bail!("File has no column headers");
    }

    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Invalid CSV at line {}", idx + 2))?;
        if let Some(row) = build_row(&slots, record.iter()) {
            parsed.rows.push(row);
        }
    }

    Ok(parsed)
}

/// Значение ячейки в текстовом виде
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

pub fn parse_xlsx(bytes: &[u8]) -> anyhow::Result<ParsedFile> {
    let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| anyhow!("Failed to open XLSX file: {}", e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("Workbook has no worksheets"))?
        .map_err(|e| anyhow!("Failed to read first worksheet: {}", e))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        bail!("File has no column headers");
    };

    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();
    let mut parsed = ParsedFile::default();
    let slots = header_slots(&mut parsed, &headers);
    if parsed.columns.is_empty() {
        bail!("File has no column headers");
    }

    let mut empty_streak = 0;
    for cells in rows {
        let values: Vec<String> = cells.iter().map(cell_to_string).collect();
        match build_row(&slots, values.iter().map(String::as_str)) {
            Some(row) => {
                empty_streak = 0;
                parsed.rows.push(row);
            }
            None => {
                empty_streak += 1;
                if empty_streak >= MAX_CONSECUTIVE_EMPTY_ROWS {
                    break;
                }
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_file_type() {
        assert_eq!(detect_file_type("vendas.CSV").unwrap(), FileType::Csv);
        assert_eq!(detect_file_type("dashboard.xlsx").unwrap(), FileType::Xlsx);
        let err = detect_file_type("report.xls").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type. Use .csv or .xlsx");
    }

    #[test]
    fn test_parse_csv_trims_and_skips_empty_rows() {
        let csv = "ContractNumber , TotalAmount,Status\n C-1 , 1500 ,active\n,,\nC-2,200,late1\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.columns, vec!["ContractNumber", "TotalAmount", "Status"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0]["ContractNumber"], "C-1");
        assert_eq!(parsed.rows[0]["TotalAmount"], "1500");
        assert_eq!(parsed.rows[1]["Status"], "late1");
    }

    #[test]
    fn test_parse_csv_semicolon_with_bom_and_sep_line() {
        let csv = "\u{feff}sep=;\nCota;Valor\n12153;001;0;MARIA;C-77;1500,50\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.columns, vec!["Cota", "Valor"]);
        // the row has more fields than the header; extra ones are dropped
        assert_eq!(parsed.rows[0]["Cota"], "12153");
        assert_eq!(parsed.rows[0]["Valor"], "001");
    }

    #[test]
    fn test_parse_csv_tab_sep_line() {
        let csv = "sep=\t\r\nContrato\tValor\r\nC-1\t1500,50\r\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.columns, vec!["Contrato", "Valor"]);
        assert_eq!(parsed.rows[0]["Contrato"], "C-1");
        assert_eq!(parsed.rows[0]["Valor"], "1500,50");
    }

    #[test]
    fn test_parse_csv_short_rows_and_blank_headers() {
        let csv = "Name,,Email\nAna\nBruno,x,bruno@example.com\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.columns, vec!["Name", "Email"]);
        assert_eq!(parsed.rows[0]["Email"], "");
        assert_eq!(parsed.rows[1]["Email"], "bruno@example.com");
    }

    #[test]
    fn test_parse_csv_quoted_values() {
        let csv = "Name;Email\n\"Silva; Ana\";ana@example.com\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.rows[0]["Name"], "Silva; Ana");
    }

    #[test]
    fn test_parse_xlsx_rejects_garbage() {
        assert!(parse_xlsx(b"definitely not a zip archive").is_err());
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(cell_to_string(&Data::Float(150050.0)), "150050");
        assert_eq!(cell_to_string(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_to_string(&Data::String("  x ".into())), "x");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }
}
