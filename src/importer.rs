use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::accounts::{AccountFormat, AccountRegistry};
use crate::error::{Result, TallyError};
use crate::models::{StatementTable, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
}

fn malformed(path: &Path, reason: impl Into<String>) -> TallyError {
    TallyError::MalformedStatement {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Drops the first `n` physical lines of a text export, blank lines included.
fn skip_lines(text: &str, n: usize) -> String {
    if n == 0 {
        return text.to_string();
    }
    text.lines().skip(n).collect::<Vec<_>>().join("\n")
}

// ---------------------------------------------------------------------------
// Input discovery
// ---------------------------------------------------------------------------

/// Account identifiers (file stems) of every statement in `dir`, sorted and de-duplicated.
pub fn list_statements(dir: &Path) -> Result<Vec<String>> {
    info!("List all files in the input folder: {}", dir.display());
    let mut stems = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.starts_with('.') {
            continue;
        }
        stems.insert(stem.to_string());
    }
    if stems.is_empty() {
        return Err(TallyError::EmptyInput(dir.to_path_buf()));
    }
    Ok(stems.into_iter().collect())
}

// ---------------------------------------------------------------------------
// read_statement
// ---------------------------------------------------------------------------

/// Loads the statement for `identifier` from `dir` using the format its registry entry names.
/// The returned table carries the canonical account name.
pub fn read_statement(dir: &Path, identifier: &str, registry: &AccountRegistry) -> Result<StatementTable> {
    let resolved = registry.resolve(identifier);
    let path: PathBuf = dir.join(format!("{}.{}", resolved.identifier, resolved.format.extension()));
    info!("Importing: {identifier} as {}", resolved.account);

    if !path.is_file() {
        return Err(TallyError::MissingStatement(path));
    }

    let (headers, rows) = match resolved.format {
        AccountFormat::DelimitedWithOffset { delimiter, skip_rows, .. } => {
            read_delimited(&path, *delimiter, *skip_rows)?
        }
        AccountFormat::PlainDelimited { delimiter, .. } => read_delimited(&path, *delimiter, 0)?,
        AccountFormat::SpreadsheetWithOffset { skip_rows, .. } => read_spreadsheet(&path, *skip_rows)?,
    };
    debug!("{}: {} columns, {} rows", path.display(), headers.len(), rows.len());

    let mut table = StatementTable::new(&resolved.account, headers, resolved.format.locale());
    table.rows = rows;
    Ok(table)
}

type RawRows = (Vec<String>, Vec<Vec<Value>>);

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

fn read_delimited(path: &Path, delimiter: char, skip_rows: usize) -> Result<RawRows> {
    if !delimiter.is_ascii() {
        return Err(malformed(path, format!("delimiter '{delimiter}' is not a single byte")));
    }
    let bytes = std::fs::read(path)?;
    let raw = String::from_utf8_lossy(&bytes);
    let text: &str = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    let body = skip_lines(text, skip_rows);
    parse_delimited(path, &body, delimiter as u8)
}

fn parse_delimited(path: &Path, body: &str, delimiter: u8) -> Result<RawRows> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| malformed(path, e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(malformed(path, "no header row"));
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| malformed(path, e.to_string()))?;
        if record.len() > headers.len() {
            let line = record.position().map_or(0, |p| p.line());
            return Err(malformed(
                path,
                format!("line {line}: expected {} fields, saw {}", headers.len(), record.len()),
            ));
        }
        let mut row: Vec<Value> = record.iter().map(Value::text).collect();
        row.resize(headers.len(), Value::Empty);
        rows.push(row);
    }
    Ok((headers, rows))
}

// ---------------------------------------------------------------------------
// Spreadsheet (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "spreadsheet")]
fn read_spreadsheet(path: &Path, skip_rows: usize) -> Result<RawRows> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path).map_err(|e| malformed(path, e.to_string()))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| malformed(path, "workbook has no sheets"))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| malformed(path, e.to_string()))?;

    // The range begins at the first non-empty row, not at row 0.
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let mut rows_iter = range.rows().skip(skip_rows.saturating_sub(first_row));

    let headers: Vec<String> = rows_iter
        .next()
        .ok_or_else(|| malformed(path, "no header row"))?
        .iter()
        .map(|c| c.to_string())
        .collect();

    let rows = rows_iter
        .map(|row| row.iter().map(cell_value).collect())
        .collect();
    Ok((headers, rows))
}

#[cfg(feature = "spreadsheet")]
fn cell_value(cell: &calamine::Data) -> Value {
    use calamine::Data;
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal::Decimal;

    match cell {
        Data::Empty | Data::Error(_) => Value::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Value::text(s),
        Data::Int(i) => Value::Number(Decimal::from(*i)),
        Data::Float(f) => Decimal::from_f64(*f).map_or(Value::Empty, Value::Number),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map_or(Value::Empty, Value::Date),
    }
}

#[cfg(not(feature = "spreadsheet"))]
fn read_spreadsheet(path: &Path, _skip_rows: usize) -> Result<RawRows> {
    Err(TallyError::UnsupportedFormat(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), NaiveDate::from_ymd_opt(2025, 1, 10));
    }

    #[test]
    fn test_list_statements_sorted_stems() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "rbs.csv", "");
        write(dir.path(), "bankia1.txt", "");
        write(dir.path(), ".DS_Store", "");
        std::fs::create_dir(dir.path().join("20240101_000000")).unwrap();
        let stems = list_statements(dir.path()).unwrap();
        assert_eq!(stems, vec!["bankia1".to_string(), "rbs".to_string()]);
    }

    #[test]
    fn test_list_statements_empty_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(list_statements(dir.path()), Err(TallyError::EmptyInput(_))));
    }

    #[test]
    fn test_read_plain_csv() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "amex.csv",
            "Date,Description,Amount\n15/01/2025,TESCO STORES,12.50\n16/01/2025,REFUND,\n",
        );
        let table = read_statement(dir.path(), "amex", &AccountRegistry::default()).unwrap();
        assert_eq!(table.account, "amex");
        assert_eq!(table.headers, vec!["Date", "Description", "Amount"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], Value::Text("12.50".to_string()));
        assert_eq!(table.rows[1][2], Value::Empty);
    }

    #[test]
    fn test_read_tab_delimited_with_offset() {
        let dir = tempfile::tempdir().unwrap();
        let content = "\
Cuenta
ES00 0000
Titular
Periodo

Fecha\tConcepto\tImporte
02/01/2025\tNOMINA ACME\t1.500,00
03/01/2025\tMERCADONA\t-45,10
";
        write(dir.path(), "bankia2.txt", content);
        let table = read_statement(dir.path(), "bankia2", &AccountRegistry::default()).unwrap();
        assert_eq!(table.account, "bankia");
        assert_eq!(table.headers, vec!["Fecha", "Concepto", "Importe"]);
        assert_eq!(table.rows.len(), 2);
        let amount = table.rows[0][2].to_decimal(table.locale).unwrap();
        assert_eq!(amount, Some(Decimal::new(150000, 2)));
    }

    #[test]
    fn test_missing_statement_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // identifier implies .txt, a .csv with the same stem is not picked up
        write(dir.path(), "bankia.csv", "a,b\n1,2\n");
        let err = read_statement(dir.path(), "bankia", &AccountRegistry::default()).unwrap_err();
        assert!(matches!(err, TallyError::MissingStatement(_)));
    }

    #[test]
    fn test_row_with_extra_fields_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "rbs.csv", "Date,Description,Amount\n01/01/2025,A,1,extra\n");
        let err = read_statement(dir.path(), "rbs", &AccountRegistry::default()).unwrap_err();
        assert!(matches!(err, TallyError::MalformedStatement { .. }));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "rbs.csv", "\u{feff}Date,Description,Amount\n01/01/2025,A\n");
        let table = read_statement(dir.path(), "rbs", &AccountRegistry::default()).unwrap();
        assert_eq!(table.headers[0], "Date");
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.rows[0][2], Value::Empty);
    }

    #[cfg(feature = "spreadsheet")]
    mod spreadsheet {
        use chrono::NaiveDate;
        use rust_decimal::Decimal;
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        use crate::accounts::{AccountFamily, AccountFormat, AccountRegistry};
        use crate::importer::read_statement;
        use crate::models::Value;

        fn xlsx_registry() -> AccountRegistry {
            AccountRegistry {
                families: vec![AccountFamily {
                    account: "ing".to_string(),
                    aliases: vec!["ing".to_string(), "ing1".to_string()],
                    format: AccountFormat::SpreadsheetWithOffset {
                        skip_rows: 5,
                        extension: "xlsx".to_string(),
                    },
                }],
                ..AccountRegistry::default()
            }
        }

        #[test]
        fn test_title_row_inside_skipped_rows() {
            let dir = tempfile::tempdir().unwrap();
            let mut workbook = Workbook::new();
            let sheet = workbook.add_worksheet();
            sheet.write_string(0, 0, "Movimientos de la cuenta").unwrap();
            sheet.write_string(5, 0, "F. VALOR").unwrap();
            sheet.write_string(5, 1, "DESCRIPCI\u{d3}N").unwrap();
            sheet.write_string(5, 2, "IMPORTE (\u{20ac})").unwrap();
            let date = ExcelDateTime::from_ymd(2025, 2, 3).unwrap();
            sheet
                .write_datetime_with_format(6, 0, &date, &Format::new().set_num_format("dd/mm/yyyy"))
                .unwrap();
            sheet.write_string(6, 1, "MERCADONA").unwrap();
            sheet.write_number(6, 2, -45.1).unwrap();
            workbook.add_worksheet().write_string(0, 0, "ignored").unwrap();
            workbook.save(dir.path().join("ing1.xlsx")).unwrap();

            let table = read_statement(dir.path(), "ing1", &xlsx_registry()).unwrap();
            assert_eq!(table.account, "ing");
            assert_eq!(table.headers, vec!["F. VALOR", "DESCRIPCI\u{d3}N", "IMPORTE (\u{20ac})"]);
            assert_eq!(table.rows.len(), 1);
            assert_eq!(table.rows[0][0], Value::Date(NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()));
            assert_eq!(table.rows[0][1], Value::Text("MERCADONA".to_string()));
            assert_eq!(table.rows[0][2], Value::Number(Decimal::new(-451, 1)));
        }

        #[test]
        fn test_blank_leading_rows() {
            let dir = tempfile::tempdir().unwrap();
            let mut workbook = Workbook::new();
            let sheet = workbook.add_worksheet();
            sheet.write_string(5, 0, "Fecha").unwrap();
            sheet.write_string(5, 1, "Importe").unwrap();
            sheet.write_string(6, 0, "03/02/2025").unwrap();
            sheet.write_number(6, 1, 1200.0).unwrap();
            workbook.save(dir.path().join("ing.xlsx")).unwrap();

            let table = read_statement(dir.path(), "ing", &xlsx_registry()).unwrap();
            assert_eq!(table.headers, vec!["Fecha", "Importe"]);
            assert_eq!(table.rows.len(), 1);
            assert_eq!(table.rows[0][0], Value::Text("03/02/2025".to_string()));
            assert_eq!(table.rows[0][1], Value::Number(Decimal::from(1200)));
        }
    }
}
