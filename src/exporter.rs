use std::cmp::Ordering;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};

use crate::error::{Result, TallyError};
use crate::models::{Currency, Transaction};

pub const EXPORT_HEADER: [&str; 8] = [
    "account",
    "category",
    "sub_cat",
    "description",
    "date",
    "currency",
    "expenses",
    "income",
];

const BOM: &[u8] = b"\xef\xbb\xbf";

/// One line of an export file. Empty text is `None` so it writes blank and sorts last.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub account: String,
    pub category: Option<String>,
    pub sub_cat: Option<String>,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub currency: Currency,
    pub expenses: Option<Decimal>,
    pub income: Option<Decimal>,
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl From<&Transaction> for ExportRow {
    fn from(t: &Transaction) -> Self {
        Self {
            account: t.account.clone(),
            category: non_empty(&t.category),
            sub_cat: non_empty(&t.sub_cat),
            description: non_empty(&t.new_description).or_else(|| non_empty(&t.description)),
            date: t.date,
            currency: t.currency,
            expenses: t.expenses,
            income: t.income,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// date, category, sub_cat, description
    Main,
    /// description, date
    DropReport,
}

fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn prepare(records: &[Transaction], order: SortOrder) -> Vec<ExportRow> {
    let mut rows: Vec<ExportRow> = records.iter().map(ExportRow::from).collect();
    match order {
        SortOrder::Main => rows.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| nulls_last(&a.category, &b.category))
                .then_with(|| nulls_last(&a.sub_cat, &b.sub_cat))
                .then_with(|| nulls_last(&a.description, &b.description))
        }),
        SortOrder::DropReport => rows.sort_by(|a, b| {
            nulls_last(&a.description, &b.description).then_with(|| a.date.cmp(&b.date))
        }),
    }
    rows
}

/// Cents, rounded half away from zero.
fn amount_field(value: Option<Decimal>) -> String {
    value
        .map(|d| format!("{:.2}", d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)))
        .unwrap_or_default()
}

/// Writes rows as comma-delimited UTF-8 with a byte-order mark and a header row.
pub fn write_csv(rows: &[ExportRow], path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(BOM)?;
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(EXPORT_HEADER)?;
    for row in rows {
        let date = row.date.format("%Y-%m-%d").to_string();
        wtr.write_record([
            row.account.as_str(),
            row.category.as_deref().unwrap_or(""),
            row.sub_cat.as_deref().unwrap_or(""),
            row.description.as_deref().unwrap_or(""),
            date.as_str(),
            row.currency.code(),
            amount_field(row.expenses).as_str(),
            amount_field(row.income).as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn run_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub struct ExportPaths {
    pub main: PathBuf,
    pub dropped: PathBuf,
    pub main_rows: usize,
    pub dropped_rows: usize,
}

/// Writes `all_statements_<stamp>.csv` and `all_statements_<stamp>_drop.csv` into `output_dir`.
pub fn export_statements(
    records: &[Transaction],
    dropped: &[Transaction],
    output_dir: &Path,
    stamp: &str,
) -> Result<ExportPaths> {
    std::fs::create_dir_all(output_dir)?;

    let main_rows = prepare(records, SortOrder::Main);
    let main = output_dir.join(format!("all_statements_{stamp}.csv"));
    write_csv(&main_rows, &main)?;

    let drop_rows = prepare(dropped, SortOrder::DropReport);
    let drop_path = output_dir.join(format!("all_statements_{stamp}_drop.csv"));
    write_csv(&drop_rows, &drop_path)?;

    info!("Statements exported to {}", output_dir.display());
    Ok(ExportPaths {
        main,
        dropped: drop_path,
        main_rows: main_rows.len(),
        dropped_rows: drop_rows.len(),
    })
}

pub struct ArchiveResult {
    pub directory: PathBuf,
    pub moved: Vec<String>,
}

/// Creates the empty `<input_dir>/<stamp>` archive folder. An existing folder is an error.
pub fn reserve_archive(input_dir: &Path, stamp: &str) -> Result<PathBuf> {
    let directory = input_dir.join(stamp);
    if directory.exists() {
        return Err(TallyError::Other(format!(
            "Archive folder {} already exists",
            directory.display()
        )));
    }
    std::fs::create_dir(&directory)?;
    Ok(directory)
}

/// Moves every file in `input_dir` into `directory`.
pub fn archive_statements(input_dir: &Path, directory: PathBuf) -> Result<ArchiveResult> {
    let mut moved = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        std::fs::rename(entry.path(), directory.join(&name))?;
        let name = name.to_string_lossy().to_string();
        info!("File {name} moved to folder {}", directory.display());
        moved.push(name);
    }
    moved.sort();
    Ok(ArchiveResult { directory, moved })
}

/// Writes both exports and, when `archive_from` is set, moves its files into
/// `<archive_from>/<stamp>`. The archive folder is created before anything is written.
pub fn export_and_archive(
    records: &[Transaction],
    dropped: &[Transaction],
    output_dir: &Path,
    archive_from: Option<&Path>,
    stamp: &str,
) -> Result<(ExportPaths, Option<ArchiveResult>)> {
    let Some(input_dir) = archive_from else {
        return Ok((export_statements(records, dropped, output_dir, stamp)?, None));
    };

    let directory = reserve_archive(input_dir, stamp)?;
    let paths = match export_statements(records, dropped, output_dir, stamp) {
        Ok(paths) => paths,
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_dir(&directory) {
                warn!("Could not remove {}: {cleanup}", directory.display());
            }
            return Err(e);
        }
    };
    let archived = archive_statements(input_dir, directory)?;
    Ok((paths, Some(archived)))
}
