use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::error::{Result, TallyError};
use crate::exporter::{export_and_archive, run_stamp};
use crate::pipeline::process;
use crate::settings::load_configuration;

pub fn run(config_path: Option<&Path>, input: Option<PathBuf>, output: Option<PathBuf>, no_archive: bool) -> Result<()> {
    let config = load_configuration(config_path)?;
    let input_dir = input.unwrap_or_else(|| config.input_dir());
    let output_dir = output.unwrap_or_else(|| config.output_dir());

    // Archiving moves every file in the input folder, exports included.
    if !no_archive && input_dir == output_dir {
        return Err(TallyError::Settings(
            "input and output folders must differ when archiving".to_string(),
        ));
    }

    let result = process(&input_dir, &config)?;
    println!(
        "{} statements imported: {}",
        result.identifiers.len(),
        result.identifiers.join(", ")
    );
    println!(
        "{} categorized, {} uncategorized, {} dropped, {} pension and {} deduction records added",
        result.classified,
        result.unclassified,
        result.dropped.len(),
        result.pension_rows,
        result.deduction_rows
    );

    if !result.skipped_columns.is_empty() {
        println!(
            "{} fill rules for unknown columns: {}",
            "Skipped".yellow().bold(),
            result.skipped_columns.join(", ")
        );
    }

    if !result.untagged_accounts.is_empty() {
        println!(
            "{} accounts with no currency, all rows dropped: {}",
            "Skipped".yellow().bold(),
            result.untagged_accounts.join(", ")
        );
    }

    let stamp = run_stamp();
    let archive_from = (!no_archive).then_some(input_dir.as_path());
    let (paths, archived) = export_and_archive(
        &result.transactions,
        &result.dropped,
        &output_dir,
        archive_from,
        &stamp,
    )?;
    println!(
        "{} {} rows to {}",
        "Exported".green().bold(),
        paths.main_rows,
        paths.main.display()
    );
    println!(
        "{} {} rows to {}",
        "Dropped".yellow().bold(),
        paths.dropped_rows,
        paths.dropped.display()
    );

    if let Some(archived) = archived {
        println!(
            "{} {} files to {}",
            "Archived".cyan().bold(),
            archived.moved.len(),
            archived.directory.display()
        );
    }
    Ok(())
}
