use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::exporter::{prepare, SortOrder};
use crate::fmt::money_opt;
use crate::pipeline::process;
use crate::settings::load_configuration;

pub fn run(config_path: Option<&Path>, input: Option<PathBuf>, limit: usize) -> Result<()> {
    let config = load_configuration(config_path)?;
    let input_dir = input.unwrap_or_else(|| config.input_dir());
    let result = process(&input_dir, &config)?;
    let rows = prepare(&result.transactions, SortOrder::Main);

    let mut table = Table::new();
    table.set_header(vec![
        "Date",
        "Account",
        "Category",
        "Sub-category",
        "Description",
        "Expenses",
        "Income",
    ]);
    for row in rows.iter().take(limit) {
        table.add_row(vec![
            Cell::new(row.date.format("%Y-%m-%d")),
            Cell::new(&row.account),
            Cell::new(row.category.as_deref().unwrap_or("")),
            Cell::new(row.sub_cat.as_deref().unwrap_or("")),
            Cell::new(row.description.as_deref().unwrap_or("")),
            Cell::new(money_opt(row.expenses, row.currency).red()),
            Cell::new(money_opt(row.income, row.currency).green()),
        ]);
    }

    println!("Transactions\n{table}");
    println!(
        "Showing {} of {} records, {} dropped, {} uncategorized",
        rows.len().min(limit),
        rows.len(),
        result.dropped.len(),
        rows.iter().filter(|r| r.category.is_none()).count()
    );
    Ok(())
}
