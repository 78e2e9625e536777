use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::categorizer::Classifier;
use crate::columns::rename_columns;
use crate::error::Result;
use crate::filter::remove_incomplete;
use crate::importer::{list_statements, read_statement};
use crate::models::Transaction;
use crate::settings::Configuration;
use crate::synthetic::{add_pension_contributions, add_salary_deductions};
use crate::transform::{finalize, fix_amount_sign, normalize_type, tag_currency};

/// Reads one statement and takes it through renaming, the field transformers and the row filter.
pub fn import_statement(dir: &Path, identifier: &str, config: &Configuration) -> Result<Vec<Transaction>> {
    let mut table = read_statement(dir, identifier, &config.accounts)?;
    rename_columns(&mut table, &config.column_renames)?;
    let sign_rule = config.sign_rules.get(&table.account);
    fix_amount_sign(&mut table, sign_rule)?;
    tag_currency(&mut table, &config.gbp_accounts, &config.eur_accounts);
    normalize_type(&mut table);
    let drafts = finalize(&table)?;
    Ok(remove_incomplete(&table.account, drafts))
}

/// Imports every identifier in order and concatenates the results.
pub fn import_and_reformat(dir: &Path, identifiers: &[String], config: &Configuration) -> Result<Vec<Transaction>> {
    let mut all = Vec::new();
    for identifier in identifiers {
        let records = import_statement(dir, identifier, config)?;
        info!("{identifier}: {} records", records.len());
        all.extend(records);
    }
    Ok(all)
}

pub struct PipelineOutput {
    pub identifiers: Vec<String>,
    pub transactions: Vec<Transaction>,
    pub dropped: Vec<Transaction>,
    pub classified: usize,
    pub unclassified: usize,
    /// Fill-rule columns that no record has; those rules were skipped.
    pub skipped_columns: Vec<String>,
    /// Accounts in neither currency set; none of their rows survive the row filter.
    pub untagged_accounts: Vec<String>,
    pub pension_rows: usize,
    pub deduction_rows: usize,
}

/// Everything up to, but not including, writing the exports: import, drop pass, fill pass,
/// pension contributions, then salary deductions.
pub fn process(input_dir: &Path, config: &Configuration) -> Result<PipelineOutput> {
    let classifier = Classifier::new(&config.drop_rules, &config.fill_rules)?;
    let identifiers = list_statements(input_dir)?;
    let untagged_accounts: Vec<String> = identifiers
        .iter()
        .map(|id| config.accounts.resolve(id).account)
        .filter(|account| config.currency_of(account).is_none())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    for account in &untagged_accounts {
        warn!("{account}: no currency configured, every row will be dropped");
    }

    let imported = import_and_reformat(input_dir, &identifiers, config)?;
    let (mut transactions, dropped) = classifier.drop_pass(imported);
    let fill = classifier.fill_pass(&mut transactions);

    let pension_rows = add_pension_contributions(
        &mut transactions,
        &config.pensions,
        &config.salary_category,
        &config.pension_prefix,
    );
    let deduction_rows = add_salary_deductions(
        &mut transactions,
        &config.salary_deductions,
        &config.salary_category,
        config.deduction_policy_payer.as_deref(),
    )?;

    Ok(PipelineOutput {
        identifiers,
        transactions,
        dropped,
        classified: fill.classified,
        unclassified: fill.unclassified,
        skipped_columns: fill.skipped_columns,
        untagged_accounts,
        pension_rows,
        deduction_rows,
    })
}
