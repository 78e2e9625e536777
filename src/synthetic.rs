//! Records that no statement contains: employer/personal pension contributions and
//! salary deductions, derived from salary rows and static tables.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TallyError};
use crate::models::Transaction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PensionScheme {
    /// Matches the `sub_cat` of the scheme's salary rows.
    pub scheme: String,
    /// Annual salary the percentages apply to.
    pub salary: Decimal,
    pub contributions: Vec<Contribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub label: String,
    /// Fraction of the annual salary, e.g. `0.05`.
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryDeduction {
    /// Matches the `sub_cat` of the payer's salary rows.
    pub payer: String,
    pub effective_from: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub sub_cat: String,
    pub label: String,
    /// Monthly amount withheld from the salary.
    pub amount: Decimal,
}

fn is_salary(txn: &Transaction, salary_category: &str, key: &str) -> bool {
    txn.category == salary_category && txn.sub_cat == key
}

/// Appends one income row per (salary row, contribution) with `income = salary * rate / 12`.
/// Returns the number of rows added.
pub fn add_pension_contributions(
    records: &mut Vec<Transaction>,
    schemes: &[PensionScheme],
    salary_category: &str,
    prefix: &str,
) -> usize {
    let months = Decimal::from(12);
    let mut generated = Vec::new();

    for scheme in schemes {
        for contribution in &scheme.contributions {
            let monthly = scheme.salary * contribution.rate / months;
            for salary in records.iter().filter(|t| is_salary(t, salary_category, &scheme.scheme)) {
                let mut row = salary.clone();
                row.income = Some(monthly);
                row.expenses = None;
                row.set_classification(
                    salary_category,
                    &format!("{prefix} {}", scheme.scheme),
                    &contribution.label,
                );
                generated.push(row);
            }
        }
    }

    let added = generated.len();
    info!("Add pension contributions: {added} records");
    records.extend(generated);
    added
}

/// For each payer, adds the deduction back onto salary rows dated on or after the
/// effective date and appends a matching expense row, so the net effect is zero.
///
/// With `policy_payer` set, that payer's effective date applies to every payer.
pub fn add_salary_deductions(
    records: &mut Vec<Transaction>,
    deductions: &[SalaryDeduction],
    salary_category: &str,
    policy_payer: Option<&str>,
) -> Result<usize> {
    let shared_from = match policy_payer {
        Some(payer) => Some(
            deductions
                .iter()
                .find(|d| d.payer == payer)
                .map(|d| d.effective_from)
                .ok_or_else(|| {
                    TallyError::Settings(format!("deduction_policy_payer '{payer}' has no salary deduction"))
                })?,
        ),
        None => None,
    };

    let mut generated = Vec::new();
    for deduction in deductions {
        let from = shared_from.unwrap_or(deduction.effective_from);
        for salary in records
            .iter_mut()
            .filter(|t| is_salary(t, salary_category, &deduction.payer) && t.date >= from)
        {
            let mut row = salary.clone();
            row.set_classification(&deduction.category, &deduction.sub_cat, &deduction.label);
            row.expenses = Some(deduction.amount);
            row.income = None;
            generated.push(row);

            salary.income = salary.income.map(|income| income + deduction.amount);
        }
    }

    let added = generated.len();
    info!("Add salary deductions: {added} records");
    records.extend(generated);
    Ok(added)
}
