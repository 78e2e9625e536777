//! Field transformers: the ordered reformatting steps between column renaming and the
//! row filter. Each step is defined for every account; accounts without a rule pass
//! through untouched.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accounts::NumberLocale;
use crate::error::{Result, TallyError};
use crate::importer::excel_serial_to_date;
use crate::models::{Currency, DraftRecord, StatementTable, Value};

pub const DATE: &str = "date";
pub const TYPE: &str = "type";
pub const DESCRIPTION: &str = "description";
pub const AMOUNT: &str = "amount";
pub const CURRENCY: &str = "currency";

/// Account-specific polarity fix applied to the `amount` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SignRule {
    /// Remove currency symbols and thousands separators, then parse.
    StripSymbols { symbols: Vec<String> },
    /// Outflows are exported as positive numbers.
    Negate,
    /// Flip the sign only where the raw `type` equals `value`.
    NegateWhenType { value: String },
    /// `amount = credit`, or `-debit` where there is no credit.
    CreditOrNegatedDebit { credit: String, debit: String },
}

impl SignRule {
    pub fn label(&self) -> String {
        match self {
            Self::StripSymbols { symbols } => format!("strip {}", symbols.join(" ")),
            Self::Negate => "negate".to_string(),
            Self::NegateWhenType { value } => format!("negate when type = {value}"),
            Self::CreditOrNegatedDebit { credit, debit } => format!("{credit} or -{debit}"),
        }
    }
}

pub fn default_sign_rules() -> BTreeMap<String, SignRule> {
    let mut rules = BTreeMap::new();
    rules.insert(
        "mands".to_string(),
        SignRule::StripSymbols {
            symbols: vec!["\u{a3}".to_string(), ",".to_string()],
        },
    );
    rules.insert("amazon".to_string(), SignRule::Negate);
    rules.insert("amex".to_string(), SignRule::Negate);
    for account in ["rbs", "natwest"] {
        rules.insert(
            account.to_string(),
            SignRule::NegateWhenType {
                value: "Purchase".to_string(),
            },
        );
    }
    rules.insert(
        "lloyds".to_string(),
        SignRule::CreditOrNegatedDebit {
            credit: "creditamount".to_string(),
            debit: "debitamount".to_string(),
        },
    );
    rules
}

fn invalid_amount(account: &str, value: String) -> TallyError {
    TallyError::InvalidAmount {
        account: account.to_string(),
        value,
    }
}

fn negated(cell: &Value, locale: NumberLocale, account: &str) -> Result<Value> {
    match cell.to_decimal(locale) {
        Ok(Some(d)) => Ok(Value::Number(-d)),
        Ok(None) => Ok(Value::Empty),
        Err(raw) => Err(invalid_amount(account, raw)),
    }
}

// ---------------------------------------------------------------------------
// Amount sign fix
// ---------------------------------------------------------------------------

pub fn fix_amount_sign(table: &mut StatementTable, rule: Option<&SignRule>) -> Result<()> {
    let Some(rule) = rule else {
        return Ok(());
    };
    debug!("{}: amount rule {}", table.account, rule.label());
    let locale = table.locale;
    let account = table.account.clone();

    match rule {
        SignRule::StripSymbols { symbols } => {
            let amount = table.require(AMOUNT)?;
            for row in &mut table.rows {
                if let Value::Text(raw) = &row[amount] {
                    let cleaned = symbols.iter().fold(raw.clone(), |s, sym| s.replace(sym.as_str(), ""));
                    let parsed = NumberLocale::plain()
                        .parse(&cleaned)
                        .ok_or_else(|| invalid_amount(&account, raw.clone()))?;
                    row[amount] = Value::Number(parsed);
                }
            }
        }
        SignRule::Negate => {
            let amount = table.require(AMOUNT)?;
            for row in &mut table.rows {
                row[amount] = negated(&row[amount], locale, &account)?;
            }
        }
        SignRule::NegateWhenType { value } => {
            let amount = table.require(AMOUNT)?;
            let kind = table.require(TYPE)?;
            for row in &mut table.rows {
                let matches = row[kind].as_text().is_some_and(|t| t == value.as_str());
                if matches {
                    row[amount] = negated(&row[amount], locale, &account)?;
                }
            }
        }
        SignRule::CreditOrNegatedDebit { credit, debit } => {
            let credit = table.require(credit)?;
            let debit = table.require(debit)?;
            let amount = table.ensure_column(AMOUNT, Value::Empty);
            for row in &mut table.rows {
                row[amount] = match row[credit].to_decimal(locale) {
                    Ok(Some(c)) => Value::Number(c),
                    Ok(None) => negated(&row[debit], locale, &account)?,
                    Err(raw) => return Err(invalid_amount(&account, raw)),
                };
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Currency tagging
// ---------------------------------------------------------------------------

/// Tags every row with the account's currency. GBP membership wins over EUR; accounts
/// in neither set get no currency column.
pub fn tag_currency(table: &mut StatementTable, gbp_accounts: &[String], eur_accounts: &[String]) {
    let currency = if gbp_accounts.contains(&table.account) {
        Currency::Gbp
    } else if eur_accounts.contains(&table.account) {
        Currency::Eur
    } else {
        debug!("{}: no currency configured", table.account);
        return;
    };
    let idx = table.ensure_column(CURRENCY, Value::Empty);
    for row in &mut table.rows {
        row[idx] = Value::Text(currency.code().to_string());
    }
}

// ---------------------------------------------------------------------------
// Type normalization
// ---------------------------------------------------------------------------

pub fn normalize_type(table: &mut StatementTable) {
    match table.position(TYPE) {
        Some(idx) => {
            for row in &mut table.rows {
                if let Some(text) = row[idx].as_text() {
                    row[idx] = Value::Text(text.to_lowercase());
                }
            }
        }
        None => {
            table.ensure_column(TYPE, Value::Text(String::new()));
        }
    }
}

// ---------------------------------------------------------------------------
// Finalize
// ---------------------------------------------------------------------------

/// Splits an amount into `(expenses, income)`; exactly one side is set.
pub fn split_amount(amount: Decimal) -> (Option<Decimal>, Option<Decimal>) {
    if amount < Decimal::ZERO {
        (Some(-amount), None)
    } else {
        (None, Some(amount))
    }
}

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d-%m-%y", "%d.%m.%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d",
    "%d %b %Y", "%d %B %Y", "%d-%b-%Y", "%d %b %y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Day-first calendar date. `Ok(None)` for an empty cell, `Err(raw)` when unreadable.
pub fn parse_date_dayfirst(value: &Value) -> std::result::Result<Option<NaiveDate>, String> {
    match value {
        Value::Empty => Ok(None),
        Value::Date(d) => Ok(Some(*d)),
        Value::Number(n) => n
            .to_f64()
            .and_then(excel_serial_to_date)
            .map(Some)
            .ok_or_else(|| n.to_string()),
        Value::Text(raw) => {
            let s = raw.trim();
            if s.is_empty() {
                return Ok(None);
            }
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .or_else(|| {
                    DATETIME_FORMATS
                        .iter()
                        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                        .map(|dt| dt.date())
                })
                .map(Some)
                .ok_or_else(|| raw.clone())
        }
    }
}

/// Restricts the table to the canonical columns and types them into draft records.
pub fn finalize(table: &StatementTable) -> Result<Vec<DraftRecord>> {
    let date = table.require(DATE)?;
    let kind = table.require(TYPE)?;
    let description = table.require(DESCRIPTION)?;
    let amount = table.require(AMOUNT)?;
    let currency = table.position(CURRENCY);

    let mut records = Vec::with_capacity(table.rows.len());
    for row in 0..table.rows.len() {
        let parsed_date = parse_date_dayfirst(table.cell(row, date)).map_err(|value| TallyError::InvalidDate {
            account: table.account.clone(),
            value,
        })?;
        let parsed_amount = table
            .cell(row, amount)
            .to_decimal(table.locale)
            .map_err(|value| invalid_amount(&table.account, value))?;
        let (expenses, income) = parsed_amount.map_or((None, None), split_amount);

        records.push(DraftRecord {
            account: table.account.clone(),
            date: parsed_date,
            kind: table.cell(row, kind).as_text().map(|t| t.into_owned()),
            description: table.cell(row, description).as_text().map(|t| t.to_lowercase()),
            amount: parsed_amount,
            currency: currency.and_then(|c| table.cell(row, c).as_text().and_then(|t| t.parse().ok())),
            category: String::new(),
            sub_cat: String::new(),
            new_description: String::new(),
            expenses,
            income,
        });
    }
    Ok(records)
}
