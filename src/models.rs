use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounts::NumberLocale;
use crate::error::TallyError;

/// One cell of a raw statement table, before any column is typed.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
}

impl Value {
    /// Empty source fields become `Value::Empty`; anything else is kept verbatim.
    pub fn text(raw: &str) -> Self {
        if raw.is_empty() {
            Value::Empty
        } else {
            Value::Text(raw.to_string())
        }
    }

    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Empty => None,
            Value::Text(s) => Some(Cow::Borrowed(s)),
            Value::Number(d) => Some(Cow::Owned(d.to_string())),
            Value::Date(d) => Some(Cow::Owned(d.format("%Y-%m-%d").to_string())),
        }
    }

    /// Reads the cell as a decimal. `Ok(None)` for empty cells, `Err(raw)` when the
    /// text is not a number in the given locale.
    pub fn to_decimal(&self, locale: NumberLocale) -> std::result::Result<Option<Decimal>, String> {
        match self {
            Value::Empty => Ok(None),
            Value::Number(d) => Ok(Some(*d)),
            Value::Text(s) if s.trim().is_empty() => Ok(None),
            Value::Text(s) => locale.parse(s).map(Some).ok_or_else(|| s.clone()),
            Value::Date(d) => Err(d.to_string()),
        }
    }
}

/// Untyped per-account table produced by the source reader and reshaped by the
/// column normalizer and field transformers.
#[derive(Debug, Clone)]
pub struct StatementTable {
    /// Canonical account name after alias collapsing.
    pub account: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub locale: NumberLocale,
}

impl StatementTable {
    pub fn new(account: &str, headers: Vec<String>, locale: NumberLocale) -> Self {
        Self {
            account: account.to_string(),
            headers,
            rows: Vec::new(),
            locale,
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of `name`, or a `MissingColumn` failure naming it.
    pub fn require(&self, name: &str) -> crate::error::Result<usize> {
        self.position(name).ok_or_else(|| TallyError::MissingColumn {
            account: self.account.clone(),
            column: name.to_string(),
        })
    }

    /// Returns the index of `name`, appending it filled with `fill` when absent.
    pub fn ensure_column(&mut self, name: &str, fill: Value) -> usize {
        if let Some(idx) = self.position(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
        self.headers.len() - 1
    }

    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Value::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Gbp,
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Gbp => "GBP",
            Self::Eur => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Gbp => "\u{a3}",
            Self::Eur => "\u{20ac}",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GBP" => Ok(Self::Gbp),
            "EUR" => Ok(Self::Eur),
            other => Err(TallyError::Other(format!("Unknown currency: {other}"))),
        }
    }
}

/// Record emitted by the finalize step. Any `None` outside `expenses`/`income`
/// means the source row lacked a required field.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRecord {
    pub account: String,
    pub date: Option<NaiveDate>,
    pub kind: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub category: String,
    pub sub_cat: String,
    pub new_description: String,
    pub expenses: Option<Decimal>,
    pub income: Option<Decimal>,
}

/// Canonical transaction after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub account: String,
    pub date: NaiveDate,
    /// Lowercase transaction type, empty when the source has none.
    pub kind: String,
    pub description: String,
    /// Negative is an outflow, positive an inflow.
    pub amount: Decimal,
    pub currency: Currency,
    pub category: String,
    pub sub_cat: String,
    pub new_description: String,
    pub expenses: Option<Decimal>,
    pub income: Option<Decimal>,
}

impl Transaction {
    /// Text rendering of a column, as seen by drop and fill patterns.
    pub fn field(&self, column: Column) -> Cow<'_, str> {
        match column {
            Column::Account => Cow::Borrowed(&self.account),
            Column::Category => Cow::Borrowed(&self.category),
            Column::SubCat => Cow::Borrowed(&self.sub_cat),
            Column::NewDescription => Cow::Borrowed(&self.new_description),
            Column::Description => Cow::Borrowed(&self.description),
            Column::Type => Cow::Borrowed(&self.kind),
            Column::Currency => Cow::Borrowed(self.currency.code()),
            Column::Date => Cow::Owned(self.date.format("%Y-%m-%d").to_string()),
            Column::Expenses => optional_amount(self.expenses),
            Column::Income => optional_amount(self.income),
        }
    }

    pub fn set_classification(&mut self, category: &str, sub_cat: &str, new_description: &str) {
        self.category = category.to_string();
        self.sub_cat = sub_cat.to_string();
        self.new_description = new_description.to_string();
    }
}

fn optional_amount(value: Option<Decimal>) -> Cow<'static, str> {
    value.map_or(Cow::Borrowed(""), |d| Cow::Owned(d.to_string()))
}

/// The final column vocabulary a rule table may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Account,
    Category,
    SubCat,
    NewDescription,
    Date,
    Currency,
    Expenses,
    Income,
    Description,
    Type,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Category => "category",
            Self::SubCat => "sub_cat",
            Self::NewDescription => "new_description",
            Self::Date => "date",
            Self::Currency => "currency",
            Self::Expenses => "expenses",
            Self::Income => "income",
            Self::Description => "description",
            Self::Type => "type",
        }
    }
}

impl FromStr for Column {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account" => Ok(Self::Account),
            "category" => Ok(Self::Category),
            "sub_cat" => Ok(Self::SubCat),
            "new_description" => Ok(Self::NewDescription),
            "date" => Ok(Self::Date),
            "currency" => Ok(Self::Currency),
            "expenses" => Ok(Self::Expenses),
            "income" => Ok(Self::Income),
            "description" => Ok(Self::Description),
            "type" => Ok(Self::Type),
            other => Err(TallyError::UnknownColumn(other.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn txn(account: &str, date: &str, description: &str, amount: &str) -> Transaction {
        let amount: Decimal = amount.parse().unwrap();
        let (expenses, income) = if amount < Decimal::ZERO {
            (Some(-amount), None)
        } else {
            (None, Some(amount))
        };
        Transaction {
            account: account.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            kind: String::new(),
            description: description.to_string(),
            amount,
            currency: Currency::Eur,
            category: String::new(),
            sub_cat: String::new(),
            new_description: String::new(),
            expenses,
            income,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_text_empty() {
        assert_eq!(Value::text(""), Value::Empty);
        assert_eq!(Value::text(" x "), Value::Text(" x ".to_string()));
    }

    #[test]
    fn test_value_to_decimal() {
        let eu = NumberLocale::european();
        assert_eq!(Value::text("1.234,56").to_decimal(eu), Ok(Some("1234.56".parse().unwrap())));
        assert_eq!(Value::Empty.to_decimal(eu), Ok(None));
        assert_eq!(Value::text("abc").to_decimal(eu), Err("abc".to_string()));
    }

    #[test]
    fn test_ensure_column_pads_rows() {
        let mut table = StatementTable::new("x", vec!["a".into()], NumberLocale::plain());
        table.rows.push(vec![Value::text("1")]);
        let idx = table.ensure_column("type", Value::text(""));
        assert_eq!(idx, 1);
        assert_eq!(table.rows[0][1], Value::Empty);
        assert_eq!(table.ensure_column("a", Value::Empty), 0);
    }

    #[test]
    fn test_column_from_str() {
        assert_eq!("sub_cat".parse::<Column>().unwrap(), Column::SubCat);
        assert!(matches!("memo".parse::<Column>(), Err(TallyError::UnknownColumn(_))));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("gbp".parse::<Currency>().unwrap(), Currency::Gbp);
        assert_eq!(Currency::Eur.to_string(), "EUR");
    }
}
