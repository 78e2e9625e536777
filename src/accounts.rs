use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Thousands/decimal separators used by a statement export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberLocale {
    #[serde(default)]
    pub thousands: Option<char>,
    pub decimal: char,
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self::plain()
    }
}

impl NumberLocale {
    pub const fn plain() -> Self {
        Self {
            thousands: None,
            decimal: '.',
        }
    }

    /// `1.234,56`
    pub const fn european() -> Self {
        Self {
            thousands: Some('.'),
            decimal: ',',
        }
    }

    pub fn parse(&self, raw: &str) -> Option<Decimal> {
        let mut s: String = raw.trim().to_string();
        if let Some(sep) = self.thousands {
            s = s.replace(sep, "");
        }
        if self.decimal != '.' {
            s = s.replace(self.decimal, ".");
        }
        Decimal::from_str(&s)
            .or_else(|_| Decimal::from_scientific(&s))
            .ok()
    }
}

/// How a statement file is laid out on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountFormat {
    DelimitedWithOffset {
        delimiter: char,
        skip_rows: usize,
        #[serde(default)]
        locale: NumberLocale,
        extension: String,
    },
    SpreadsheetWithOffset {
        skip_rows: usize,
        extension: String,
    },
    PlainDelimited {
        delimiter: char,
        extension: String,
    },
}

impl AccountFormat {
    pub fn extension(&self) -> &str {
        match self {
            Self::DelimitedWithOffset { extension, .. }
            | Self::SpreadsheetWithOffset { extension, .. }
            | Self::PlainDelimited { extension, .. } => extension,
        }
    }

    pub fn locale(&self) -> NumberLocale {
        match self {
            Self::DelimitedWithOffset { locale, .. } => *locale,
            _ => NumberLocale::plain(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::DelimitedWithOffset { delimiter, skip_rows, .. } => {
                format!("delimited {} (skip {skip_rows})", delimiter_name(*delimiter))
            }
            Self::SpreadsheetWithOffset { skip_rows, .. } => format!("spreadsheet (skip {skip_rows})"),
            Self::PlainDelimited { delimiter, .. } => format!("delimited {}", delimiter_name(*delimiter)),
        }
    }
}

fn delimiter_name(delimiter: char) -> String {
    match delimiter {
        '\t' => "tab".to_string(),
        ',' => "comma".to_string(),
        ';' => "semicolon".to_string(),
        other => format!("'{other}'"),
    }
}

/// A group of file aliases that all load into one canonical account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFamily {
    pub account: String,
    pub aliases: Vec<String>,
    pub format: AccountFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRegistry {
    pub families: Vec<AccountFamily>,
    /// Format for identifiers not listed in any family; the identifier is the account name.
    pub fallback: AccountFormat,
}

/// Outcome of looking an identifier up in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAccount<'a> {
    pub identifier: String,
    pub account: String,
    pub format: &'a AccountFormat,
}

impl AccountRegistry {
    pub fn resolve(&self, identifier: &str) -> ResolvedAccount<'_> {
        let family = self
            .families
            .iter()
            .find(|f| f.aliases.iter().any(|a| a == identifier));
        match family {
            Some(f) => ResolvedAccount {
                identifier: identifier.to_string(),
                account: f.account.clone(),
                format: &f.format,
            },
            None => ResolvedAccount {
                identifier: identifier.to_string(),
                account: identifier.to_string(),
                format: &self.fallback,
            },
        }
    }
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self {
            families: vec![
                AccountFamily {
                    account: "bankia".to_string(),
                    aliases: aliases(&["bankia", "bankia1", "bankia2"]),
                    format: AccountFormat::DelimitedWithOffset {
                        delimiter: '\t',
                        skip_rows: 5,
                        locale: NumberLocale::european(),
                        extension: "txt".to_string(),
                    },
                },
                AccountFamily {
                    account: "ing".to_string(),
                    aliases: aliases(&["ing", "ing1", "ing2"]),
                    format: AccountFormat::SpreadsheetWithOffset {
                        skip_rows: 5,
                        extension: "xls".to_string(),
                    },
                },
            ],
            fallback: AccountFormat::PlainDelimited {
                delimiter: ',',
                extension: "csv".to_string(),
            },
        }
    }
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
