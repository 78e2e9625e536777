use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, TallyError};
use crate::models::StatementTable;

/// `" Credit Amount "` -> `"creditamount"`
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{feff}')
        .collect::<String>()
        .to_lowercase()
}

/// Normalizes every header, then renames them through the account's mapping.
/// Every source column in the mapping must exist.
pub fn rename_columns(
    table: &mut StatementTable,
    renames: &BTreeMap<String, BTreeMap<String, String>>,
) -> Result<()> {
    for header in &mut table.headers {
        *header = normalize_header(header);
    }

    let mapping = renames
        .get(&table.account)
        .ok_or_else(|| TallyError::NoColumnMapping(table.account.clone()))?;

    // Renames apply simultaneously.
    let mut targets = Vec::with_capacity(mapping.len());
    for (from, to) in mapping {
        let idx = table.require(&normalize_header(from))?;
        targets.push((idx, to));
    }
    for (idx, to) in targets {
        debug!("{}: column '{}' -> '{to}'", table.account, table.headers[idx]);
        table.headers[idx] = to.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::NumberLocale;

    fn table(account: &str, headers: &[&str]) -> StatementTable {
        StatementTable::new(
            account,
            headers.iter().map(|h| h.to_string()).collect(),
            NumberLocale::plain(),
        )
    }

    fn renames(account: &str, pairs: &[(&str, &str)]) -> BTreeMap<String, BTreeMap<String, String>> {
        let mapping = pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        BTreeMap::from([(account.to_string(), mapping)])
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" Credit Amount "), "creditamount");
        assert_eq!(normalize_header("F.Valor"), "f.valor");
    }

    #[test]
    fn test_rename_to_canonical_vocabulary() {
        let mut t = table("bankia", &["Fecha ", "Concepto", "Importe"]);
        let r = renames("bankia", &[("fecha", "date"), ("concepto", "description"), ("importe", "amount")]);
        rename_columns(&mut t, &r).unwrap();
        assert_eq!(t.headers, vec!["date", "description", "amount"]);
    }

    #[test]
    fn test_unmapped_columns_are_kept_normalized() {
        let mut t = table("lloyds", &["Transaction Date", "Debit Amount", "Credit Amount"]);
        let r = renames("lloyds", &[("transactiondate", "date")]);
        rename_columns(&mut t, &r).unwrap();
        assert_eq!(t.headers, vec!["date", "debitamount", "creditamount"]);
    }

    #[test]
    fn test_missing_source_column_fails() {
        let mut t = table("rbs", &["Date", "Value"]);
        let r = renames("rbs", &[("date", "date"), ("amount", "amount")]);
        let err = rename_columns(&mut t, &r).unwrap_err();
        match err {
            TallyError::MissingColumn { account, column } => {
                assert_eq!(account, "rbs");
                assert_eq!(column, "amount");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_account_without_mapping_fails() {
        let mut t = table("unknown", &["Date"]);
        let err = rename_columns(&mut t, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, TallyError::NoColumnMapping(_)));
    }
}
