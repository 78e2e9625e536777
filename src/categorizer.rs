use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, TallyError};
use crate::models::{Column, Transaction};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    Regex,
}

/// Rows whose `column` contains any of `patterns` are moved to the drop-report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropRule {
    pub column: String,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub match_type: MatchType,
}

/// Classification rules keyed on one column, applied in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRule {
    pub column: String,
    pub rules: Vec<FillEntry>,
    #[serde(default)]
    pub match_type: MatchType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEntry {
    pub pattern: String,
    pub category: String,
    #[serde(default)]
    pub sub_cat: String,
    #[serde(default)]
    pub description: String,
}

enum Matcher {
    Contains(String),
    Regex(Regex),
}

impl Matcher {
    fn new(pattern: &str, match_type: MatchType) -> Result<Self> {
        match match_type {
            MatchType::Contains => Ok(Self::Contains(pattern.to_string())),
            MatchType::Regex => Regex::new(pattern)
                .map(Self::Regex)
                .map_err(|e| TallyError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Contains(pattern) => value.contains(pattern.as_str()),
            Self::Regex(re) => re.is_match(value),
        }
    }
}

struct CompiledDrop {
    column: Column,
    patterns: Vec<(String, Matcher)>,
}

struct CompiledFill {
    column: String,
    /// `None` when the rule names a column records do not have.
    resolved: Option<Column>,
    entries: Vec<(Matcher, FillEntry)>,
}

/// Drop and fill rule tables with every pattern compiled up front.
pub struct Classifier {
    drops: Vec<CompiledDrop>,
    fills: Vec<CompiledFill>,
}

pub struct FillResult {
    pub classified: usize,
    pub unclassified: usize,
    pub skipped_columns: Vec<String>,
}

impl Classifier {
    pub fn new(drop_rules: &[DropRule], fill_rules: &[FillRule]) -> Result<Self> {
        let mut drops = Vec::with_capacity(drop_rules.len());
        for rule in drop_rules {
            let column: Column = rule.column.parse()?;
            let patterns = rule
                .patterns
                .iter()
                .map(|p| -> Result<(String, Matcher)> { Ok((p.clone(), Matcher::new(p, rule.match_type)?)) })
                .collect::<Result<Vec<_>>>()?;
            drops.push(CompiledDrop { column, patterns });
        }

        let mut fills = Vec::with_capacity(fill_rules.len());
        for rule in fill_rules {
            let entries = rule
                .rules
                .iter()
                .map(|e| -> Result<(Matcher, FillEntry)> { Ok((Matcher::new(&e.pattern, rule.match_type)?, e.clone())) })
                .collect::<Result<Vec<_>>>()?;
            fills.push(CompiledFill {
                column: rule.column.clone(),
                resolved: rule.column.parse().ok(),
                entries,
            });
        }
        Ok(Self { drops, fills })
    }

    /// Moves rows matching a drop pattern out of `records`. Patterns run in order and
    /// each one only sees rows no earlier pattern removed.
    pub fn drop_pass(&self, records: Vec<Transaction>) -> (Vec<Transaction>, Vec<Transaction>) {
        let mut kept = records;
        let mut dropped = Vec::new();
        for rule in &self.drops {
            for (pattern, matcher) in &rule.patterns {
                let (hit, rest): (Vec<_>, Vec<_>) = kept
                    .into_iter()
                    .partition(|t| matcher.is_match(&t.field(rule.column)));
                if !hit.is_empty() {
                    debug!("'{pattern}' in {} dropped {} rows", rule.column.name(), hit.len());
                }
                dropped.extend(hit);
                kept = rest;
            }
        }
        info!("{} records dropped, {} kept", dropped.len(), kept.len());
        (kept, dropped)
    }

    /// Overwrites category, sub_cat and new_description on matching rows. Entries run in
    /// configuration order, so a later match on the same row wins.
    pub fn fill_pass(&self, records: &mut [Transaction]) -> FillResult {
        let mut touched = vec![false; records.len()];
        let mut skipped_columns = Vec::new();

        for rule in &self.fills {
            let Some(column) = rule.resolved else {
                warn!("No column called {}", rule.column);
                skipped_columns.push(rule.column.clone());
                continue;
            };
            for (matcher, entry) in &rule.entries {
                for (i, txn) in records.iter_mut().enumerate() {
                    if matcher.is_match(&txn.field(column)) {
                        txn.set_classification(&entry.category, &entry.sub_cat, &entry.description);
                        touched[i] = true;
                    }
                }
            }
        }

        let classified = touched.iter().filter(|t| **t).count();
        info!("Categories and description filled on {classified} records");
        FillResult {
            classified,
            unclassified: records.len() - classified,
            skipped_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::txn;

    fn fill(column: &str, entries: &[(&str, &str, &str, &str)]) -> FillRule {
        FillRule {
            column: column.to_string(),
            match_type: MatchType::Contains,
            rules: entries
                .iter()
                .map(|(p, c, s, d)| FillEntry {
                    pattern: p.to_string(),
                    category: c.to_string(),
                    sub_cat: s.to_string(),
                    description: d.to_string(),
                })
                .collect(),
        }
    }

    fn drop_rule(column: &str, patterns: &[&str]) -> DropRule {
        DropRule {
            column: column.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            match_type: MatchType::Contains,
        }
    }

    #[test]
    fn test_drop_pass_partitions_matches() {
        let records = vec![
            txn("rbs", "2025-01-01", "transfer to savings", "-100"),
            txn("rbs", "2025-01-02", "tesco", "-10"),
            txn("rbs", "2025-01-03", "card payment thank you", "200"),
        ];
        let c = Classifier::new(&[drop_rule("description", &["transfer", "thank you"])], &[]).unwrap();
        let (kept, dropped) = c.drop_pass(records);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].description, "tesco");
        assert_eq!(dropped.len(), 2);
    }

    #[test]
    fn test_drop_pass_is_idempotent() {
        let records = vec![
            txn("rbs", "2025-01-01", "transfer to savings", "-100"),
            txn("rbs", "2025-01-02", "tesco", "-10"),
        ];
        let c = Classifier::new(&[drop_rule("description", &["transfer"])], &[]).unwrap();
        let (kept, _) = c.drop_pass(records);
        let (again, dropped_again) = c.drop_pass(kept.clone());
        assert_eq!(again, kept);
        assert!(dropped_again.is_empty());
    }

    #[test]
    fn test_drop_pass_is_case_sensitive() {
        let records = vec![txn("rbs", "2025-01-01", "transfer", "-1")];
        let c = Classifier::new(&[drop_rule("description", &["TRANSFER"])], &[]).unwrap();
        let (kept, dropped) = c.drop_pass(records);
        assert_eq!(kept.len(), 1);
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_drop_rule_unknown_column_fails() {
        let err = Classifier::new(&[drop_rule("memo", &["x"])], &[]).err().unwrap();
        assert!(matches!(err, TallyError::UnknownColumn(_)));
    }

    #[test]
    fn test_fill_later_rule_wins() {
        let mut records = vec![txn("rbs", "2025-01-01", "amazon prime video", "-8.99")];
        let rules = [fill(
            "description",
            &[
                ("amazon", "Shopping", "Online", "Amazon"),
                ("prime video", "Leisure", "Streaming", "Prime Video"),
            ],
        )];
        let c = Classifier::new(&[], &rules).unwrap();
        let result = c.fill_pass(&mut records);
        assert_eq!(result.classified, 1);
        assert_eq!(records[0].category, "Leisure");
        assert_eq!(records[0].sub_cat, "Streaming");
        assert_eq!(records[0].new_description, "Prime Video");
    }

    #[test]
    fn test_fill_on_account_column() {
        let mut records = vec![
            txn("amex", "2025-01-01", "anything", "-1"),
            txn("rbs", "2025-01-01", "anything", "-1"),
        ];
        let c = Classifier::new(&[], &[fill("account", &[("amex", "Cards", "", "")])]).unwrap();
        let result = c.fill_pass(&mut records);
        assert_eq!(result.classified, 1);
        assert_eq!(result.unclassified, 1);
        assert_eq!(records[0].category, "Cards");
        assert!(records[1].category.is_empty());
    }

    #[test]
    fn test_fill_missing_column_is_skipped() {
        let mut records = vec![txn("rbs", "2025-01-01", "tesco", "-10")];
        let rules = [
            fill("memo", &[("tesco", "Food", "", "")]),
            fill("description", &[("tesco", "Groceries", "Supermarket", "Tesco")]),
        ];
        let c = Classifier::new(&[], &rules).unwrap();
        let result = c.fill_pass(&mut records);
        assert_eq!(result.skipped_columns, vec!["memo".to_string()]);
        assert_eq!(records[0].category, "Groceries");
    }

    #[test]
    fn test_regex_patterns() {
        let mut records = vec![
            txn("rbs", "2025-01-01", "nomina acme 0125", "2000"),
            txn("rbs", "2025-01-01", "acme refund", "20"),
        ];
        let rules = [FillRule {
            column: "description".to_string(),
            match_type: MatchType::Regex,
            rules: vec![FillEntry {
                pattern: r"^nomina .* \d{4}$".to_string(),
                category: "N\u{f3}minas".to_string(),
                sub_cat: "Acme".to_string(),
                description: "Salary".to_string(),
            }],
        }];
        let c = Classifier::new(&[], &rules).unwrap();
        c.fill_pass(&mut records);
        assert_eq!(records[0].sub_cat, "Acme");
        assert!(records[1].sub_cat.is_empty());
    }

    #[test]
    fn test_invalid_regex_fails() {
        let rules = [DropRule {
            column: "description".to_string(),
            patterns: vec!["(unclosed".to_string()],
            match_type: MatchType::Regex,
        }];
        let err = Classifier::new(&rules, &[]).err().unwrap();
        assert!(matches!(err, TallyError::InvalidPattern { .. }));
    }
}
