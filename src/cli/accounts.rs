use std::path::Path;

use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::settings::{load_configuration, Configuration};

fn currency_of(config: &Configuration, account: &str) -> &'static str {
    config.currency_of(account).map_or("-", |c| c.code())
}

fn sign_rule_of(config: &Configuration, account: &str) -> String {
    config
        .sign_rules
        .get(account)
        .map(|r| r.label())
        .unwrap_or_else(|| "as is".to_string())
}

fn mapped(config: &Configuration, account: &str) -> &'static str {
    if config.column_renames.contains_key(account) {
        "yes"
    } else {
        "no"
    }
}

pub fn list(config_path: Option<&Path>) -> Result<()> {
    let config = load_configuration(config_path)?;
    let registry = &config.accounts;

    let mut table = Table::new();
    table.set_header(vec!["Account", "Files", "Format", "Currency", "Sign", "Mapped"]);
    for family in &registry.families {
        table.add_row(vec![
            Cell::new(&family.account),
            Cell::new(
                family
                    .aliases
                    .iter()
                    .map(|a| format!("{a}.{}", family.format.extension()))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Cell::new(family.format.label()),
            Cell::new(currency_of(&config, &family.account)),
            Cell::new(sign_rule_of(&config, &family.account)),
            Cell::new(mapped(&config, &family.account)),
        ]);
    }

    // Mapped accounts outside every family are read with the fallback format.
    for account in config.column_renames.keys() {
        if registry.families.iter().any(|f| &f.account == account) {
            continue;
        }
        table.add_row(vec![
            Cell::new(account),
            Cell::new(format!("{account}.{}", registry.fallback.extension())),
            Cell::new(registry.fallback.label()),
            Cell::new(currency_of(&config, account)),
            Cell::new(sign_rule_of(&config, account)),
            Cell::new("yes"),
        ]);
    }

    println!("Accounts\n{table}");
    Ok(())
}
