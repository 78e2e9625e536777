use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accounts::AccountRegistry;
use crate::categorizer::{DropRule, FillRule};
use crate::models::Currency;
use crate::error::{Result, TallyError};
use crate::synthetic::{PensionScheme, SalaryDeduction};
use crate::transform::{default_sign_rules, SignRule};

/// Static tables the pipeline reads but never mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub input_folder: String,
    pub output_folder: String,
    pub accounts: AccountRegistry,
    /// Canonical account -> (normalized source header -> target column).
    pub column_renames: BTreeMap<String, BTreeMap<String, String>>,
    pub gbp_accounts: Vec<String>,
    pub eur_accounts: Vec<String>,
    pub sign_rules: BTreeMap<String, SignRule>,
    pub drop_rules: Vec<DropRule>,
    pub fill_rules: Vec<FillRule>,
    /// Category that marks salary rows for the pension and deduction generators.
    pub salary_category: String,
    pub pension_prefix: String,
    pub pensions: Vec<PensionScheme>,
    pub salary_deductions: Vec<SalaryDeduction>,
    /// When set, this payer's effective date governs every salary deduction.
    pub deduction_policy_payer: Option<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            input_folder: data_dir().join("statements").to_string_lossy().to_string(),
            output_folder: data_dir().join("exports").to_string_lossy().to_string(),
            accounts: AccountRegistry::default(),
            column_renames: BTreeMap::new(),
            gbp_accounts: Vec::new(),
            eur_accounts: Vec::new(),
            sign_rules: default_sign_rules(),
            drop_rules: Vec::new(),
            fill_rules: Vec::new(),
            salary_category: "N\u{f3}minas".to_string(),
            pension_prefix: "Pension".to_string(),
            pensions: Vec::new(),
            salary_deductions: Vec::new(),
            deduction_policy_payer: None,
        }
    }
}

impl Configuration {
    pub fn input_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.input_folder))
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.output_folder))
    }

    /// GBP membership wins over EUR; `None` for an account in neither set.
    pub fn currency_of(&self, account: &str) -> Option<Currency> {
        if self.gbp_accounts.iter().any(|a| a == account) {
            Some(Currency::Gbp)
        } else if self.eur_accounts.iter().any(|a| a == account) {
            Some(Currency::Eur)
        } else {
            None
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tally")
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("tally")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Loads the configuration at `path`, or the default location when `None`.
/// A missing default file yields the built-in configuration; a missing explicit one is an error.
pub fn load_configuration(path: Option<&Path>) -> Result<Configuration> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (default_config_path(), false),
    };
    if !path.exists() {
        if explicit {
            return Err(TallyError::Settings(format!(
                "No configuration found at {}",
                path.display()
            )));
        }
        debug!("No configuration at {}, using defaults", path.display());
        return Ok(Configuration::default());
    }
    debug!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(&path)?;
    let config: Configuration = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_configuration(config: &Configuration, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
