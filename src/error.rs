use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Settings error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("There are no statements in the folder {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("Failed to import the statement: {} does not exist", .0.display())]
    MissingStatement(PathBuf),

    #[error("Failed to import the statement {}: {reason}", .path.display())]
    MalformedStatement { path: PathBuf, reason: String },

    #[error("No column mapping configured for account: {0}")]
    NoColumnMapping(String),

    #[error("Failed to rename column in {account}: no column called '{column}'")]
    MissingColumn { account: String, column: String },

    #[error("Invalid amount in {account}: '{value}'")]
    InvalidAmount { account: String, value: String },

    #[error("Invalid date in {account}: '{value}'")]
    InvalidDate { account: String, value: String },

    #[error("Unknown column in rule table: {0}")]
    UnknownColumn(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Unsupported statement format for {0}: built without spreadsheet support")]
    UnsupportedFormat(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;
