//! Error types for the masking engine.
//!
//! Every variant of [`MaskError`] is fatal: it aborts the run with a nonzero
//! exit status. Malformed `INSERT` lines are reported through
//! [`crate::parser::ParseError`] instead and never abort the stream.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("cannot read config {path:?}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path:?}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("invalid template for `{table}`.`{column}`: {message}")]
    Template {
        table: String,
        column: String,
        message: String,
    },

    #[error("bcrypt cost {cost} out of range (min: {min}, max: {max})")]
    InvalidCost { cost: u32, min: u32, max: u32 },

    #[error("failed to generate salt: {0}")]
    Salt(String),

    #[error("failed to hash value: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("template for `{table}`.`{column}` rendered non-numeric value {value:?} for a numeric column")]
    ValueFormat {
        table: String,
        column: String,
        value: String,
    },

    #[error("no column list for `{table}`: INSERT has none and no CREATE TABLE was seen")]
    MissingColumns { table: String },

    #[error("`{table}` has {expected} columns but its INSERT rows have {found} values")]
    ColumnMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("line {line} exceeds the maximum statement size of {limit} bytes")]
    LineTooLong { line: u64, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MaskError>;
