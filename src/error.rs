// 🚨 Error taxonomy for the roster pipeline
// Every variant is fatal: the run aborts and nothing further is written.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    /// Source could not be fetched (missing file, network failure, non-2xx)
    #[error("source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// Source was fetched but holds zero data rows
    #[error("source '{source_name}' returned no rows")]
    EmptyData { source_name: String },

    /// Source is missing a column the pipeline joins or projects on
    #[error("source '{source_name}' is missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    /// A created/updated value is present but is not a date-time
    ///
    /// `merged_row` counts rows of the merged roster, not lines of a source file.
    #[error("could not parse '{value}' in column '{column}' (cons_id {cons_id}, merged row {merged_row}) as a date-time")]
    DateParse {
        column: String,
        cons_id: String,
        merged_row: usize,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EtlError {
    pub fn unavailable(source_name: &str, reason: impl ToString) -> Self {
        EtlError::SourceUnavailable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
