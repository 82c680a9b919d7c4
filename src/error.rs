//! Error taxonomy for balance table generation
//!
//! Every variant is a local validation failure. Generation is all-or-nothing:
//! when any of these is returned no markup has been produced.

use thiserror::Error;

/// Errors for summarizing, testing and rendering balance tables
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BalanceError {
    #[error("Group '{group}' has no observations for covariate '{covariate}'")]
    EmptyGroup { covariate: String, group: String },

    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Both samples have zero variance; t statistic is undefined")]
    ZeroVariance,

    #[error("Covariate column not found in dataset: {0}")]
    MissingCovariate(String),

    #[error("Significance thresholds must be strictly ascending in strictness (loosest first), got {0:?}")]
    UnsortedThresholds(Vec<f64>),

    #[error("Treatment column not found in dataset: {0}")]
    MissingTreatmentColumn(String),

    #[error("Row {row} has no value for treatment column '{column}'")]
    MissingTreatmentValue { column: String, row: usize },

    #[error("Row {row} has a non-numeric value in covariate column '{column}'")]
    NonNumericValue { column: String, row: usize },

    #[error("Covariate listed more than once: {0}")]
    DuplicateCovariate(String),

    #[error("No covariates requested")]
    NoCovariates,

    #[error("Dataset has no rows")]
    EmptyDataset,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("t distribution unavailable: {0}")]
    Distribution(String),

    #[error("Table row spans {actual} columns, expected {expected}")]
    ColumnMismatch { expected: usize, actual: usize },
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, BalanceError>;

impl BalanceError {
    /// Whether this error describes a sample too degenerate for a t-test
    ///
    /// These are downgraded to "no significance" instead of aborting a table.
    pub fn is_degenerate_sample(&self) -> bool {
        matches!(
            self,
            BalanceError::InsufficientData { .. } | BalanceError::ZeroVariance
        )
    }
}
