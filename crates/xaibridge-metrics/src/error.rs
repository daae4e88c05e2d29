use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum MetricError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("column `{0}` is missing from the table")]
    MissingColumn(String),

    /// A label that is neither the favorable nor the unfavorable value.
    #[error("row {row} has label {value}, expected {favorable} or {unfavorable}")]
    InvalidLabel {
        row: usize,
        value: f64,
        favorable: f64,
        unfavorable: f64,
    },

    #[error("fairness backend failed: {0}")]
    Backend(String),

    #[error(transparent)]
    Table(#[from] xaibridge_core::Error),
}
