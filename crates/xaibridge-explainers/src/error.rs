use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExplainError {
    /// Hyperparameters or framing rejected at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The point to explain does not fit the configured explainer.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The first predict call that failed during one explanation (1-based).
    #[error("predict call {call} failed: {source}")]
    Prediction {
        call: usize,
        #[source]
        source: xaibridge_core::Error,
    },

    #[error("explainer engine failed: {0}")]
    Engine(String),

    /// Table, framing or client failures outside any predict call.
    #[error(transparent)]
    Frame(#[from] xaibridge_core::Error),
}
