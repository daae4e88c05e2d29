use ndarray::Array2;

use crate::{InferenceRequest, InferenceResponse, ModelEndpoint, ModelInput, Result};

/// One serving protocol bound to one model endpoint.
///
/// Implementations hold a long-lived connection handle and no per-call
/// state. They never retry: a failed `send` is reported once.
pub trait Transport: Send {
    fn name(&self) -> &'static str;

    fn endpoint(&self) -> &ModelEndpoint;

    /// Blocks until the server answers or the call fails.
    fn send(&self, request: InferenceRequest) -> Result<InferenceResponse>;

    /// Whether the bound model reports itself ready to serve.
    fn ready(&self) -> Result<bool>;
}

/// The black box an explainer queries: rows in, rows of predictions out.
pub trait Predictor {
    fn predict(&self, input: &ModelInput) -> Result<Array2<f64>>;
}

impl<F> Predictor for F
where
    F: Fn(&ModelInput) -> Result<Array2<f64>>,
{
    fn predict(&self, input: &ModelInput) -> Result<Array2<f64>> {
        self(input)
    }
}
