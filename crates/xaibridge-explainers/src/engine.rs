//! Seams to the external perturbation library.

use ndarray::Array2;

use crate::{ExplainError, TsFrame};

/// The model as a perturbation algorithm sees it: a window of observations
/// in, a forecast out (`[lookahead, variables]`).
pub trait Forecaster {
    fn forecast(&mut self, window: &TsFrame) -> Result<Array2<f64>, ExplainError>;
}

/// How many non-timestamp columns a point must carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnCount {
    Exactly(usize),
    AtLeast(usize),
}

impl ColumnCount {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            ColumnCount::Exactly(want) => n == want,
            ColumnCount::AtLeast(min) => n >= min,
        }
    }
}

pub trait ExplainerParams {
    fn validate(&self) -> Result<(), ExplainError>;

    /// Rows of history the algorithm consumes.
    fn input_length(&self) -> usize;

    fn value_columns(&self) -> ColumnCount;
}

/// A perturbation-based time-series explanation algorithm.
///
/// Implementations call `forecaster` serially, in algorithm order, and
/// must not retain it past `explain_instance`.
pub trait PerturbationEngine {
    type Params: ExplainerParams;
    type Explanation;

    fn name(&self) -> &'static str;

    fn explain_instance(
        &self,
        params: &Self::Params,
        ts: &TsFrame,
        forecaster: &mut dyn Forecaster,
    ) -> Result<Self::Explanation, ExplainError>;
}
