//! Time-series LIME: a linear surrogate fitted on perturbed histories.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{ColumnCount, ExplainError, ExplainerParams, TsFrame};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TsLimeParams {
    pub input_length: usize,
    #[serde(default = "default_n_perturbations")]
    pub n_perturbations: usize,
    /// Most recent rows the surrogate weighs; all of `input_length` when unset.
    #[serde(default)]
    pub relevant_history: Option<usize>,
    #[serde(default)]
    pub perturbers: Option<Vec<String>>,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_n_perturbations() -> usize {
    2000
}

impl TsLimeParams {
    pub fn new(input_length: usize) -> Self {
        Self {
            input_length,
            n_perturbations: default_n_perturbations(),
            relevant_history: None,
            perturbers: None,
            random_seed: None,
        }
    }

    pub fn history(&self) -> usize {
        self.relevant_history.unwrap_or(self.input_length)
    }
}

impl ExplainerParams for TsLimeParams {
    fn validate(&self) -> Result<(), ExplainError> {
        if self.input_length == 0 {
            return Err(ExplainError::Configuration(
                "input_length must be greater than zero".to_string(),
            ));
        }
        if self.n_perturbations == 0 {
            return Err(ExplainError::Configuration(
                "n_perturbations must be greater than zero".to_string(),
            ));
        }
        if let Some(h) = self.relevant_history {
            if h == 0 || h > self.input_length {
                return Err(ExplainError::Configuration(format!(
                    "relevant_history must be in 1..={}, got {h}",
                    self.input_length
                )));
            }
        }
        if matches!(&self.perturbers, Some(p) if p.is_empty()) {
            return Err(ExplainError::Configuration(
                "perturbers must be omitted rather than empty".to_string(),
            ));
        }
        Ok(())
    }

    fn input_length(&self) -> usize {
        self.input_length
    }

    fn value_columns(&self) -> ColumnCount {
        ColumnCount::AtLeast(1)
    }
}

/// `history_weights` is `[relevant_history, variables]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TsLimeExplanation {
    pub input_data: TsFrame,
    pub history_weights: Array2<f64>,
    pub model_prediction: Array2<f64>,
    pub surrogate_prediction: Array2<f64>,
    pub x_perturbations: Vec<Array2<f64>>,
    pub y_perturbations: Vec<Array2<f64>>,
}
