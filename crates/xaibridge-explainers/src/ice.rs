//! Time-series ICE: how a forecast responds to perturbations of summary
//! features over an explanation window.

use std::fmt;
use std::ops::Range;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{ColumnCount, ExplainError, ExplainerParams, TsFrame};

/// Window statistics a TSICE engine can perturb and analyse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyseFeature {
    Median,
    Mean,
    Min,
    Max,
    Std,
    Range,
    Intercept,
    Trend,
    Rsquared,
    MaxVariation,
}

impl AnalyseFeature {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalyseFeature::Median => "median",
            AnalyseFeature::Mean => "mean",
            AnalyseFeature::Min => "min",
            AnalyseFeature::Max => "max",
            AnalyseFeature::Std => "std",
            AnalyseFeature::Range => "range",
            AnalyseFeature::Intercept => "intercept",
            AnalyseFeature::Trend => "trend",
            AnalyseFeature::Rsquared => "rsquared",
            AnalyseFeature::MaxVariation => "max_variation",
        }
    }
}

impl fmt::Display for AnalyseFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TsIceParams {
    pub input_length: usize,
    pub forecast_lookahead: usize,
    #[serde(default = "default_n_variables")]
    pub n_variables: usize,
    #[serde(default)]
    pub n_exogs: usize,
    #[serde(default = "default_n_perturbations")]
    pub n_perturbations: usize,
    #[serde(default = "default_features")]
    pub features_to_analyze: Vec<AnalyseFeature>,
    /// Perturber names understood by the engine; the engine's own default
    /// when unset.
    #[serde(default)]
    pub perturbers: Option<Vec<String>>,
    #[serde(default)]
    pub explanation_window_start: Option<usize>,
    #[serde(default = "default_window_length")]
    pub explanation_window_length: usize,
}

fn default_n_variables() -> usize {
    1
}

fn default_n_perturbations() -> usize {
    25
}

fn default_features() -> Vec<AnalyseFeature> {
    vec![AnalyseFeature::Mean]
}

fn default_window_length() -> usize {
    10
}

impl TsIceParams {
    pub fn new(input_length: usize, forecast_lookahead: usize) -> Self {
        Self {
            input_length,
            forecast_lookahead,
            n_variables: default_n_variables(),
            n_exogs: 0,
            n_perturbations: default_n_perturbations(),
            features_to_analyze: default_features(),
            perturbers: None,
            explanation_window_start: None,
            explanation_window_length: default_window_length(),
        }
    }

    /// Rows of the input window the perturbations touch. Without an explicit
    /// start the window ends at the most recent observation.
    pub fn explanation_window(&self) -> Range<usize> {
        let start = self
            .explanation_window_start
            .unwrap_or_else(|| self.input_length.saturating_sub(self.explanation_window_length));
        start..start + self.explanation_window_length
    }
}

impl ExplainerParams for TsIceParams {
    fn validate(&self) -> Result<(), ExplainError> {
        let positive = [
            ("input_length", self.input_length),
            ("forecast_lookahead", self.forecast_lookahead),
            ("n_variables", self.n_variables),
            ("n_perturbations", self.n_perturbations),
            ("explanation_window_length", self.explanation_window_length),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ExplainError::Configuration(format!("{name} must be greater than zero")));
            }
        }
        if self.explanation_window_length > self.input_length {
            return Err(ExplainError::Configuration(format!(
                "explanation_window_length {} exceeds input_length {}",
                self.explanation_window_length, self.input_length
            )));
        }
        if let Some(start) = self.explanation_window_start {
            let end = start.checked_add(self.explanation_window_length);
            if end.map_or(true, |end| end > self.input_length) {
                return Err(ExplainError::Configuration(format!(
                    "explanation window starting at {start} with length {} exceeds input_length {}",
                    self.explanation_window_length, self.input_length
                )));
            }
        }
        if self.features_to_analyze.is_empty() {
            return Err(ExplainError::Configuration(
                "features_to_analyze cannot be empty".to_string(),
            ));
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
        ColumnCount::Exactly(self.n_variables + self.n_exogs)
    }
}

/// `feature_values[f][p]` is feature `feature_names[f]` measured on
/// perturbation `p`; impacts are per feature.
#[derive(Clone, Debug, PartialEq)]
pub struct TsIceExplanation {
    pub data_x: TsFrame,
    pub current_forecast: Array2<f64>,
    pub feature_names: Vec<String>,
    pub feature_values: Vec<Vec<f64>>,
    pub signed_impact: Vec<f64>,
    pub total_impact: Vec<f64>,
    pub current_feature_values: Vec<f64>,
    pub perturbations: Vec<TsFrame>,
    pub forecast_on_perturbations: Vec<Array2<f64>>,
}
