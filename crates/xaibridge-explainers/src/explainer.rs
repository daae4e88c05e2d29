use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Span};
use xaibridge_client::{ClientConfig, ModelClient};
use xaibridge_core::{Predictor, Table};

use crate::{ExplainError, ExplainerParams, Forecaster, PerturbationEngine, TsFrame};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExplainerState {
    Configured,
    Explaining,
    Done,
    Failed,
}

/// Which column holds timestamps, and how to read them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framing {
    pub timestamp_column: String,
    #[serde(default)]
    pub timestamp_format: Option<String>,
}

impl Framing {
    pub fn new(timestamp_column: impl Into<String>) -> Self {
        Self {
            timestamp_column: timestamp_column.into(),
            timestamp_format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = Some(format.into());
        self
    }

    pub fn validate(&self) -> Result<(), ExplainError> {
        if self.timestamp_column.trim().is_empty() {
            return Err(ExplainError::Configuration(
                "timestamp_column cannot be empty".to_string(),
            ));
        }
        if matches!(self.timestamp_format.as_deref(), Some(f) if f.trim().is_empty()) {
            return Err(ExplainError::Configuration(
                "timestamp_format must be omitted rather than empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Something that explains one point at a time.
pub trait Explainer {
    type Explanation;

    fn explain(&mut self, point: &Table) -> Result<Self::Explanation, ExplainError>;

    fn state(&self) -> ExplainerState;
}

/// Runs a perturbation engine against a model, remote by default.
///
/// Parameters and framing are checked at construction. Each `explain`
/// checks the point before the first predict call; a rejected point leaves
/// the state untouched.
pub struct TimeSeriesExplainer<E: PerturbationEngine, P: Predictor = ModelClient> {
    engine: E,
    params: E::Params,
    framing: Framing,
    model: P,
    state: ExplainerState,
    span: Span,
}

impl<E: PerturbationEngine> TimeSeriesExplainer<E, ModelClient> {
    /// Connects a client for `config` and binds it as the model.
    pub fn connect(
        engine: E,
        params: E::Params,
        framing: Framing,
        config: &ClientConfig,
    ) -> Result<Self, ExplainError> {
        params.validate()?;
        framing.validate()?;
        let client = ModelClient::connect(config).map_err(|e| match e {
            xaibridge_core::Error::Configuration(msg) => ExplainError::Configuration(msg),
            other => ExplainError::Frame(other),
        })?;
        Self::new(engine, params, framing, client)
    }
}

impl<E: PerturbationEngine, P: Predictor> TimeSeriesExplainer<E, P> {
    pub fn new(engine: E, params: E::Params, framing: Framing, model: P) -> Result<Self, ExplainError> {
        params.validate()?;
        framing.validate()?;
        let span = info_span!("explainer", engine = engine.name());
        Ok(Self {
            engine,
            params,
            framing,
            model,
            state: ExplainerState::Configured,
            span,
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> ExplainerState {
        self.state
    }

    pub fn params(&self) -> &E::Params {
        &self.params
    }

    pub fn framing(&self) -> &Framing {
        &self.framing
    }

    pub fn model(&self) -> &P {
        &self.model
    }

    pub fn explain(&mut self, point: &Table) -> Result<E::Explanation, ExplainError> {
        let frame = self.prepare(point)?;
        self.state = ExplainerState::Explaining;
        let result = drive(&self.engine, &self.params, &frame, &self.model, &self.span);
        self.finish(result)
    }

    /// Explains against `model` instead of the bound one.
    pub fn explain_with(
        &mut self,
        point: &Table,
        model: &dyn Predictor,
    ) -> Result<E::Explanation, ExplainError> {
        let frame = self.prepare(point)?;
        self.state = ExplainerState::Explaining;
        let result = drive(&self.engine, &self.params, &frame, model, &self.span);
        self.finish(result)
    }

    fn prepare(&self, point: &Table) -> Result<TsFrame, ExplainError> {
        let _enter = self.span.enter();
        let ts = &self.framing.timestamp_column;
        if point.column_index(ts).is_none() {
            return Err(ExplainError::InvalidInput(format!(
                "point has no timestamp column `{ts}` (columns: {:?})",
                point.column_names()
            )));
        }

        let value_columns = point.n_cols() - 1;
        let expected = self.params.value_columns();
        if !expected.accepts(value_columns) {
            return Err(ExplainError::InvalidInput(format!(
                "point has {value_columns} value columns, expected {expected:?}"
            )));
        }

        let input_length = self.params.input_length();
        if point.n_rows() < input_length {
            return Err(ExplainError::InvalidInput(format!(
                "point has {} rows, input_length is {input_length}",
                point.n_rows()
            )));
        }

        TsFrame::from_table(point, ts, self.framing.timestamp_format.as_deref())
    }

    fn finish(&mut self, result: Result<E::Explanation, ExplainError>) -> Result<E::Explanation, ExplainError> {
        let _enter = self.span.enter();
        match &result {
            Ok(_) => {
                self.state = ExplainerState::Done;
                info!("explanation done");
            }
            Err(e) => {
                self.state = ExplainerState::Failed;
                warn!(error = %e, "explanation failed");
            }
        }
        result
    }
}

impl<E: PerturbationEngine, P: Predictor> Explainer for TimeSeriesExplainer<E, P> {
    type Explanation = E::Explanation;

    fn explain(&mut self, point: &Table) -> Result<E::Explanation, ExplainError> {
        TimeSeriesExplainer::explain(self, point)
    }

    fn state(&self) -> ExplainerState {
        self.state
    }
}

fn drive<E: PerturbationEngine>(
    engine: &E,
    params: &E::Params,
    frame: &TsFrame,
    model: &dyn Predictor,
    span: &Span,
) -> Result<E::Explanation, ExplainError> {
    let _enter = span.enter();
    info!(rows = frame.n_rows(), cols = frame.n_cols(), "explaining");

    let mut forecaster = ModelForecaster::new(model);
    let result = engine.explain_instance(params, frame, &mut forecaster);

    // The first failed call wins, even if the engine swallowed it.
    match (result, forecaster.first_error) {
        (_, Some((call, source))) => Err(ExplainError::Prediction { call, source }),
        (result, None) => {
            debug!(calls = forecaster.calls, "engine finished");
            result
        }
    }
}

/// Adapts a [`Predictor`] to the engine's forecaster callback, numbering
/// calls from 1.
struct ModelForecaster<'a> {
    model: &'a dyn Predictor,
    calls: usize,
    first_error: Option<(usize, xaibridge_core::Error)>,
}

impl<'a> ModelForecaster<'a> {
    fn new(model: &'a dyn Predictor) -> Self {
        Self {
            model,
            calls: 0,
            first_error: None,
        }
    }
}

impl Forecaster for ModelForecaster<'_> {
    fn forecast(&mut self, window: &TsFrame) -> Result<Array2<f64>, ExplainError> {
        self.calls += 1;
        let call = self.calls;
        debug!(call, rows = window.n_rows(), "predict");

        self.model.predict(&window.to_input()).map_err(|source| {
            if self.first_error.is_none() {
                self.first_error = Some((call, source.clone()));
            }
            ExplainError::Prediction { call, source }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_requires_a_timestamp_column() {
        assert!(Framing::new("t").validate().is_ok());
        assert!(matches!(
            Framing::new(" ").validate(),
            Err(ExplainError::Configuration(_))
        ));
        assert!(Framing::new("t").with_format("").validate().is_err());
    }

    #[test]
    fn framing_deserializes_without_format() {
        let framing: Framing = serde_json::from_str(r#"{"timestamp_column": "date"}"#).unwrap();
        assert_eq!(framing, Framing::new("date"));
    }
}
