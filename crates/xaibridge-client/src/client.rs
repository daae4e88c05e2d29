use ndarray::Array2;
use tracing::{debug, info_span, Span};
use xaibridge_core::{ModelEndpoint, ModelInput, Predictor, Result, TensorCodec, Transport};

use crate::{ClientConfig, GrpcTransport, Protocol, RestTransport};

/// Remote model behind a local `predict`.
///
/// Holds one transport for its whole life. `predict` has no side effects
/// beyond the network call.
pub struct ModelClient {
    transport: Box<dyn Transport>,
    codec: TensorCodec,
    span: Span,
}

impl ModelClient {
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint()?;
        let transport: Box<dyn Transport> = match config.protocol {
            Protocol::Grpc => Box::new(GrpcTransport::connect(endpoint, config.timeout())?),
            Protocol::Rest => Box::new(RestTransport::connect(endpoint, config.timeout())?),
        };
        let codec = TensorCodec::new(config.input_name.clone(), config.datatype)?;
        Ok(Self::with_transport(transport, codec))
    }

    pub fn with_transport(transport: Box<dyn Transport>, codec: TensorCodec) -> Self {
        let span = info_span!(
            "model_client",
            protocol = transport.name(),
            model = %transport.endpoint().model_name(),
        );
        Self {
            transport,
            codec,
            span,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn endpoint(&self) -> &ModelEndpoint {
        self.transport.endpoint()
    }

    pub fn protocol(&self) -> &'static str {
        self.transport.name()
    }

    pub fn ready(&self) -> Result<bool> {
        let _enter = self.span.enter();
        let ready = self.transport.ready()?;
        debug!(ready, "readiness probe");
        Ok(ready)
    }

    pub fn predict(&self, input: &ModelInput) -> Result<Array2<f64>> {
        let _enter = self.span.enter();
        let (rows, cols) = input.dims();
        let request = self.codec.request(self.transport.endpoint(), input)?;
        let id = request.id.clone();
        debug!(%id, rows, cols, "predict");

        let response = self.transport.send(request).inspect_err(|e| {
            debug!(%id, error = %e, "predict failed");
        })?;
        let output = self.codec.decode(&response)?;
        debug!(%id, out_rows = output.nrows(), out_cols = output.ncols(), "predict done");
        Ok(output)
    }
}

impl Predictor for ModelClient {
    fn predict(&self, input: &ModelInput) -> Result<Array2<f64>> {
        ModelClient::predict(self, input)
    }
}
