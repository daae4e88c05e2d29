//! KServe V2 REST transport.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;
use xaibridge_core::{
    DType, Error, InferTensor, InferenceRequest, InferenceResponse, ModelEndpoint, Result, Shape,
    TensorData, Transport, TransportError,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestTensor {
    pub name: String,
    pub shape: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    pub data: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestInferRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub inputs: Vec<RestTensor>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestInferResponse {
    #[serde(default)]
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub outputs: Vec<RestTensor>,
}

impl RestTensor {
    /// JSON cannot carry NaN or infinities, so those are refused here rather
    /// than turned into `null`.
    pub fn from_tensor(tensor: InferTensor) -> Result<Self> {
        let datatype = tensor.dtype();
        let (name, shape, data) = tensor.into_parts();
        let values: Vec<Value> = match data {
            TensorData::F32(v) => floats_to_json(&name, v.into_iter().map(f64::from))?,
            TensorData::F64(v) => floats_to_json(&name, v.into_iter())?,
            TensorData::I32(v) => v.into_iter().map(Value::from).collect(),
            TensorData::I64(v) => v.into_iter().map(Value::from).collect(),
        };
        Ok(Self {
            name,
            shape: shape.to_wire(),
            datatype: Some(datatype.as_str().to_string()),
            data: Value::Array(values),
        })
    }

    /// Accepts flat or nested `data`; nested arrays are read row-major.
    /// A missing datatype is read as FP64.
    pub fn into_tensor(self) -> Result<InferTensor> {
        let dtype = match self.datatype.as_deref() {
            Some(raw) => DType::parse(raw)?,
            None => DType::F64,
        };
        let shape = Shape::from_wire(&self.shape)?;

        let mut numbers = Vec::new();
        flatten(&self.name, &self.data, &mut numbers)?;

        let data = match dtype {
            DType::F64 => TensorData::F64(numbers.iter().map(|n| as_float(&self.name, n)).collect::<Result<_>>()?),
            DType::F32 => TensorData::F32(
                numbers
                    .iter()
                    .map(|n| as_float(&self.name, n).map(|v| v as f32))
                    .collect::<Result<_>>()?,
            ),
            DType::I64 => TensorData::I64(numbers.iter().map(|n| as_int(&self.name, dtype, n)).collect::<Result<_>>()?),
            DType::I32 => TensorData::I32(
                numbers
                    .iter()
                    .map(|n| {
                        as_int(&self.name, dtype, n).and_then(|v| {
                            i32::try_from(v).map_err(|_| int_mismatch(&self.name, dtype, n))
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
        };
        InferTensor::new(self.name, shape, data)
    }
}

impl RestInferRequest {
    pub fn from_request(request: InferenceRequest) -> Result<Self> {
        Ok(Self {
            id: Some(request.id),
            inputs: request
                .inputs
                .into_iter()
                .map(RestTensor::from_tensor)
                .collect::<Result<_>>()?,
        })
    }
}

impl RestInferResponse {
    pub fn into_response(self) -> Result<InferenceResponse> {
        Ok(InferenceResponse {
            model_name: self.model_name,
            model_version: self.model_version,
            id: self.id,
            outputs: self
                .outputs
                .into_iter()
                .map(RestTensor::into_tensor)
                .collect::<Result<_>>()?,
        })
    }
}

/// Blocking JSON transport. Like the gRPC transport it owns a small runtime
/// and drives the async HTTP client to completion on each call.
pub struct RestTransport {
    endpoint: ModelEndpoint,
    http: reqwest::Client,
    runtime: Runtime,
}

impl RestTransport {
    pub fn connect(endpoint: ModelEndpoint, timeout: Option<Duration>) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::from)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout).connect_timeout(timeout);
        }
        let http = {
            let _guard = runtime.enter();
            builder
                .build()
                .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {e}")))?
        };

        Ok(Self {
            endpoint,
            http,
            runtime,
        })
    }

    /// `/v2/models/{name}[/versions/{version}]/{action}`
    pub fn model_url(&self, action: &str) -> String {
        model_url(&self.endpoint, action)
    }

    fn reqwest_to_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                target: self.endpoint.target().to_string(),
            }
        } else if err.is_decode() || err.is_body() {
            TransportError::Malformed(err.to_string())
        } else {
            TransportError::Connection {
                target: self.endpoint.target().to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl Transport for RestTransport {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn endpoint(&self) -> &ModelEndpoint {
        &self.endpoint
    }

    fn send(&self, request: InferenceRequest) -> Result<InferenceResponse> {
        let url = self.model_url("infer");
        debug!(%url, id = %request.id, inputs = request.inputs.len(), "posting V2 infer request");
        let body = RestInferRequest::from_request(request)?;

        let (status, text) = self
            .runtime
            .block_on(async {
                let response = self.http.post(&url).json(&body).send().await?;
                let status = response.status();
                let text = response.text().await?;
                Ok::<_, reqwest::Error>((status, text))
            })
            .map_err(|e| self.reqwest_to_error(e))?;

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let parsed: RestInferResponse = serde_json::from_str(&text)
            .map_err(|e| TransportError::Malformed(format!("invalid infer response: {e}")))?;
        parsed.into_response()
    }

    fn ready(&self) -> Result<bool> {
        let url = self.model_url("ready");
        let status = self
            .runtime
            .block_on(async { self.http.get(&url).send().await.map(|r| r.status()) })
            .map_err(|e| self.reqwest_to_error(e))?;

        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::SERVICE_UNAVAILABLE => Ok(false),
            s => Err(TransportError::Http {
                status: s.as_u16(),
                body: String::new(),
            }
            .into()),
        }
    }
}

fn model_url(endpoint: &ModelEndpoint, action: &str) -> String {
    match endpoint.model_version() {
        Some(version) => format!(
            "{}/v2/models/{}/versions/{}/{}",
            endpoint.base_url(),
            endpoint.model_name(),
            version,
            action
        ),
        None => format!(
            "{}/v2/models/{}/{}",
            endpoint.base_url(),
            endpoint.model_name(),
            action
        ),
    }
}

fn floats_to_json(name: &str, values: impl Iterator<Item = f64>) -> Result<Vec<Value>> {
    values
        .enumerate()
        .map(|(idx, v)| {
            Number::from_f64(v).map(Value::Number).ok_or_else(|| {
                Error::UnsupportedType(format!(
                    "tensor `{name}` holds non-finite value {v} at position {idx}, which JSON cannot encode"
                ))
            })
        })
        .collect()
}

fn flatten<'a>(name: &str, value: &'a Value, out: &mut Vec<&'a Number>) -> Result<()> {
    match value {
        Value::Number(n) => out.push(n),
        Value::Array(items) => {
            for item in items {
                flatten(name, item, out)?;
            }
        }
        other => {
            return Err(TransportError::Malformed(format!(
                "tensor `{name}` data holds a non-numeric value: {other}"
            ))
            .into())
        }
    }
    Ok(())
}

fn as_float(name: &str, n: &Number) -> Result<f64> {
    n.as_f64().ok_or_else(|| {
        TransportError::Malformed(format!("tensor `{name}` holds unreadable number {n}")).into()
    })
}

fn as_int(name: &str, dtype: DType, n: &Number) -> Result<i64> {
    n.as_i64().ok_or_else(|| int_mismatch(name, dtype, n))
}

fn int_mismatch(name: &str, dtype: DType, n: &Number) -> Error {
    Error::DatatypeMismatch {
        tensor: name.to_string(),
        detail: format!("value {n} is not a valid {dtype}"),
    }
}
