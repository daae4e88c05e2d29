use std::time::Duration;

use bytes::Buf;
use tokio::runtime::{Builder, Runtime};
use tonic::transport::{Channel, Endpoint};
use tonic::Code;
use tracing::debug;
use xaibridge_core::{
    DType, Error, InferTensor, InferenceRequest, InferenceResponse, ModelEndpoint, Result, Shape,
    TensorData, Transport, TransportError,
};
use xaibridge_proto::inference as pb;
use xaibridge_proto::inference::grpc_inference_service_client::GrpcInferenceServiceClient;

/// KServe V2 gRPC transport.
///
/// The channel is created once and connects lazily on the first call, so an
/// unreachable endpoint surfaces as a [`TransportError::Connection`] from
/// `send` rather than from construction.
pub struct GrpcTransport {
    endpoint: ModelEndpoint,
    client: GrpcInferenceServiceClient<Channel>,
    runtime: Runtime,
    timeout: Option<Duration>,
}

impl GrpcTransport {
    pub fn connect(endpoint: ModelEndpoint, timeout: Option<Duration>) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::from)?;

        let mut channel = Endpoint::from_shared(endpoint.base_url()).map_err(|e| {
            Error::Configuration(format!("invalid gRPC target `{}`: {e}", endpoint.target()))
        })?;
        if let Some(timeout) = timeout {
            channel = channel.timeout(timeout).connect_timeout(timeout);
        }
        let channel = {
            let _guard = runtime.enter();
            channel.connect_lazy()
        };

        debug!(target_addr = %endpoint.target(), model = %endpoint.model_name(), "gRPC channel created");
        Ok(Self {
            endpoint,
            client: GrpcInferenceServiceClient::new(channel),
            runtime,
            timeout,
        })
    }

    fn status_to_error(&self, status: tonic::Status) -> TransportError {
        match status.code() {
            Code::Unavailable => TransportError::Connection {
                target: self.endpoint.target().to_string(),
                message: status.message().to_string(),
            },
            Code::DeadlineExceeded => TransportError::Timeout {
                target: self.endpoint.target().to_string(),
            },
            Code::Cancelled if self.timeout.is_some() => TransportError::Timeout {
                target: self.endpoint.target().to_string(),
            },
            code => TransportError::Status {
                code: format!("{code:?}"),
                message: status.message().to_string(),
            },
        }
    }
}

impl Transport for GrpcTransport {
    fn name(&self) -> &'static str {
        "grpc"
    }

    fn endpoint(&self) -> &ModelEndpoint {
        &self.endpoint
    }

    fn send(&self, request: InferenceRequest) -> Result<InferenceResponse> {
        debug!(model = %request.model_name, id = %request.id, inputs = request.inputs.len(), "sending ModelInfer");
        let request = tonic::Request::new(request_to_pb(request));

        let mut client = self.client.clone();
        let response = self
            .runtime
            .block_on(async { client.model_infer(request).await })
            .map_err(|status| self.status_to_error(status))?;

        response_from_pb(response.into_inner())
    }

    fn ready(&self) -> Result<bool> {
        let request = tonic::Request::new(pb::ModelReadyRequest {
            name: self.endpoint.model_name().to_string(),
            version: self.endpoint.model_version().unwrap_or_default().to_string(),
        });

        let mut client = self.client.clone();
        let response = self
            .runtime
            .block_on(async { client.model_ready(request).await })
            .map_err(|status| self.status_to_error(status))?;
        Ok(response.into_inner().ready)
    }
}

/// An unspecified version travels as the proto3 default (empty string).
pub fn request_to_pb(request: InferenceRequest) -> pb::ModelInferRequest {
    pb::ModelInferRequest {
        model_name: request.model_name,
        model_version: request.model_version.unwrap_or_default(),
        id: request.id,
        inputs: request.inputs.into_iter().map(tensor_to_pb).collect(),
        ..Default::default()
    }
}

pub fn response_from_pb(response: pb::ModelInferResponse) -> Result<InferenceResponse> {
    let raw = response.raw_output_contents;
    let mut outputs = Vec::with_capacity(response.outputs.len());
    for (idx, output) in response.outputs.into_iter().enumerate() {
        let dtype = DType::parse(&output.datatype)?;
        let shape = Shape::from_wire(&output.shape)?;
        let data = if raw.is_empty() {
            contents_to_data(&output.name, dtype, output.contents.unwrap_or_default())?
        } else {
            let buf = raw.get(idx).ok_or_else(|| {
                TransportError::Malformed(format!(
                    "output `{}` has no raw contents ({} buffers for {} outputs)",
                    output.name,
                    raw.len(),
                    idx + 1
                ))
            })?;
            raw_to_data(&output.name, dtype, buf)?
        };
        outputs.push(InferTensor::new(output.name, shape, data)?);
    }

    Ok(InferenceResponse {
        model_name: response.model_name,
        model_version: non_empty(response.model_version),
        id: non_empty(response.id),
        outputs,
    })
}

fn tensor_to_pb(tensor: InferTensor) -> pb::model_infer_request::InferInputTensor {
    let datatype = tensor.dtype().as_str().to_string();
    let (name, shape, data) = tensor.into_parts();

    let mut contents = pb::InferTensorContents::default();
    match data {
        TensorData::F32(v) => contents.fp32_contents = v,
        TensorData::F64(v) => contents.fp64_contents = v,
        TensorData::I32(v) => contents.int_contents = v,
        TensorData::I64(v) => contents.int64_contents = v,
    }

    pb::model_infer_request::InferInputTensor {
        name,
        datatype,
        shape: shape.to_wire(),
        contents: Some(contents),
        ..Default::default()
    }
}

/// Reads the content field the datatype names, refusing payloads that sit in
/// a different field.
fn contents_to_data(name: &str, dtype: DType, contents: pb::InferTensorContents) -> Result<TensorData> {
    let populated = [
        (DType::F32, contents.fp32_contents.len()),
        (DType::F64, contents.fp64_contents.len()),
        (DType::I32, contents.int_contents.len()),
        (DType::I64, contents.int64_contents.len()),
    ];
    if let Some((other, _)) = populated.iter().find(|(d, n)| *d != dtype && *n > 0) {
        return Err(Error::DatatypeMismatch {
            tensor: name.to_string(),
            detail: format!("declared {dtype} but carries {other} contents"),
        });
    }

    Ok(match dtype {
        DType::F32 => TensorData::F32(contents.fp32_contents),
        DType::F64 => TensorData::F64(contents.fp64_contents),
        DType::I32 => TensorData::I32(contents.int_contents),
        DType::I64 => TensorData::I64(contents.int64_contents),
    })
}

/// Raw contents are little-endian and tightly packed.
fn raw_to_data(name: &str, dtype: DType, raw: &[u8]) -> Result<TensorData> {
    let width = dtype.byte_size();
    if raw.len() % width != 0 {
        return Err(Error::DatatypeMismatch {
            tensor: name.to_string(),
            detail: format!("{} raw bytes is not a whole number of {dtype} values", raw.len()),
        });
    }

    let n = raw.len() / width;
    let mut buf = raw;
    Ok(match dtype {
        DType::F32 => TensorData::F32((0..n).map(|_| buf.get_f32_le()).collect()),
        DType::F64 => TensorData::F64((0..n).map(|_| buf.get_f64_le()).collect()),
        DType::I32 => TensorData::I32((0..n).map(|_| buf.get_i32_le()).collect()),
        DType::I64 => TensorData::I64((0..n).map(|_| buf.get_i64_le()).collect()),
    })
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}
