//! Logical tensor codec shared by both protocols.
//!
//! Encoding always flattens row-major and declares `[rows, cols]`; nothing in
//! this crate transposes. Protocol-specific wire layouts live with the
//! transports.

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use uuid::Uuid;

use crate::{
    DType, Error, InferTensor, InferenceRequest, InferenceResponse, ModelEndpoint, Result, Shape,
    Table, TensorData, TransportError,
};

/// What a caller may hand to `predict`.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelInput {
    F32(Array2<f32>),
    F64(Array2<f64>),
    Table(Table),
}

impl ModelInput {
    pub fn dims(&self) -> (usize, usize) {
        match self {
            ModelInput::F32(a) => a.dim(),
            ModelInput::F64(a) => a.dim(),
            ModelInput::Table(t) => (t.n_rows(), t.n_cols()),
        }
    }
}

impl From<Array2<f32>> for ModelInput {
    fn from(a: Array2<f32>) -> Self {
        ModelInput::F32(a)
    }
}

impl From<Array2<f64>> for ModelInput {
    fn from(a: Array2<f64>) -> Self {
        ModelInput::F64(a)
    }
}

impl From<Table> for ModelInput {
    fn from(t: Table) -> Self {
        ModelInput::Table(t)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorCodec {
    input_name: String,
    datatype: Option<DType>,
}

impl Default for TensorCodec {
    fn default() -> Self {
        Self {
            input_name: "input".to_string(),
            datatype: None,
        }
    }
}

impl TensorCodec {
    /// `datatype: None` sends the input at its own precision (tables are FP64).
    pub fn new(input_name: impl Into<String>, datatype: Option<DType>) -> Result<Self> {
        let input_name = input_name.into();
        if input_name.trim().is_empty() {
            return Err(Error::Configuration("input tensor name cannot be empty".to_string()));
        }
        if let Some(dtype) = datatype {
            if !dtype.is_float() {
                return Err(Error::Configuration(format!(
                    "input datatype must be FP32 or FP64, got {dtype}"
                )));
            }
        }
        Ok(Self {
            input_name,
            datatype,
        })
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn datatype(&self) -> Option<DType> {
        self.datatype
    }

    pub fn encode(&self, input: &ModelInput) -> Result<InferTensor> {
        let (rows, cols) = input.dims();
        let data = match input {
            ModelInput::F32(a) => TensorData::F32(row_major(a.view())),
            ModelInput::F64(a) => TensorData::F64(row_major(a.view())),
            ModelInput::Table(t) => TensorData::F64(row_major(t.to_array()?.view())),
        };
        let data = self.cast(data)?;
        InferTensor::new(self.input_name.clone(), Shape::from_slice(&[rows, cols]), data)
    }

    /// Encodes `input` into a request for `endpoint` with a fresh request id.
    pub fn request(&self, endpoint: &ModelEndpoint, input: &ModelInput) -> Result<InferenceRequest> {
        Ok(InferenceRequest {
            model_name: endpoint.model_name().to_string(),
            model_version: endpoint.model_version().map(str::to_string),
            id: Uuid::new_v4().to_string(),
            inputs: vec![self.encode(input)?],
        })
    }

    /// Lays every output out as a matrix by its declared shape and joins them
    /// column-wise, in response order. All outputs must agree on row count.
    pub fn decode(&self, response: &InferenceResponse) -> Result<Array2<f64>> {
        let Some(first) = response.outputs.first() else {
            return Err(TransportError::Malformed("response carries no outputs".to_string()).into());
        };
        let rows = first.shape().matrix_dims().0;

        let mut blocks = Vec::with_capacity(response.outputs.len());
        for output in &response.outputs {
            let (r, c) = output.shape().matrix_dims();
            if r != rows {
                return Err(Error::ShapeMismatch {
                    tensor: output.name().to_string(),
                    shape: output.shape().dims().to_vec(),
                    expected: rows,
                    actual: r,
                });
            }
            let block = Array2::from_shape_vec((r, c), output.data().to_f64()).map_err(|_| {
                Error::ShapeMismatch {
                    tensor: output.name().to_string(),
                    shape: output.shape().dims().to_vec(),
                    expected: r * c,
                    actual: output.data().len(),
                }
            })?;
            blocks.push(block);
        }

        if blocks.len() == 1 {
            return Ok(blocks.remove(0));
        }
        let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
        concatenate(Axis(1), &views).map_err(|e| {
            Error::UnsupportedType(format!("outputs cannot be combined: {e}"))
        })
    }

    fn cast(&self, data: TensorData) -> Result<TensorData> {
        match (self.datatype, data) {
            (None, data) => Ok(data),
            (Some(DType::F64), TensorData::F32(v)) => {
                Ok(TensorData::F64(v.into_iter().map(f64::from).collect()))
            }
            (Some(DType::F32), TensorData::F64(v)) => {
                // Narrowing is only allowed when nothing is lost.
                if let Some((idx, value)) = v
                    .iter()
                    .enumerate()
                    .find(|(_, x)| !x.is_nan() && f64::from(**x as f32) != **x)
                {
                    return Err(Error::DatatypeMismatch {
                        tensor: self.input_name.clone(),
                        detail: format!(
                            "value {value} at position {idx} cannot be sent as FP32 without losing precision"
                        ),
                    });
                }
                Ok(TensorData::F32(v.into_iter().map(|x| x as f32).collect()))
            }
            (Some(target), data) if data.dtype() == target => Ok(data),
            (Some(target), data) => Err(Error::DatatypeMismatch {
                tensor: self.input_name.clone(),
                detail: format!("cannot send {} values as {target}", data.dtype()),
            }),
        }
    }
}

fn row_major<T: Copy>(a: ArrayView2<'_, T>) -> Vec<T> {
    // `iter` walks in logical row-major order whatever the memory layout.
    a.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn echo(codec: &TensorCodec, input: &ModelInput) -> Array2<f64> {
        let tensor = codec.encode(input).unwrap();
        codec
            .decode(&InferenceResponse::new("echo", vec![tensor]))
            .unwrap()
    }

    #[test]
    fn table_orientation_survives_encode_and_decode() {
        let table = Table::from_columns(vec![
            ("x", vec![1.0, 2.0, 3.0]),
            ("y", vec![10.0, 20.0, 30.0]),
        ])
        .unwrap();
        let codec = TensorCodec::default();
        let tensor = codec.encode(&ModelInput::Table(table.clone())).unwrap();

        assert_eq!(tensor.shape().dims(), &[3, 2]);
        assert_eq!(
            tensor.data(),
            &TensorData::F64(vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0])
        );
        let decoded = echo(&codec, &ModelInput::Table(table.clone()));
        assert_eq!(decoded.dim(), (3, 2));
        assert_eq!(decoded, table.to_array().unwrap());
    }

    #[test]
    fn transposed_views_are_flattened_in_logical_order() {
        let stored = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let transposed = stored.t().to_owned();
        let tensor = TensorCodec::default()
            .encode(&ModelInput::F64(transposed.clone()))
            .unwrap();
        assert_eq!(tensor.shape().dims(), &[3, 2]);
        assert_eq!(
            tensor.data(),
            &TensorData::F64(vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0])
        );
    }

    #[test]
    fn zero_rows_encode_and_decode_empty() {
        let codec = TensorCodec::default();
        let empty = ModelInput::F64(Array2::zeros((0, 4)));
        let tensor = codec.encode(&empty).unwrap();
        assert_eq!(tensor.shape().dims(), &[0, 4]);
        assert_eq!(echo(&codec, &empty).dim(), (0, 4));
    }

    #[test]
    fn lossless_narrowing_is_allowed() {
        let codec = TensorCodec::new("input", Some(DType::F32)).unwrap();
        let tensor = codec
            .encode(&ModelInput::F64(array![[0.5, 1.25], [-2.0, 8.0]]))
            .unwrap();
        assert_eq!(tensor.dtype(), DType::F32);
    }

    #[test]
    fn lossy_narrowing_fails_fast() {
        let codec = TensorCodec::new("input", Some(DType::F32)).unwrap();
        let err = codec
            .encode(&ModelInput::F64(array![[0.1, 1.0]]))
            .unwrap_err();
        assert!(matches!(err, Error::DatatypeMismatch { .. }));
    }

    #[test]
    fn widening_is_always_allowed() {
        let codec = TensorCodec::new("input", Some(DType::F64)).unwrap();
        let tensor = codec
            .encode(&ModelInput::F32(array![[0.1f32, 2.0]]))
            .unwrap();
        assert_eq!(tensor.dtype(), DType::F64);
    }

    #[test]
    fn integer_input_datatype_is_a_configuration_error() {
        assert!(matches!(
            TensorCodec::new("input", Some(DType::I64)),
            Err(Error::Configuration(_))
        ));
        assert!(TensorCodec::new("", None).is_err());
    }

    #[test]
    fn text_tables_are_unsupported() {
        let table = Table::from_columns(vec![("name", vec!["a", "b"])]).unwrap();
        let err = TensorCodec::default()
            .encode(&ModelInput::Table(table))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
    }

    #[test]
    fn outputs_are_joined_column_wise() {
        let scores = InferTensor::new(
            "scores",
            Shape::from_slice(&[2, 2]),
            TensorData::F32(vec![0.25, 0.75, 0.5, 0.5]),
        )
        .unwrap();
        let label = InferTensor::new("label", Shape::from_slice(&[2]), TensorData::I64(vec![1, 0]))
            .unwrap();
        let decoded = TensorCodec::default()
            .decode(&InferenceResponse::new("m", vec![scores, label]))
            .unwrap();
        assert_eq!(decoded, array![[0.25, 0.75, 1.0], [0.5, 0.5, 0.0]]);
    }

    #[test]
    fn outputs_with_different_row_counts_are_rejected() {
        let a = InferTensor::new("a", Shape::from_slice(&[2]), TensorData::F64(vec![1.0, 2.0]))
            .unwrap();
        let b = InferTensor::new("b", Shape::from_slice(&[3]), TensorData::F64(vec![1.0; 3]))
            .unwrap();
        let err = TensorCodec::default()
            .decode(&InferenceResponse::new("m", vec![a, b]))
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 2, actual: 3, .. }));
    }

    #[test]
    fn empty_response_is_malformed() {
        let err = TensorCodec::default()
            .decode(&InferenceResponse::new("m", Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Malformed(_))));
    }

    #[test]
    fn request_carries_endpoint_identity() {
        let endpoint = ModelEndpoint::new("localhost:8081", "tsforda", Some("v0.1.0".into())).unwrap();
        let request = TensorCodec::default()
            .request(&endpoint, &ModelInput::F64(array![[1.0]]))
            .unwrap();
        assert_eq!(request.model_name, "tsforda");
        assert_eq!(request.model_version.as_deref(), Some("v0.1.0"));
        assert!(!request.id.is_empty());
        assert_eq!(request.inputs.len(), 1);
    }
}
