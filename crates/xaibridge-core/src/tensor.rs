use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{Error, Result, TransportError};

/// Wire datatype tags understood by both serving protocols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    #[serde(rename = "FP32")]
    F32,
    #[serde(rename = "FP64")]
    F64,
    #[serde(rename = "INT32")]
    I32,
    #[serde(rename = "INT64")]
    I64,
}

impl DType {
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "FP32",
            DType::F64 => "FP64",
            DType::I32 => "INT32",
            DType::I64 => "INT64",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "FP32" => Ok(DType::F32),
            "FP64" => Ok(DType::F64),
            "INT32" => Ok(DType::I32),
            "INT64" => Ok(DType::I64),
            other => Err(Error::UnsupportedType(format!("datatype `{other}`"))),
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::I64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(pub SmallVec<[usize; 4]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }

    /// Shapes travel as `i64` on both protocols; negative (dynamic) dims are
    /// not valid in a concrete request or response.
    ///
    /// The product of the non-zero dims must fit in `usize`, so `numel` and
    /// `matrix_dims` cannot overflow on a shape read from the wire.
    pub fn from_wire(dims: &[i64]) -> Result<Self> {
        let shape = dims
            .iter()
            .map(|d| {
                usize::try_from(*d).map_err(|_| {
                    Error::from(TransportError::Malformed(format!(
                        "negative dimension {d} in shape {dims:?}"
                    )))
                })
            })
            .collect::<Result<SmallVec<_>>>()
            .map(Self)?;

        let fits = shape
            .0
            .iter()
            .filter(|d| **d != 0)
            .try_fold(1usize, |acc, d| acc.checked_mul(*d))
            .is_some();
        if !fits {
            return Err(TransportError::Malformed(format!(
                "shape {dims:?} has more elements than fit in memory"
            ))
            .into());
        }
        Ok(shape)
    }

    pub fn to_wire(&self) -> Vec<i64> {
        self.0.iter().map(|d| *d as i64).collect()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>()
    }

    /// Rows and columns this shape occupies once laid out as a prediction matrix.
    ///
    /// `[n]` is a column of `n` rows, `[r, c]` is itself, and higher ranks keep
    /// the leading dimension as rows and flatten the rest into columns.
    pub fn matrix_dims(&self) -> (usize, usize) {
        match self.0.as_slice() {
            [] => (1, 1),
            [n] => (*n, 1),
            [rows, rest @ ..] => (*rows, rest.iter().product()),
        }
    }
}

/// Flat, row-major tensor payload. The variant is the datatype.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
}

impl TensorData {
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::F32(_) => DType::F32,
            TensorData::F64(_) => DType::F64,
            TensorData::I32(_) => DType::I32,
            TensorData::I64(_) => DType::I64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(v) => v.len(),
            TensorData::F64(v) => v.len(),
            TensorData::I32(v) => v.len(),
            TensorData::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            TensorData::F32(v) => v.iter().map(|x| f64::from(*x)).collect(),
            TensorData::F64(v) => v.clone(),
            TensorData::I32(v) => v.iter().map(|x| f64::from(*x)).collect(),
            TensorData::I64(v) => v.iter().map(|x| *x as f64).collect(),
        }
    }
}

/// A named tensor whose element count always matches its shape.
#[derive(Clone, Debug, PartialEq)]
pub struct InferTensor {
    name: String,
    shape: Shape,
    data: TensorData,
}

impl InferTensor {
    pub fn new(name: impl Into<String>, shape: Shape, data: TensorData) -> Result<Self> {
        let name = name.into();
        if shape.numel() != data.len() {
            return Err(Error::ShapeMismatch {
                tensor: name,
                shape: shape.dims().to_vec(),
                expected: shape.numel(),
                actual: data.len(),
            });
        }
        Ok(Self { name, shape, data })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn into_parts(self) -> (String, Shape, TensorData) {
        (self.name, self.shape, self.data)
    }
}
