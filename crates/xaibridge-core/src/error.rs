//! Error taxonomy shared by the codec, the transports and the client facade.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// Invalid or missing construction parameters. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A declared shape disagrees with the number of values carried.
    #[error("shape mismatch for tensor `{tensor}` with shape {shape:?}: expected {expected}, got {actual}")]
    ShapeMismatch {
        tensor: String,
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// A datatype tag disagrees with the payload, or a conversion would lose precision.
    #[error("datatype mismatch for tensor `{tensor}`: {detail}")]
    DatatypeMismatch { tensor: String, detail: String },

    /// Input the codec cannot normalize into a numeric matrix.
    #[error("unsupported input: {0}")]
    UnsupportedType(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Network and protocol level failures.
///
/// Transports never retry on their own; callers use [`TransportError::is_retryable`]
/// to decide whether issuing the same request again makes sense.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TransportError {
    #[error("cannot reach `{target}`: {message}")]
    Connection { target: String, message: String },

    /// The server answered with a protocol-level rejection (gRPC status).
    #[error("server rejected request with status {code}: {message}")]
    Status { code: String, message: String },

    #[error("server answered HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request to `{target}` timed out")]
    Timeout { target: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("failed to start transport runtime: {0}")]
    Runtime(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Connection { .. } | TransportError::Timeout { .. } => true,
            TransportError::Http { status, .. } => *status == 503 || *status == 429,
            TransportError::Status { code, .. } => code == "Unavailable",
            TransportError::Malformed(_) | TransportError::Runtime(_) => false,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Runtime(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures_are_retryable_but_rejections_are_not() {
        let unreachable = TransportError::Connection {
            target: "127.0.0.1:1".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(unreachable.is_retryable());

        let unknown_model = TransportError::Status {
            code: "NotFound".to_string(),
            message: "model `nope` not found".to_string(),
        };
        assert!(!unknown_model.is_retryable());
        assert!(!TransportError::Malformed("eof".to_string()).is_retryable());
    }

    #[test]
    fn shape_mismatch_message_names_the_tensor() {
        let err = Error::ShapeMismatch {
            tensor: "predict".to_string(),
            shape: vec![2, 3],
            expected: 6,
            actual: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("predict"));
        assert!(msg.contains("expected 6, got 5"));
    }
}
