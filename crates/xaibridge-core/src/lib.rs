//! Shared model for talking to remotely served models: tensors, tables,
//! the logical codec, and the transport/predictor seams.

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod request;
pub mod table;
pub mod tensor;
pub mod transport;

pub use codec::*;
pub use endpoint::*;
pub use error::*;
pub use request::*;
pub use table::*;
pub use tensor::*;
pub use transport::*;
