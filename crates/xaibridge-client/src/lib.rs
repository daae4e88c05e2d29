//! Blocking KServe V2 client: one facade over a gRPC or a REST transport.

pub mod client;
pub mod config;
pub mod grpc;
pub mod rest;

pub use client::ModelClient;
pub use config::{ClientConfig, Protocol};
pub use grpc::{request_to_pb, response_from_pb, GrpcTransport};
pub use rest::{RestInferRequest, RestInferResponse, RestTensor, RestTransport};
