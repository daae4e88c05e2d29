//! Generated types for the KServe V2 `GRPCInferenceService`.
//!
//! Only the health and inference RPCs are declared; message layouts and field
//! numbers follow the upstream protocol so the stubs interoperate with any V2
//! server.

pub mod inference {
    tonic::include_proto!("inference");
}
