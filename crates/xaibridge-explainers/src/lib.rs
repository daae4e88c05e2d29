//! Time-series explainer adapters.
//!
//! A [`TimeSeriesExplainer`] frames a host table as a [`TsFrame`], hands it
//! to a [`PerturbationEngine`], and answers the engine's forecast callbacks
//! with a [`Predictor`](xaibridge_core::Predictor), by default a remote
//! [`ModelClient`](xaibridge_client::ModelClient).

pub mod engine;
pub mod error;
pub mod explainer;
pub mod frame;
pub mod ice;
pub mod lime;

pub use engine::*;
pub use error::*;
pub use explainer::*;
pub use frame::*;
pub use ice::*;
pub use lime::*;
