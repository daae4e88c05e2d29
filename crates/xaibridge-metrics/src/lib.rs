//! Group fairness metrics.
//!
//! A [`Metric`] reads a host [`Table`](xaibridge_core::Table) as a
//! [`BinaryLabelDataset`] and hands the statistic to a [`FairnessBackend`].

pub mod backend;
pub mod config;
pub mod dataset;
pub mod error;
pub mod group;
pub mod metric;

pub use backend::*;
pub use config::*;
pub use dataset::*;
pub use error::*;
pub use group::*;
pub use metric::*;
