use xaibridge_core::Table;

use crate::MetricError;

/// A scalar computed over a whole table.
pub trait Metric {
    fn name(&self) -> &'static str;

    fn calculate(&self, table: &Table) -> Result<f64, MetricError>;
}
