//! Group fairness metrics comparing favorable outcome rates between an
//! unprivileged and a privileged group.

use tracing::debug;
use xaibridge_core::Table;

use crate::{
    BaseRateBackend, BinaryLabelDataset, FairnessBackend, FairnessConfig, GroupCondition, Metric,
    MetricError,
};

/// Conditions resolved once from a validated configuration.
#[derive(Clone, Debug)]
struct Groups {
    config: FairnessConfig,
    unprivileged: Vec<GroupCondition>,
    privileged: Vec<GroupCondition>,
}

impl Groups {
    fn new(config: FairnessConfig) -> Result<Self, MetricError> {
        config.validate()?;
        Ok(Self {
            unprivileged: config.unprivileged_conditions(),
            privileged: config.privileged_conditions(),
            config,
        })
    }
}

/// `P(favorable | unprivileged) - P(favorable | privileged)`; 0 is parity.
#[derive(Clone, Debug)]
pub struct StatisticalParityDifference<B: FairnessBackend = BaseRateBackend> {
    groups: Groups,
    backend: B,
}

impl StatisticalParityDifference<BaseRateBackend> {
    pub fn new(config: FairnessConfig) -> Result<Self, MetricError> {
        Self::with_backend(config, BaseRateBackend)
    }
}

impl<B: FairnessBackend> StatisticalParityDifference<B> {
    pub fn with_backend(config: FairnessConfig, backend: B) -> Result<Self, MetricError> {
        Ok(Self {
            groups: Groups::new(config)?,
            backend,
        })
    }

    pub fn config(&self) -> &FairnessConfig {
        &self.groups.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: FairnessBackend> Metric for StatisticalParityDifference<B> {
    fn name(&self) -> &'static str {
        "statistical_parity_difference"
    }

    fn calculate(&self, table: &Table) -> Result<f64, MetricError> {
        let dataset = BinaryLabelDataset::from_table(table, &self.groups.config)?;
        let value = self.backend.statistical_parity_difference(
            &dataset,
            &self.groups.unprivileged,
            &self.groups.privileged,
        )?;
        debug!(metric = self.name(), rows = dataset.n_rows(), value, "calculated");
        Ok(value)
    }
}

/// `P(favorable | unprivileged) / P(favorable | privileged)`; 1 is parity.
#[derive(Clone, Debug)]
pub struct DisparateImpactRatio<B: FairnessBackend = BaseRateBackend> {
    groups: Groups,
    backend: B,
}

impl DisparateImpactRatio<BaseRateBackend> {
    pub fn new(config: FairnessConfig) -> Result<Self, MetricError> {
        Self::with_backend(config, BaseRateBackend)
    }
}

impl<B: FairnessBackend> DisparateImpactRatio<B> {
    pub fn with_backend(config: FairnessConfig, backend: B) -> Result<Self, MetricError> {
        Ok(Self {
            groups: Groups::new(config)?,
            backend,
        })
    }

    pub fn config(&self) -> &FairnessConfig {
        &self.groups.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: FairnessBackend> Metric for DisparateImpactRatio<B> {
    fn name(&self) -> &'static str {
        "disparate_impact_ratio"
    }

    fn calculate(&self, table: &Table) -> Result<f64, MetricError> {
        let dataset = BinaryLabelDataset::from_table(table, &self.groups.config)?;
        let value = self.backend.disparate_impact(
            &dataset,
            &self.groups.unprivileged,
            &self.groups.privileged,
        )?;
        debug!(metric = self.name(), rows = dataset.n_rows(), value, "calculated");
        Ok(value)
    }
}
