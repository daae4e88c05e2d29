use crate::{BinaryLabelDataset, GroupCondition, MetricError};

/// The statistics library group metrics delegate to.
pub trait FairnessBackend {
    fn statistical_parity_difference(
        &self,
        dataset: &BinaryLabelDataset,
        unprivileged: &[GroupCondition],
        privileged: &[GroupCondition],
    ) -> Result<f64, MetricError>;

    fn disparate_impact(
        &self,
        dataset: &BinaryLabelDataset,
        unprivileged: &[GroupCondition],
        privileged: &[GroupCondition],
    ) -> Result<f64, MetricError>;
}

/// Computes both statistics from favorable-outcome base rates.
///
/// An empty group, or a privileged group with no favorable outcome for the
/// ratio, is an error rather than NaN or infinity.
#[derive(Clone, Copy, Debug, Default)]
pub struct BaseRateBackend;

impl BaseRateBackend {
    fn rates(
        dataset: &BinaryLabelDataset,
        unprivileged: &[GroupCondition],
        privileged: &[GroupCondition],
    ) -> Result<(f64, f64), MetricError> {
        let unprivileged = dataset
            .favorable_rate(unprivileged)?
            .ok_or_else(|| MetricError::Backend("unprivileged group has no rows".to_string()))?;
        let privileged = dataset
            .favorable_rate(privileged)?
            .ok_or_else(|| MetricError::Backend("privileged group has no rows".to_string()))?;
        Ok((unprivileged, privileged))
    }
}

impl FairnessBackend for BaseRateBackend {
    fn statistical_parity_difference(
        &self,
        dataset: &BinaryLabelDataset,
        unprivileged: &[GroupCondition],
        privileged: &[GroupCondition],
    ) -> Result<f64, MetricError> {
        let (unprivileged, privileged) = Self::rates(dataset, unprivileged, privileged)?;
        Ok(unprivileged - privileged)
    }

    fn disparate_impact(
        &self,
        dataset: &BinaryLabelDataset,
        unprivileged: &[GroupCondition],
        privileged: &[GroupCondition],
    ) -> Result<f64, MetricError> {
        let (unprivileged, privileged) = Self::rates(dataset, unprivileged, privileged)?;
        if privileged == 0.0 {
            return Err(MetricError::Backend(
                "privileged group has no favorable outcomes".to_string(),
            ));
        }
        Ok(unprivileged / privileged)
    }
}
