use std::cell::RefCell;

use anyhow::Result;
use ndarray::array;
use xaibridge_core::Table;
use xaibridge_metrics::{
    BinaryLabelDataset, DisparateImpactRatio, FairnessBackend, FairnessConfig, GroupCondition,
    Metric, MetricError, StatisticalParityDifference,
};

fn config() -> FairnessConfig {
    FairnessConfig {
        protected_attribute_names: vec!["Sex".to_string()],
        label_names: vec!["Approved".to_string()],
        favorable_label: 1.0,
        unfavorable_label: 0.0,
        privileged_protected_attributes: vec![vec![1.0]],
        unprivileged_protected_attributes: vec![vec![0.0]],
        privileged_groups: vec![1.0],
        unprivileged_groups: vec![0.0],
    }
}

/// Eight applicants: 3 of 4 privileged and 1 of 4 unprivileged approved.
fn applicants() -> Result<Table> {
    let values = array![
        [34.0, 1.0, 0.8, 1.0],
        [29.0, 1.0, 0.4, 1.0],
        [51.0, 1.0, 0.1, 0.0],
        [45.0, 1.0, 0.9, 1.0],
        [38.0, 0.0, 0.7, 1.0],
        [27.0, 0.0, 0.2, 0.0],
        [62.0, 0.0, 0.5, 0.0],
        [41.0, 0.0, 0.3, 0.0],
    ];
    Ok(Table::from_array(&values, &["Age", "Sex", "Salary", "Approved"])?)
}

/// Records what it was asked and answers with fixed values.
#[derive(Default)]
struct RecordingBackend {
    calls: RefCell<Vec<(String, usize, Vec<GroupCondition>, Vec<GroupCondition>)>>,
}

impl RecordingBackend {
    fn record(
        &self,
        what: &str,
        dataset: &BinaryLabelDataset,
        unprivileged: &[GroupCondition],
        privileged: &[GroupCondition],
    ) {
        self.calls.borrow_mut().push((
            what.to_string(),
            dataset.n_rows(),
            unprivileged.to_vec(),
            privileged.to_vec(),
        ));
    }
}

impl FairnessBackend for RecordingBackend {
    fn statistical_parity_difference(
        &self,
        dataset: &BinaryLabelDataset,
        unprivileged: &[GroupCondition],
        privileged: &[GroupCondition],
    ) -> Result<f64, MetricError> {
        self.record("spd", dataset, unprivileged, privileged);
        Ok(-0.25)
    }

    fn disparate_impact(
        &self,
        dataset: &BinaryLabelDataset,
        unprivileged: &[GroupCondition],
        privileged: &[GroupCondition],
    ) -> Result<f64, MetricError> {
        self.record("di", dataset, unprivileged, privileged);
        Ok(0.75)
    }
}

#[test]
fn statistical_parity_difference_from_base_rates() -> Result<()> {
    let spd = StatisticalParityDifference::new(config())?;
    assert_eq!(spd.name(), "statistical_parity_difference");
    assert!((spd.calculate(&applicants()?)? - (0.25 - 0.75)).abs() < 1e-12);
    Ok(())
}

#[test]
fn disparate_impact_from_base_rates() -> Result<()> {
    let di = DisparateImpactRatio::new(config())?;
    assert!((di.calculate(&applicants()?)? - 0.25 / 0.75).abs() < 1e-12);
    Ok(())
}

#[test]
fn metrics_delegate_to_the_backend_with_zipped_groups() -> Result<()> {
    let spd = StatisticalParityDifference::with_backend(config(), RecordingBackend::default())?;
    let di = DisparateImpactRatio::with_backend(config(), RecordingBackend::default())?;
    let table = applicants()?;

    assert_eq!(spd.calculate(&table)?, -0.25);
    assert_eq!(di.calculate(&table)?, 0.75);

    let sex = |value| GroupCondition {
        attribute: "Sex".to_string(),
        value,
    };
    let (_, rows, unprivileged, privileged) = spd.backend_call(0);
    assert_eq!(rows, 8);
    assert_eq!(unprivileged, vec![sex(0.0)]);
    assert_eq!(privileged, vec![sex(1.0)]);
    assert_eq!(di.backend_call(0).0, "di");
    Ok(())
}

#[test]
fn both_metrics_are_usable_as_trait_objects() -> Result<()> {
    let metrics: Vec<Box<dyn Metric>> = vec![
        Box::new(StatisticalParityDifference::new(config())?),
        Box::new(DisparateImpactRatio::new(config())?),
    ];
    let table = applicants()?;
    let names: Vec<_> = metrics.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["statistical_parity_difference", "disparate_impact_ratio"]);
    for metric in &metrics {
        assert!(metric.calculate(&table)?.is_finite());
    }
    Ok(())
}

#[test]
fn invalid_configuration_fails_at_construction() {
    let mut config = config();
    config.unprivileged_groups.clear();
    assert!(matches!(
        StatisticalParityDifference::new(config),
        Err(MetricError::Configuration(_))
    ));
}

#[test]
fn table_problems_surface_from_calculate() -> Result<()> {
    let spd = StatisticalParityDifference::new(config())?;

    let no_label = applicants()?.without("Approved");
    assert_eq!(
        spd.calculate(&no_label).unwrap_err(),
        MetricError::MissingColumn("Approved".to_string())
    );

    let bad_label = Table::from_columns(vec![
        ("Sex", vec![1.0, 0.0]),
        ("Approved", vec![1.0, 0.5]),
    ])?;
    assert!(matches!(
        spd.calculate(&bad_label),
        Err(MetricError::InvalidLabel { row: 1, .. })
    ));
    Ok(())
}

#[test]
fn empty_groups_and_zero_privileged_rate_are_backend_errors() -> Result<()> {
    let only_privileged = Table::from_columns(vec![
        ("Sex", vec![1.0, 1.0]),
        ("Approved", vec![1.0, 0.0]),
    ])?;
    assert!(matches!(
        StatisticalParityDifference::new(config())?.calculate(&only_privileged),
        Err(MetricError::Backend(_))
    ));

    let nobody_privileged_approved = Table::from_columns(vec![
        ("Sex", vec![1.0, 0.0]),
        ("Approved", vec![0.0, 1.0]),
    ])?;
    assert!(matches!(
        DisparateImpactRatio::new(config())?.calculate(&nobody_privileged_approved),
        Err(MetricError::Backend(_))
    ));
    Ok(())
}

trait BackendCalls {
    fn backend_call(&self, idx: usize) -> (String, usize, Vec<GroupCondition>, Vec<GroupCondition>);
}

impl BackendCalls for StatisticalParityDifference<RecordingBackend> {
    fn backend_call(&self, idx: usize) -> (String, usize, Vec<GroupCondition>, Vec<GroupCondition>) {
        self.backend().calls.borrow()[idx].clone()
    }
}

impl BackendCalls for DisparateImpactRatio<RecordingBackend> {
    fn backend_call(&self, idx: usize) -> (String, usize, Vec<GroupCondition>, Vec<GroupCondition>) {
        self.backend().calls.borrow()[idx].clone()
    }
}
