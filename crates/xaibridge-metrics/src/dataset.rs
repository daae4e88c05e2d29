use ndarray::{Array1, Array2, ArrayView1};
use xaibridge_core::Table;

use crate::{FairnessConfig, GroupCondition, MetricError};

/// A table read as features, one binary label, and protected attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryLabelDataset {
    feature_names: Vec<String>,
    features: Array2<f64>,
    label_name: String,
    labels: Array1<f64>,
    protected_attribute_names: Vec<String>,
    protected_attributes: Array2<f64>,
    privileged_protected_attributes: Vec<Vec<f64>>,
    unprivileged_protected_attributes: Vec<Vec<f64>>,
    favorable_label: f64,
    unfavorable_label: f64,
}

impl BinaryLabelDataset {
    /// Every column must be numeric. Features are every column except the
    /// label, protected attributes included.
    pub fn from_table(table: &Table, config: &FairnessConfig) -> Result<Self, MetricError> {
        config.validate()?;
        let label_name = config.label_name().to_string();
        for name in std::iter::once(&label_name).chain(&config.protected_attribute_names) {
            if table.column_index(name).is_none() {
                return Err(MetricError::MissingColumn(name.clone()));
            }
        }

        let labels = table.numeric_column(&label_name)?;
        for (row, &value) in labels.iter().enumerate() {
            if value != config.favorable_label && value != config.unfavorable_label {
                return Err(MetricError::InvalidLabel {
                    row,
                    value,
                    favorable: config.favorable_label,
                    unfavorable: config.unfavorable_label,
                });
            }
        }

        let feature_table = table.without(&label_name);
        let features = feature_table.to_array()?;
        let protected_attributes = table.select(&config.protected_attribute_names)?.to_array()?;

        let privileged_protected_attributes = if config.privileged_protected_attributes.is_empty() {
            config.privileged_groups.iter().map(|v| vec![*v]).collect()
        } else {
            config.privileged_protected_attributes.clone()
        };
        let unprivileged_protected_attributes =
            if config.unprivileged_protected_attributes.is_empty() {
                protected_attributes
                    .columns()
                    .into_iter()
                    .zip(&privileged_protected_attributes)
                    .map(|(column, privileged)| {
                        let mut rest: Vec<f64> = Vec::new();
                        for v in column.iter() {
                            if !privileged.contains(v) && !rest.contains(v) {
                                rest.push(*v);
                            }
                        }
                        rest.sort_by(f64::total_cmp);
                        rest
                    })
                    .collect()
            } else {
                config.unprivileged_protected_attributes.clone()
            };

        Ok(Self {
            feature_names: feature_table.column_names().to_vec(),
            features,
            label_name,
            labels: Array1::from(labels),
            protected_attribute_names: config.protected_attribute_names.clone(),
            protected_attributes,
            privileged_protected_attributes,
            unprivileged_protected_attributes,
            favorable_label: config.favorable_label,
            unfavorable_label: config.unfavorable_label,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn label_name(&self) -> &str {
        &self.label_name
    }

    pub fn labels(&self) -> &Array1<f64> {
        &self.labels
    }

    pub fn protected_attribute_names(&self) -> &[String] {
        &self.protected_attribute_names
    }

    pub fn protected_attributes(&self) -> &Array2<f64> {
        &self.protected_attributes
    }

    /// Per protected attribute, the values that count as privileged. Falls
    /// back to the privileged group value when the config lists none.
    pub fn privileged_protected_attributes(&self) -> &[Vec<f64>] {
        &self.privileged_protected_attributes
    }

    /// Per protected attribute, the values that count as unprivileged. Falls
    /// back to every other value seen in the column, ascending.
    pub fn unprivileged_protected_attributes(&self) -> &[Vec<f64>] {
        &self.unprivileged_protected_attributes
    }

    pub fn favorable_label(&self) -> f64 {
        self.favorable_label
    }

    pub fn unfavorable_label(&self) -> f64 {
        self.unfavorable_label
    }

    pub fn protected_column(&self, attribute: &str) -> Option<ArrayView1<'_, f64>> {
        self.protected_attribute_names
            .iter()
            .position(|n| n == attribute)
            .map(|idx| self.protected_attributes.column(idx))
    }

    /// Rows matching any of `conditions`.
    pub fn group_mask(&self, conditions: &[GroupCondition]) -> Result<Vec<bool>, MetricError> {
        let mut mask = vec![false; self.n_rows()];
        for condition in conditions {
            let column = self.protected_column(&condition.attribute).ok_or_else(|| {
                MetricError::Configuration(format!(
                    "`{}` is not a protected attribute",
                    condition.attribute
                ))
            })?;
            for (hit, value) in mask.iter_mut().zip(column.iter()) {
                *hit |= *value == condition.value;
            }
        }
        Ok(mask)
    }

    /// Share of favorable labels among the rows in `conditions`; `None` for
    /// an empty group.
    pub fn favorable_rate(&self, conditions: &[GroupCondition]) -> Result<Option<f64>, MetricError> {
        let mask = self.group_mask(conditions)?;
        let (members, favorable) = mask
            .iter()
            .zip(self.labels.iter())
            .filter(|(hit, _)| **hit)
            .fold((0usize, 0usize), |(members, favorable), (_, label)| {
                (members + 1, favorable + usize::from(*label == self.favorable_label))
            });
        Ok((members > 0).then(|| favorable as f64 / members as f64))
    }
}
