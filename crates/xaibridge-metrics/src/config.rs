use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::MetricError;

/// One `{attribute: value}` group condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupCondition {
    pub attribute: String,
    pub value: f64,
}

/// Describes how a table reads as a binary-label dataset and which groups
/// are compared.
///
/// `privileged_groups[i]` and `unprivileged_groups[i]` are values of
/// `protected_attribute_names[i]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FairnessConfig {
    pub protected_attribute_names: Vec<String>,
    pub label_names: Vec<String>,
    pub favorable_label: f64,
    pub unfavorable_label: f64,
    #[serde(default)]
    pub privileged_protected_attributes: Vec<Vec<f64>>,
    #[serde(default)]
    pub unprivileged_protected_attributes: Vec<Vec<f64>>,
    pub privileged_groups: Vec<f64>,
    pub unprivileged_groups: Vec<f64>,
}

impl FairnessConfig {
    pub fn validate(&self) -> Result<(), MetricError> {
        let n = self.protected_attribute_names.len();
        if n == 0 {
            return Err(MetricError::Configuration(
                "at least one protected attribute is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for name in &self.protected_attribute_names {
            if !seen.insert(name.as_str()) {
                return Err(MetricError::Configuration(format!(
                    "protected attribute `{name}` is listed twice"
                )));
            }
        }

        let [label] = self.label_names.as_slice() else {
            return Err(MetricError::Configuration(format!(
                "exactly one label column is required, got {}",
                self.label_names.len()
            )));
        };
        if seen.contains(label.as_str()) {
            return Err(MetricError::Configuration(format!(
                "label `{label}` cannot also be a protected attribute"
            )));
        }

        if !self.favorable_label.is_finite() || !self.unfavorable_label.is_finite() {
            return Err(MetricError::Configuration("labels must be finite".to_string()));
        }
        if self.favorable_label == self.unfavorable_label {
            return Err(MetricError::Configuration(format!(
                "favorable and unfavorable labels are both {}",
                self.favorable_label
            )));
        }

        for (field, len) in [
            ("privileged_groups", self.privileged_groups.len()),
            ("unprivileged_groups", self.unprivileged_groups.len()),
        ] {
            if len != n {
                return Err(MetricError::Configuration(format!(
                    "{field} has {len} values for {n} protected attributes"
                )));
            }
        }
        for (field, values) in [
            ("privileged_protected_attributes", &self.privileged_protected_attributes),
            ("unprivileged_protected_attributes", &self.unprivileged_protected_attributes),
        ] {
            if !values.is_empty() && values.len() != n {
                return Err(MetricError::Configuration(format!(
                    "{field} has {} entries for {n} protected attributes",
                    values.len()
                )));
            }
        }
        Ok(())
    }

    pub fn label_name(&self) -> &str {
        self.label_names.first().map(String::as_str).unwrap_or_default()
    }

    pub fn privileged_conditions(&self) -> Vec<GroupCondition> {
        zip_conditions(&self.protected_attribute_names, &self.privileged_groups)
    }

    pub fn unprivileged_conditions(&self) -> Vec<GroupCondition> {
        zip_conditions(&self.protected_attribute_names, &self.unprivileged_groups)
    }
}

fn zip_conditions(names: &[String], values: &[f64]) -> Vec<GroupCondition> {
    names
        .iter()
        .zip(values)
        .map(|(attribute, value)| GroupCondition {
            attribute: attribute.clone(),
            value: *value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FairnessConfig {
        FairnessConfig {
            protected_attribute_names: vec!["sex".to_string()],
            label_names: vec!["approved".to_string()],
            favorable_label: 1.0,
            unfavorable_label: 0.0,
            privileged_protected_attributes: vec![vec![1.0]],
            unprivileged_protected_attributes: vec![vec![0.0]],
            privileged_groups: vec![1.0],
            unprivileged_groups: vec![0.0],
        }
    }

    #[test]
    fn groups_zip_with_attribute_names() {
        let mut config = config();
        config.protected_attribute_names.push("race".to_string());
        config.privileged_groups.push(2.0);
        config.unprivileged_groups.push(3.0);
        config.privileged_protected_attributes.clear();
        config.unprivileged_protected_attributes.clear();
        assert!(config.validate().is_ok());

        assert_eq!(
            config.unprivileged_conditions(),
            vec![
                GroupCondition { attribute: "sex".to_string(), value: 0.0 },
                GroupCondition { attribute: "race".to_string(), value: 3.0 },
            ]
        );
    }

    #[test]
    fn exactly_one_label_is_required() {
        let mut config = config();
        config.label_names.push("other".to_string());
        assert!(matches!(config.validate(), Err(MetricError::Configuration(_))));
        config.label_names.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn mismatched_group_lengths_are_rejected() {
        let mut config = config();
        config.privileged_groups.push(2.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn identical_labels_are_rejected() {
        let mut config = config();
        config.unfavorable_label = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_from_json() {
        let config: FairnessConfig = serde_json::from_str(
            r#"{
                "protected_attribute_names": ["sex"],
                "label_names": ["approved"],
                "favorable_label": 1,
                "unfavorable_label": 0,
                "privileged_groups": [1],
                "unprivileged_groups": [0]
            }"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.label_name(), "approved");
    }
}
