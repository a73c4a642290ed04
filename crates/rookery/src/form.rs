//! Input collector: form description and validation of submitted values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::FormConfig;
use crate::error::ValidationError;
use crate::input::parse_number;
use crate::profile::{DatasetProfile, FeatureKind};
use crate::record::{FeatureRecord, FeatureValue};

/// How numeric bounds from the profile are applied to submitted values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Values outside the observed range are rejected.
    #[default]
    Strict,
    /// Values outside the observed range are accepted with a warning.
    Advisory,
}

/// One input widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum FormField {
    /// Closed choice among observed categories.
    Choice {
        name: String,
        label: String,
        options: Vec<String>,
    },
    /// Numeric input bounded by the observed range.
    Number {
        name: String,
        label: String,
        min: f64,
        max: f64,
        step: f64,
        default: f64,
    },
}

impl FormField {
    pub fn name(&self) -> &str {
        match self {
            FormField::Choice { name, .. } | FormField::Number { name, .. } => name,
        }
    }

    /// Value the widget shows before the user touches it.
    pub fn default_value(&self) -> String {
        match self {
            FormField::Choice { options, .. } => options.first().cloned().unwrap_or_default(),
            FormField::Number { default, .. } => default.to_string(),
        }
    }
}

/// The full input form: choices first, then numeric inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSpec {
    pub fields: Vec<FormField>,
}

impl FormSpec {
    /// Describe the form for a dataset profile.
    pub fn from_profile(profile: &DatasetProfile, config: &FormConfig) -> Self {
        let choices = profile
            .categorical_domains
            .iter()
            .map(|(name, options)| FormField::Choice {
                name: name.clone(),
                label: format!("Select {}", name),
                options: options.clone(),
            });

        let numbers = profile.numeric_ranges.iter().map(|(name, range)| FormField::Number {
            name: name.clone(),
            label: format!("Select {}", name),
            min: range.min,
            max: range.max,
            step: config.step_for(name),
            default: range.min,
        });

        Self {
            fields: choices.chain(numbers).collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name() == name)
    }
}

/// Raw submitted form values, keyed by feature name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(IndexMap<String, String>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fill fields the user has not set with the widget defaults.
    pub fn with_defaults(mut self, form: &FormSpec) -> Self {
        for field in &form.fields {
            if !self.0.contains_key(field.name()) {
                self.0.insert(field.name().to_string(), field.default_value());
            }
        }
        self
    }
}

impl FromIterator<(String, String)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Validate submitted values and build a record in the profile's feature order.
pub fn collect_input(
    profile: &DatasetProfile,
    values: &FormValues,
    policy: BoundsPolicy,
) -> Result<FeatureRecord, ValidationError> {
    if let Some((unknown, _)) = values.iter().find(|(name, _)| profile.kind(name).is_none()) {
        return Err(ValidationError::UnknownField(unknown.to_string()));
    }

    let mut record = IndexMap::with_capacity(profile.feature_order.len());

    for column in &profile.feature_order {
        let raw = values
            .get(column)
            .map(str::trim)
            .ok_or_else(|| ValidationError::MissingField(column.clone()))?;

        let value = match profile.kind(column) {
            Some(FeatureKind::Categorical) => {
                let domain = &profile.categorical_domains[column];
                if !domain.iter().any(|v| v == raw) {
                    return Err(ValidationError::UnknownCategory {
                        column: column.clone(),
                        value: raw.to_string(),
                        allowed: domain.clone(),
                    });
                }
                FeatureValue::Categorical(raw.to_string())
            }
            _ => {
                let number = parse_number(raw).ok_or_else(|| ValidationError::NotANumber {
                    column: column.clone(),
                    value: raw.to_string(),
                })?;
                if let Some(range) = profile.numeric_ranges.get(column) {
                    if !range.contains(number) {
                        match policy {
                            BoundsPolicy::Strict => {
                                return Err(ValidationError::OutOfRange {
                                    column: column.clone(),
                                    value: number,
                                    min: range.min,
                                    max: range.max,
                                });
                            }
                            BoundsPolicy::Advisory => tracing::warn!(
                                column = %column,
                                value = number,
                                min = range.min,
                                max = range.max,
                                "accepting value outside observed range"
                            ),
                        }
                    }
                }
                FeatureValue::Numeric(number)
            }
        };
        record.insert(column.clone(), value);
    }

    Ok(FeatureRecord::from_ordered(record))
}
