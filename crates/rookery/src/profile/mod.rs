//! Dataset profile: per-column metadata derived once from the raw table.
//!
//! The profile drives everything downstream: the form's choices and bounds,
//! the order in which features are handed to the pipeline, and the class
//! labels a prediction index maps to.

mod statistics;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::DatasetConfig;
use crate::error::DataLoadError;
use crate::input::{DataTable, parse_number};
use crate::record::{FeatureRecord, FeatureValue};

pub use statistics::{NumericStatistics, quantile_sorted};

/// Observed bounds of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Whether a feature is categorical or numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Categorical,
    Numeric,
}

/// Metadata derived from the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetProfile {
    /// Sorted distinct values of each categorical column.
    pub categorical_domains: IndexMap<String, Vec<String>>,
    /// Observed min/max of each numeric column.
    pub numeric_ranges: IndexMap<String, NumericRange>,
    /// Fuller statistics of each numeric column.
    pub numeric_statistics: IndexMap<String, NumericStatistics>,
    /// Sorted distinct class labels, index-aligned with the model's classes.
    pub class_labels: Vec<String>,
    /// Feature columns in dataset order; the pipeline must expect this order.
    pub feature_order: Vec<String>,
    /// Name of the label column.
    pub label_column: String,
    /// Number of rows the profile was computed from.
    pub row_count: usize,
}

impl DatasetProfile {
    /// Build the profile for the declared columns of `table`.
    pub fn build(table: &DataTable, config: &DatasetConfig) -> Result<Self, DataLoadError> {
        let column_index = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| DataLoadError::MissingColumn(name.to_string()))
        };

        let mut categorical_domains = IndexMap::new();
        for name in &config.categorical_columns {
            let domain = distinct_values(table, column_index(name)?);
            if domain.is_empty() {
                return Err(DataLoadError::EmptyColumn(name.clone()));
            }
            categorical_domains.insert(name.clone(), domain);
        }

        let mut numeric_ranges = IndexMap::new();
        let mut numeric_statistics = IndexMap::new();
        for name in &config.numeric_columns {
            let index = column_index(name)?;
            let stats = NumericStatistics::from_values(table.numeric_values(index).map(|(_, v)| v))
                .ok_or_else(|| DataLoadError::NoFiniteValues(name.clone()))?;
            numeric_ranges.insert(
                name.clone(),
                NumericRange {
                    min: stats.min,
                    max: stats.max,
                },
            );
            numeric_statistics.insert(name.clone(), stats);
        }

        let class_labels = distinct_values(table, column_index(&config.label_column)?);
        if class_labels.is_empty() {
            return Err(DataLoadError::EmptyColumn(config.label_column.clone()));
        }

        let mut feature_order = Vec::new();
        for header in &table.headers {
            if config.is_feature(header) {
                feature_order.push(header.clone());
            } else if *header != config.label_column {
                tracing::debug!(column = %header, "ignoring undeclared column");
            }
        }

        tracing::info!(
            features = feature_order.len(),
            classes = class_labels.len(),
            rows = table.row_count(),
            "built dataset profile"
        );

        Ok(Self {
            categorical_domains,
            numeric_ranges,
            numeric_statistics,
            class_labels,
            feature_order,
            label_column: config.label_column.clone(),
            row_count: table.row_count(),
        })
    }

    /// Kind of a feature column, `None` if the column is not a feature.
    pub fn kind(&self, column: &str) -> Option<FeatureKind> {
        if self.categorical_domains.contains_key(column) {
            Some(FeatureKind::Categorical)
        } else if self.numeric_ranges.contains_key(column) {
            Some(FeatureKind::Numeric)
        } else {
            None
        }
    }

    /// Index of a class label.
    pub fn class_index(&self, label: &str) -> Option<usize> {
        self.class_labels.iter().position(|l| l == label)
    }

    /// Convert complete table rows into feature records.
    ///
    /// Rows with a missing or unparseable feature are skipped; the number of
    /// skipped rows is returned alongside the records.
    pub fn reference_records(
        &self,
        table: &DataTable,
    ) -> Result<(Vec<FeatureRecord>, usize), DataLoadError> {
        let mut positions = Vec::with_capacity(self.feature_order.len());
        for name in &self.feature_order {
            let index = table
                .column_index(name)
                .ok_or_else(|| DataLoadError::MissingColumn(name.clone()))?;
            positions.push((name, index, self.kind(name)));
        }

        let mut records = Vec::with_capacity(table.row_count());
        let mut skipped = 0;

        'rows: for row in &table.rows {
            let mut values = IndexMap::with_capacity(positions.len());
            for (name, index, kind) in &positions {
                let raw = row.get(*index).map(|s| s.as_str()).unwrap_or("");
                let value = match kind {
                    Some(FeatureKind::Categorical) if !DataTable::is_null_value(raw) => {
                        FeatureValue::Categorical(raw.to_string())
                    }
                    Some(FeatureKind::Numeric) => match parse_number(raw) {
                        Some(v) => FeatureValue::Numeric(v),
                        None => {
                            skipped += 1;
                            continue 'rows;
                        }
                    },
                    _ => {
                        skipped += 1;
                        continue 'rows;
                    }
                };
                values.insert((*name).clone(), value);
            }
            records.push(FeatureRecord::from_ordered(values));
        }

        if skipped > 0 {
            tracing::warn!(skipped, kept = records.len(), "skipped incomplete reference rows");
        }

        Ok((records, skipped))
    }
}

/// Sorted distinct non-null values of a column.
fn distinct_values(table: &DataTable, index: usize) -> Vec<String> {
    table
        .column_values(index)
        .filter(|v| !DataTable::is_null_value(v))
        .map(|v| v.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
