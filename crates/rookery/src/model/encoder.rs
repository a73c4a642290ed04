//! Encoding stage: raw feature records to the numeric matrix the classifier sees.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::record::{FeatureRecord, FeatureValue};

/// Ordinal encoding of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoding {
    pub column: String,
    /// Categories in code order: category `i` encodes as `i as f64`.
    pub categories: Vec<String>,
}

impl CategoricalEncoding {
    fn code(&self, value: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == value)
    }
}

/// Fitted encoding stage.
///
/// Output columns are the categorical columns (ordinal codes) followed by the
/// numeric columns passed through, each group in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    pub categorical: Vec<CategoricalEncoding>,
    pub numeric: Vec<String>,
}

impl FeatureEncoder {
    /// Number of encoded columns.
    pub fn width(&self) -> usize {
        self.categorical.len() + self.numeric.len()
    }

    /// Names of the encoded columns, in output order.
    pub fn encoded_columns(&self) -> Vec<String> {
        self.categorical
            .iter()
            .map(|c| c.column.clone())
            .chain(self.numeric.iter().cloned())
            .collect()
    }

    /// Raw column an encoded column was derived from.
    pub fn source_column(&self, encoded_index: usize) -> Option<&str> {
        match self.categorical.get(encoded_index) {
            Some(c) => Some(c.column.as_str()),
            None => self
                .numeric
                .get(encoded_index - self.categorical.len())
                .map(|s| s.as_str()),
        }
    }

    /// Categorical encoding behind an encoded column, if it is categorical.
    pub fn categorical_at(&self, encoded_index: usize) -> Option<&CategoricalEncoding> {
        self.categorical.get(encoded_index)
    }

    /// Category name for an ordinal code in an encoded column.
    pub fn decode_category(&self, encoded_index: usize, code: f64) -> Option<&str> {
        if code < 0.0 || code.fract() != 0.0 {
            return None;
        }
        self.categorical_at(encoded_index)?
            .categories
            .get(code as usize)
            .map(|s| s.as_str())
    }

    /// Encode one record.
    pub fn encode(&self, record: &FeatureRecord) -> Result<Vec<f64>, ModelError> {
        let mut row = Vec::with_capacity(self.width());

        for encoding in &self.categorical {
            let value = match record.get(&encoding.column) {
                Some(FeatureValue::Categorical(v)) => v,
                Some(FeatureValue::Numeric(_)) => {
                    return Err(ModelError::FeatureMismatch(format!(
                        "'{}' should be categorical",
                        encoding.column
                    )));
                }
                None => {
                    return Err(ModelError::FeatureMismatch(format!(
                        "record has no '{}'",
                        encoding.column
                    )));
                }
            };
            let code = encoding
                .code(value)
                .ok_or_else(|| ModelError::UnknownCategory {
                    column: encoding.column.clone(),
                    value: value.clone(),
                })?;
            row.push(code as f64);
        }

        for column in &self.numeric {
            let value = record
                .get(column)
                .and_then(FeatureValue::as_numeric)
                .ok_or_else(|| {
                    ModelError::FeatureMismatch(format!("'{}' should be numeric", column))
                })?;
            row.push(value);
        }

        Ok(row)
    }
}

/// Numeric matrix produced by the encoding stage, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedFeatures {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl EncodedFeatures {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    /// Values of one column across all rows.
    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |r| r[index])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
