//! Trained pipeline artifact: a fitted encoding stage plus a classifier stage.
//!
//! The artifact is produced outside this crate and stored as JSON:
//!
//! ```json
//! {
//!   "input_columns": ["island", "culmen_length_mm", "..."],
//!   "class_labels": ["Adelie", "Chinstrap", "Gentoo"],
//!   "encoder": { "categorical": [...], "numeric": [...] },
//!   "classifier": { "kind": "random_forest", "n_features": 6, "n_classes": 3, "trees": [...] }
//! }
//! ```

mod encoder;
mod forest;
mod linear;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DataLoadError, ModelError, Result};
use crate::profile::DatasetProfile;
use crate::record::FeatureRecord;

pub use encoder::{CategoricalEncoding, EncodedFeatures, FeatureEncoder};
pub use forest::{DecisionTree, TreeEnsemble, TreeNode};
pub use linear::LinearClassifier;

/// Operations every classifier stage offers on already-encoded rows.
pub trait Classifier {
    /// Short model name for messages.
    fn name(&self) -> &'static str;

    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    /// Class probabilities for one encoded row.
    fn predict_proba(&self, row: &[f64]) -> Vec<f64>;

    /// Most probable class; ties go to the lowest index.
    fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba(row))
    }

    /// Tree structure, for backends that need it.
    fn tree_ensemble(&self) -> Option<&TreeEnsemble> {
        None
    }
}

/// Classifier stages an artifact may contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierStage {
    RandomForest(TreeEnsemble),
    LogisticRegression(LinearClassifier),
}

impl Classifier for ClassifierStage {
    fn name(&self) -> &'static str {
        match self {
            ClassifierStage::RandomForest(_) => "random forest",
            ClassifierStage::LogisticRegression(_) => "logistic regression",
        }
    }

    fn n_features(&self) -> usize {
        match self {
            ClassifierStage::RandomForest(f) => f.n_features,
            ClassifierStage::LogisticRegression(l) => l.n_features(),
        }
    }

    fn n_classes(&self) -> usize {
        match self {
            ClassifierStage::RandomForest(f) => f.n_classes,
            ClassifierStage::LogisticRegression(l) => l.n_classes(),
        }
    }

    fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        match self {
            ClassifierStage::RandomForest(f) => f.predict_proba(row),
            ClassifierStage::LogisticRegression(l) => l.predict_proba(row),
        }
    }

    fn tree_ensemble(&self) -> Option<&TreeEnsemble> {
        match self {
            ClassifierStage::RandomForest(f) => Some(f),
            ClassifierStage::LogisticRegression(_) => None,
        }
    }
}

/// Encoding stage and classifier stage bundled as one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedPipeline {
    /// Raw columns in the order the pipeline was fit with.
    pub input_columns: Vec<String>,
    /// Class names, index-aligned with the classifier's outputs.
    pub class_labels: Vec<String>,
    pub encoder: FeatureEncoder,
    pub classifier: ClassifierStage,
}

impl TrainedPipeline {
    /// Load and validate an artifact from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| DataLoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let pipeline: TrainedPipeline =
            serde_json::from_str(&text).map_err(|e| DataLoadError::Artifact {
                path: path.to_path_buf(),
                source: e,
            })?;
        let pipeline = pipeline.prepared()?;

        tracing::info!(
            path = %path.display(),
            classifier = pipeline.classifier.name(),
            classes = pipeline.class_labels.len(),
            "loaded pipeline artifact"
        );
        Ok(pipeline)
    }

    /// Validate internal consistency and normalize the classifier stage.
    pub fn prepared(mut self) -> std::result::Result<Self, ModelError> {
        let mut encoded_sources: Vec<&str> = self
            .encoder
            .categorical
            .iter()
            .map(|c| c.column.as_str())
            .chain(self.encoder.numeric.iter().map(|s| s.as_str()))
            .collect();
        encoded_sources.sort_unstable();
        let mut inputs: Vec<&str> = self.input_columns.iter().map(|s| s.as_str()).collect();
        inputs.sort_unstable();
        if encoded_sources != inputs {
            return Err(ModelError::Malformed(
                "encoder columns do not cover the input columns exactly once".to_string(),
            ));
        }

        if self.classifier.n_features() != self.encoder.width() {
            return Err(ModelError::Malformed(format!(
                "classifier expects {} features but encoder produces {}",
                self.classifier.n_features(),
                self.encoder.width()
            )));
        }
        if self.classifier.n_classes() != self.class_labels.len() {
            return Err(ModelError::Malformed(format!(
                "classifier has {} classes but {} labels are declared",
                self.classifier.n_classes(),
                self.class_labels.len()
            )));
        }

        match &mut self.classifier {
            ClassifierStage::RandomForest(forest) => forest.prepare()?,
            ClassifierStage::LogisticRegression(linear) => linear.validate()?,
        }
        Ok(self)
    }

    /// Check the artifact against the dataset it is served with.
    ///
    /// Column order, class order and category order must match exactly: a
    /// permutation would silently produce wrong predictions or labels.
    pub fn check_against(&self, profile: &DatasetProfile) -> std::result::Result<(), ModelError> {
        if self.input_columns != profile.feature_order {
            return Err(ModelError::FeatureOrderMismatch {
                expected: self.input_columns.join(", "),
                found: profile.feature_order.join(", "),
            });
        }
        if self.class_labels != profile.class_labels {
            return Err(ModelError::ClassLabelMismatch {
                expected: self.class_labels.join(", "),
                found: profile.class_labels.join(", "),
            });
        }
        for encoding in &self.encoder.categorical {
            let domain = profile.categorical_domains.get(&encoding.column);
            if domain != Some(&encoding.categories) {
                return Err(ModelError::CategoryDomainMismatch {
                    column: encoding.column.clone(),
                    expected: encoding.categories.join(", "),
                    found: domain.map(|d| d.join(", ")).unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    /// Encode one record after checking its columns line up with the pipeline.
    pub fn encode(&self, record: &FeatureRecord) -> std::result::Result<Vec<f64>, ModelError> {
        if !record.columns().eq(self.input_columns.iter().map(|s| s.as_str())) {
            return Err(ModelError::FeatureMismatch(format!(
                "record columns [{}] differ from pipeline columns [{}]",
                record.columns().collect::<Vec<_>>().join(", "),
                self.input_columns.join(", ")
            )));
        }
        self.encoder.encode(record)
    }

    /// Encode many records with the same fitted encoder.
    pub fn encode_all(
        &self,
        records: &[FeatureRecord],
    ) -> std::result::Result<EncodedFeatures, ModelError> {
        let rows = records
            .iter()
            .map(|r| self.encode(r))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(EncodedFeatures {
            columns: self.encoder.encoded_columns(),
            rows,
        })
    }
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built penguin pipeline shared by unit tests.

    use indexmap::IndexMap;

    use super::*;
    use crate::record::FeatureValue;

    pub const FEATURE_ORDER: [&str; 6] = [
        "island",
        "culmen_length_mm",
        "culmen_depth_mm",
        "flipper_length_mm",
        "body_mass_g",
        "gender",
    ];

    fn split(feature: usize, threshold: f64, left: usize, right: usize, cover: f64) -> TreeNode {
        TreeNode::Split {
            feature,
            threshold,
            left,
            right,
            cover,
        }
    }

    fn leaf(value: [f64; 3], cover: f64) -> TreeNode {
        TreeNode::Leaf {
            value: value.to_vec(),
            cover,
        }
    }

    /// Encoded columns: island, gender, culmen length, culmen depth, flipper, mass.
    pub fn penguin_pipeline() -> TrainedPipeline {
        let trees = vec![
            DecisionTree {
                nodes: vec![
                    split(4, 206.5, 1, 4, 100.0),
                    split(2, 43.0, 2, 3, 64.0),
                    leaf([0.96, 0.04, 0.0], 44.0),
                    leaf([0.1, 0.9, 0.0], 20.0),
                    leaf([0.0, 0.03, 0.97], 36.0),
                ],
            },
            DecisionTree {
                nodes: vec![
                    split(3, 16.35, 1, 2, 100.0),
                    leaf([0.03, 0.0, 0.97], 37.0),
                    split(0, 0.5, 3, 4, 63.0),
                    leaf([1.0, 0.0, 0.0], 14.0),
                    split(2, 44.5, 5, 6, 49.0),
                    leaf([0.95, 0.05, 0.0], 29.0),
                    leaf([0.05, 0.95, 0.0], 20.0),
                ],
            },
            DecisionTree {
                nodes: vec![
                    split(5, 4700.0, 1, 4, 100.0),
                    split(2, 42.3, 2, 3, 62.0),
                    leaf([0.97, 0.03, 0.0], 40.0),
                    leaf([0.15, 0.85, 0.0], 22.0),
                    split(1, 0.5, 5, 6, 38.0),
                    leaf([0.2, 0.1, 0.7], 8.0),
                    leaf([0.0, 0.0, 1.0], 30.0),
                ],
            },
        ];

        TrainedPipeline {
            input_columns: FEATURE_ORDER.iter().map(|s| s.to_string()).collect(),
            class_labels: vec!["Adelie".into(), "Chinstrap".into(), "Gentoo".into()],
            encoder: FeatureEncoder {
                categorical: vec![
                    CategoricalEncoding {
                        column: "island".into(),
                        categories: vec!["Biscoe".into(), "Dream".into(), "Torgersen".into()],
                    },
                    CategoricalEncoding {
                        column: "gender".into(),
                        categories: vec!["female".into(), "male".into()],
                    },
                ],
                numeric: vec![
                    "culmen_length_mm".into(),
                    "culmen_depth_mm".into(),
                    "flipper_length_mm".into(),
                    "body_mass_g".into(),
                ],
            },
            classifier: ClassifierStage::RandomForest(TreeEnsemble {
                n_features: 6,
                n_classes: 3,
                trees,
            }),
        }
        .prepared()
        .expect("fixture pipeline is valid")
    }

    /// Record in dataset feature order.
    pub fn record(
        island: &str,
        gender: &str,
        culmen_length: f64,
        culmen_depth: f64,
        flipper_length: f64,
        body_mass: f64,
    ) -> FeatureRecord {
        let mut values = IndexMap::new();
        values.insert("island".to_string(), FeatureValue::Categorical(island.into()));
        values.insert("culmen_length_mm".to_string(), FeatureValue::Numeric(culmen_length));
        values.insert("culmen_depth_mm".to_string(), FeatureValue::Numeric(culmen_depth));
        values.insert("flipper_length_mm".to_string(), FeatureValue::Numeric(flipper_length));
        values.insert("body_mass_g".to_string(), FeatureValue::Numeric(body_mass));
        values.insert("gender".to_string(), FeatureValue::Categorical(gender.into()));
        FeatureRecord::from_ordered(values)
    }

    /// Profile matching the fixture pipeline.
    pub fn penguin_profile() -> DatasetProfile {
        use crate::profile::{NumericRange, NumericStatistics};

        let mut categorical_domains = IndexMap::new();
        categorical_domains.insert(
            "island".to_string(),
            vec!["Biscoe".into(), "Dream".into(), "Torgersen".into()],
        );
        categorical_domains.insert("gender".to_string(), vec!["female".into(), "male".into()]);

        let mut numeric_ranges = IndexMap::new();
        let mut numeric_statistics = IndexMap::new();
        for (name, min, max) in [
            ("culmen_length_mm", 32.1, 59.6),
            ("culmen_depth_mm", 13.1, 21.5),
            ("flipper_length_mm", 172.0, 231.0),
            ("body_mass_g", 2700.0, 6300.0),
        ] {
            numeric_ranges.insert(name.to_string(), NumericRange { min, max });
            let stats = NumericStatistics::from_values([min, max]).expect("finite");
            numeric_statistics.insert(name.to_string(), stats);
        }

        DatasetProfile {
            categorical_domains,
            numeric_ranges,
            numeric_statistics,
            class_labels: vec!["Adelie".into(), "Chinstrap".into(), "Gentoo".into()],
            feature_order: FEATURE_ORDER.iter().map(|s| s.to_string()).collect(),
            label_column: "species".into(),
            row_count: 0,
        }
    }
}
