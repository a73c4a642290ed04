//! Explanation adapter: bridges the pipeline's encoding stage to the
//! attribution and rule backends.
//!
//! Both backends work on the encoded feature space, against the classifier
//! stage alone. The query record is encoded with the same fitted encoder the
//! prediction used, and the reference table is encoded once up front.

mod anchor;
pub mod html;
mod shap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ExplainConfig;
use crate::error::{ExplainabilityError, ModelError};
use crate::model::{Classifier, EncodedFeatures, TrainedPipeline};
use crate::profile::DatasetProfile;
use crate::record::FeatureRecord;

pub use anchor::{
    AnchorConfig, AnchorExplainer, Condition, ConditionValue, Operator, RuleExplanation,
};
pub use shap::{AdditiveAttribution, AttributionConfig, ClassAttribution, TreeExplainer};

/// Parameters of one explain call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainRequest {
    /// Precision a rule must reach.
    pub threshold: f64,
}

impl Default for ExplainRequest {
    fn default() -> Self {
        Self {
            threshold: AnchorConfig::default().threshold,
        }
    }
}

impl ExplainRequest {
    /// Check the threshold lies in (0, 1].
    pub fn validate(&self) -> Result<(), ExplainabilityError> {
        if self.threshold > 0.0 && self.threshold <= 1.0 {
            Ok(())
        } else {
            Err(ExplainabilityError::InvalidThreshold(self.threshold))
        }
    }
}

/// Outcome of one backend, captured so the other can still be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackendResult<T> {
    Ready { explanation: T },
    Failed { error: String },
}

impl<T> BackendResult<T> {
    fn capture(backend: &str, result: Result<T, ExplainabilityError>) -> Self {
        match result {
            Ok(explanation) => BackendResult::Ready { explanation },
            Err(e) => {
                tracing::warn!(backend, error = %e, "explanation backend failed");
                BackendResult::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            BackendResult::Ready { explanation } => Some(explanation),
            BackendResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BackendResult::Ready { .. } => None,
            BackendResult::Failed { error } => Some(error),
        }
    }
}

/// Both explanations of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationReport {
    pub predicted_class: String,
    pub attribution: BackendResult<AdditiveAttribution>,
    pub rule: BackendResult<RuleExplanation>,
}

/// Runs the explanation backends for a loaded pipeline.
pub struct ExplanationAdapter<'a> {
    pipeline: &'a TrainedPipeline,
    profile: &'a DatasetProfile,
    reference: &'a EncodedFeatures,
    config: &'a ExplainConfig,
}

impl<'a> ExplanationAdapter<'a> {
    pub fn new(
        pipeline: &'a TrainedPipeline,
        profile: &'a DatasetProfile,
        reference: &'a EncodedFeatures,
        config: &'a ExplainConfig,
    ) -> Self {
        Self {
            pipeline,
            profile,
            reference,
            config,
        }
    }

    /// Explain the prediction for one record.
    ///
    /// Fails only if the record cannot be encoded; each backend's own failure
    /// is captured in the report.
    pub fn explain(
        &self,
        record: &FeatureRecord,
        request: &ExplainRequest,
    ) -> Result<ExplanationReport, ModelError> {
        let row = self.pipeline.encode(record)?;
        let class_index = self.pipeline.classifier.predict(&row);
        let predicted_class = self
            .pipeline
            .class_labels
            .get(class_index)
            .cloned()
            .ok_or_else(|| {
                ModelError::InvalidProbabilities(format!("no label for class {}", class_index))
            })?;

        let attribution = BackendResult::capture("attribution", self.attribution(&row));
        let rule = BackendResult::capture("rule", self.rule(&row, request));

        Ok(ExplanationReport {
            predicted_class,
            attribution,
            rule,
        })
    }

    /// Additive attribution of an encoded row for every class.
    pub fn attribution(&self, row: &[f64]) -> Result<AdditiveAttribution, ExplainabilityError> {
        let explainer = TreeExplainer::new(&self.pipeline.classifier)?;
        explainer.explain(
            row,
            &self.pipeline.encoder.encoded_columns(),
            self.display_values(row),
            &self.pipeline.class_labels,
            &self.config.attribution,
        )
    }

    /// Rule explanation of an encoded row at the requested precision.
    pub fn rule(
        &self,
        row: &[f64],
        request: &ExplainRequest,
    ) -> Result<RuleExplanation, ExplainabilityError> {
        let explainer = AnchorExplainer::new(
            &self.pipeline.classifier,
            &self.pipeline.class_labels,
            self.reference,
            self.categorical_names()?,
        )?;
        let config = AnchorConfig {
            threshold: request.threshold,
            ..self.config.anchor.clone()
        };
        explainer.explain(row, &config)
    }

    /// Encoded column index to category names, taken from the profile.
    ///
    /// The profile's domain must list categories in the encoder's code order,
    /// or rule conditions would name the wrong category.
    pub fn categorical_names(&self) -> Result<IndexMap<usize, Vec<String>>, ExplainabilityError> {
        let mut names = IndexMap::new();
        for (index, encoding) in self.pipeline.encoder.categorical.iter().enumerate() {
            match self.profile.categorical_domains.get(&encoding.column) {
                Some(domain) if *domain == encoding.categories => {
                    names.insert(index, domain.clone());
                }
                _ => return Err(ExplainabilityError::CategoryMismatch(encoding.column.clone())),
            }
        }
        Ok(names)
    }

    fn display_values(&self, row: &[f64]) -> Vec<String> {
        row.iter()
            .enumerate()
            .map(|(index, value)| match self.pipeline.encoder.decode_category(index, *value) {
                Some(category) => category.to_string(),
                None => format!("{}", value),
            })
            .collect()
    }
}

/// Encode reference records, optionally keeping a seeded sample of rows.
///
/// The sample keeps the original row order.
pub fn encode_reference(
    pipeline: &TrainedPipeline,
    records: &[FeatureRecord],
    sample: Option<usize>,
    seed: u64,
) -> Result<EncodedFeatures, ModelError> {
    let encoded = pipeline.encode_all(records)?;
    let Some(n) = sample.filter(|n| *n < encoded.n_rows()) else {
        return Ok(encoded);
    };

    let mut rng = fastrand::Rng::with_seed(seed);
    let mut indices: Vec<usize> = (0..encoded.n_rows()).collect();
    rng.shuffle(&mut indices);
    indices.truncate(n);
    indices.sort_unstable();

    tracing::debug!(kept = n, total = encoded.n_rows(), "sampled reference rows");
    Ok(EncodedFeatures {
        columns: encoded.columns.clone(),
        rows: indices.into_iter().map(|i| encoded.rows[i].clone()).collect(),
    })
}
