//! Prediction service: class and per-class probabilities for one record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::{Classifier, TrainedPipeline, argmax};
use crate::profile::DatasetProfile;
use crate::record::FeatureRecord;

/// Allowed deviation of the probability sum from one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Outcome of classifying one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_index: usize,
    pub class_label: String,
    /// Probability per class label, in class order.
    pub probabilities: IndexMap<String, f64>,
}

impl Prediction {
    /// Probability of the predicted class; `None` if the index has no entry.
    pub fn confidence(&self) -> Option<f64> {
        self.probabilities
            .get_index(self.class_index)
            .map(|(_, p)| *p)
    }
}

/// Classify a record with the loaded pipeline.
pub fn predict(
    pipeline: &TrainedPipeline,
    profile: &DatasetProfile,
    record: &FeatureRecord,
) -> Result<Prediction, ModelError> {
    let row = pipeline.encode(record)?;
    let proba = pipeline.classifier.predict_proba(&row);
    let prediction = assemble(&proba, &profile.class_labels)?;

    tracing::debug!(
        class = %prediction.class_label,
        confidence = ?prediction.confidence(),
        "classified record"
    );
    Ok(prediction)
}

/// Turn a probability vector into a checked [`Prediction`].
pub fn assemble(proba: &[f64], class_labels: &[String]) -> Result<Prediction, ModelError> {
    if proba.len() != class_labels.len() {
        return Err(ModelError::InvalidProbabilities(format!(
            "{} probabilities for {} classes",
            proba.len(),
            class_labels.len()
        )));
    }
    if let Some(p) = proba.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(ModelError::InvalidProbabilities(format!(
            "probability {} is outside [0, 1]",
            p
        )));
    }
    let total: f64 = proba.iter().sum();
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(ModelError::InvalidProbabilities(format!(
            "probabilities sum to {}",
            total
        )));
    }

    let class_index = argmax(proba);
    let class_label = class_labels
        .get(class_index)
        .cloned()
        .ok_or_else(|| ModelError::InvalidProbabilities(format!("no label for class {}", class_index)))?;

    Ok(Prediction {
        class_index,
        class_label,
        probabilities: class_labels.iter().cloned().zip(proba.iter().copied()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    fn labels() -> Vec<String> {
        vec!["Adelie".into(), "Chinstrap".into(), "Gentoo".into()]
    }

    #[test]
    fn test_class_index_two_is_gentoo() {
        let prediction = assemble(&[0.05, 0.15, 0.8], &labels()).unwrap();
        assert_eq!(prediction.class_index, 2);
        assert_eq!(prediction.class_label, "Gentoo");
        assert_eq!(prediction.confidence(), Some(0.8));
    }

    #[test]
    fn test_confidence_of_deserialized_bad_index() {
        let json = r#"{"class_index": 7, "class_label": "Gentoo", "probabilities": {"Gentoo": 1.0}}"#;
        let prediction: Prediction = serde_json::from_str(json).unwrap();
        assert_eq!(prediction.confidence(), None);
    }

    #[test]
    fn test_rejects_bad_probabilities() {
        assert!(assemble(&[0.5, 0.5], &labels()).is_err());
        assert!(assemble(&[0.5, 0.6, -0.1], &labels()).is_err());
        assert!(assemble(&[0.5, 0.4, 0.0], &labels()).is_err());
        assert!(assemble(&[f64::NAN, 0.5, 0.5], &labels()).is_err());
    }

    #[test]
    fn test_predict_penguin_record() {
        let pipeline = fixtures::penguin_pipeline();
        let profile = fixtures::penguin_profile();
        let record = fixtures::record("Biscoe", "male", 45.0, 15.0, 200.0, 4000.0);

        let prediction = predict(&pipeline, &profile, &record).unwrap();

        assert_eq!(prediction.class_label, "Chinstrap");
        assert!((prediction.probabilities["Chinstrap"] - (0.9 + 0.0 + 0.85) / 3.0).abs() < 1e-12);
        let keys: Vec<&String> = prediction.probabilities.keys().collect();
        assert_eq!(keys, vec!["Adelie", "Chinstrap", "Gentoo"]);
    }

    #[test]
    fn test_predict_is_idempotent() {
        let pipeline = fixtures::penguin_pipeline();
        let profile = fixtures::penguin_profile();
        let record = fixtures::record("Torgersen", "female", 38.0, 18.5, 185.0, 3500.0);

        let first = predict(&pipeline, &profile, &record).unwrap();
        let second = predict(&pipeline, &profile, &record).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.class_label, "Adelie");
    }

    #[test]
    fn test_unseen_category_surfaces_model_error() {
        let pipeline = fixtures::penguin_pipeline();
        let profile = fixtures::penguin_profile();
        let record = fixtures::record("Anvers", "male", 45.0, 15.0, 200.0, 4000.0);

        let err = predict(&pipeline, &profile, &record).unwrap_err();
        assert!(matches!(err, ModelError::UnknownCategory { .. }));
    }
}
