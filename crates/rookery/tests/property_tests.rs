//! Property-based tests for the prediction and attribution paths.
//!
//! Inputs are drawn from the fixture dataset's observed domains and ranges,
//! so every generated specimen is one the form would accept.
//!
//! # Testing Philosophy
//!
//! Property-based tests verify:
//! 1. **Probabilities**: every output is a distribution over the class labels
//! 2. **Determinism**: the same record always produces the same output
//! 3. **Additivity**: attributions sum to the model output for every class
//! 4. **Bounds**: the collector accepts in-range values and rejects the rest
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p rookery --test property_tests
//!
//! # More cases
//! PROPTEST_CASES=10000 cargo test -p rookery --test property_tests
//! ```

use std::path::PathBuf;
use std::sync::LazyLock;

use proptest::prelude::*;

use rookery::explain::{AttributionConfig, TreeExplainer};
use rookery::{Dashboard, FormValues, RookeryConfig, ValidationError};

static DASHBOARD: LazyLock<Dashboard> = LazyLock::new(|| {
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures");
    Dashboard::load(
        RookeryConfig::default(),
        fixtures.join("penguins.csv"),
        fixtures.join("penguin_clf.json"),
    )
    .expect("Failed to load fixture dashboard")
});

// =============================================================================
// Test Strategies
// =============================================================================

/// Specimens inside the observed domains and ranges.
fn specimen() -> impl Strategy<Value = FormValues> {
    (
        prop::sample::select(vec!["Biscoe", "Dream", "Torgersen"]),
        prop::sample::select(vec!["female", "male"]),
        35.9f64..=52.7,
        13.2f64..=20.6,
        174.0f64..=230.0,
        3250.0f64..=5700.0,
    )
        .prop_map(|(island, gender, length, depth, flipper, mass)| {
            FormValues::new()
                .with("island", island)
                .with("gender", gender)
                .with("culmen_length_mm", length)
                .with("culmen_depth_mm", depth)
                .with("flipper_length_mm", flipper)
                .with("body_mass_g", mass)
        })
}

/// Flipper lengths outside the observed range.
fn out_of_range_flipper() -> impl Strategy<Value = f64> {
    prop_oneof![100.0f64..173.9, 230.1f64..400.0]
}

// =============================================================================
// Prediction Properties
// =============================================================================

proptest! {
    #[test]
    fn probabilities_form_a_distribution(values in specimen()) {
        let dashboard = &*DASHBOARD;
        let record = dashboard.collect(&values).unwrap();
        let prediction = dashboard.predict(&record).unwrap();

        let total: f64 = prediction.probabilities.values().sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "sum {}", total);
        for p in prediction.probabilities.values() {
            prop_assert!((0.0..=1.0).contains(p));
        }
        prop_assert!(dashboard.profile().class_labels.contains(&prediction.class_label));
        prop_assert_eq!(
            prediction.probabilities.keys().collect::<Vec<_>>(),
            dashboard.profile().class_labels.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn prediction_is_deterministic(values in specimen()) {
        let dashboard = &*DASHBOARD;
        let record = dashboard.collect(&values).unwrap();
        prop_assert_eq!(
            dashboard.predict(&record).unwrap(),
            dashboard.predict(&record).unwrap()
        );
    }

    #[test]
    fn predicted_class_has_highest_probability(values in specimen()) {
        let dashboard = &*DASHBOARD;
        let record = dashboard.collect(&values).unwrap();
        let prediction = dashboard.predict(&record).unwrap();
        let best = prediction.probabilities.values().cloned().fold(f64::MIN, f64::max);
        prop_assert_eq!(prediction.confidence(), Some(best));
    }
}

// =============================================================================
// Attribution Properties
// =============================================================================

proptest! {
    #[test]
    fn attributions_are_additive(values in specimen()) {
        let dashboard = &*DASHBOARD;
        let pipeline = dashboard.pipeline();
        let record = dashboard.collect(&values).unwrap();
        let row = pipeline.encode(&record).unwrap();

        let explainer = TreeExplainer::new(&pipeline.classifier).unwrap();
        let attribution = explainer
            .explain(
                &row,
                &pipeline.encoder.encoded_columns(),
                Vec::new(),
                &pipeline.class_labels,
                &AttributionConfig::default(),
            )
            .unwrap();

        let proba = dashboard.predict(&record).unwrap().probabilities;
        for class in &attribution.classes {
            let sum: f64 = class.baseline + class.contributions.values().sum::<f64>();
            prop_assert!((sum - proba[&class.class_label]).abs() < 1e-6,
                "{}: {} vs {}", class.class_label, sum, proba[&class.class_label]);
        }
    }

    #[test]
    fn attribution_baselines_do_not_depend_on_the_row(values in specimen()) {
        let pipeline = DASHBOARD.pipeline();
        let explainer = TreeExplainer::new(&pipeline.classifier).unwrap();
        let record = DASHBOARD.collect(&values).unwrap();
        let row = pipeline.encode(&record).unwrap();

        let attribution = explainer
            .explain(
                &row,
                &pipeline.encoder.encoded_columns(),
                Vec::new(),
                &pipeline.class_labels,
                &AttributionConfig::default(),
            )
            .unwrap();
        let baselines: Vec<f64> = attribution.classes.iter().map(|c| c.baseline).collect();
        prop_assert_eq!(baselines, explainer.expected_values());
    }
}

// =============================================================================
// Input Collector Properties
// =============================================================================

proptest! {
    #[test]
    fn in_range_values_accepted(values in specimen()) {
        let record = DASHBOARD.collect(&values);
        prop_assert!(record.is_ok(), "{:?}", record.err());
        let record = record.unwrap();
        prop_assert_eq!(record.columns().collect::<Vec<_>>(),
            DASHBOARD.profile().feature_order.iter().map(|s| s.as_str()).collect::<Vec<_>>());
    }

    #[test]
    fn out_of_range_values_rejected(values in specimen(), flipper in out_of_range_flipper()) {
        let values = values.with("flipper_length_mm", flipper);
        let err = DASHBOARD.collect(&values).unwrap_err();
        let is_out_of_range = matches!(err, ValidationError::OutOfRange { .. });
        prop_assert!(is_out_of_range);
    }

    #[test]
    fn unseen_categories_rejected(values in specimen(), island in "[A-Z][a-z]{3,10}") {
        prop_assume!(!["Biscoe", "Dream", "Torgersen"].contains(&island.as_str()));
        let values = values.with("island", island);
        let err = DASHBOARD.collect(&values).unwrap_err();
        let is_unknown = matches!(err, ValidationError::UnknownCategory { .. });
        prop_assert!(is_unknown);
    }
}
