//! Rookery: classify a penguin specimen and explain why.
//!
//! Rookery loads a tabular dataset and a pre-trained pipeline artifact once,
//! then serves cheap request cycles: collect a record from a form, classify
//! it, and explain the prediction two independent ways.
//!
//! # Components
//!
//! - **Dataset profile**: categorical domains, numeric ranges, class labels and
//!   feature order, derived once from the data
//! - **Input collector**: form description and validation of submitted values
//! - **Prediction service**: class label and per-class probabilities
//! - **Explanation adapter**: exact TreeSHAP attributions and Anchor rules on
//!   the pipeline's encoded feature space
//! - **Presentation sink**: where forms, tables, charts and fragments are shown
//!
//! # Example
//!
//! ```no_run
//! use rookery::{Dashboard, FormValues, RookeryConfig};
//!
//! let dashboard = Dashboard::load(RookeryConfig::default(), "penguins.csv", "penguin_clf.json")?;
//! let values = FormValues::new().with_defaults(dashboard.form_spec());
//! let record = dashboard.collect(&values)?;
//!
//! let prediction = dashboard.predict(&record)?;
//! if let Some(p) = prediction.confidence() {
//!     println!("{} ({:.3})", prediction.class_label, p);
//! }
//! # Ok::<(), rookery::RookeryError>(())
//! ```

pub mod config;
pub mod dashboard;
pub mod eda;
pub mod error;
pub mod explain;
pub mod form;
pub mod input;
pub mod model;
pub mod predict;
pub mod profile;
pub mod record;
pub mod render;

pub use config::RookeryConfig;
pub use dashboard::{Dashboard, RequestOutcome};
pub use eda::DatasetOverview;
pub use error::{
    DataLoadError, ExplainabilityError, ModelError, Result, RookeryError, ValidationError,
};
pub use explain::{
    AdditiveAttribution, BackendResult, ExplainRequest, ExplanationAdapter, ExplanationReport,
    RuleExplanation,
};
pub use form::{BoundsPolicy, FormField, FormSpec, FormValues, collect_input};
pub use input::{DataTable, Parser, SourceMetadata};
pub use model::{Classifier, TrainedPipeline};
pub use predict::{Prediction, predict};
pub use profile::DatasetProfile;
pub use record::{FeatureRecord, FeatureValue};
pub use render::{ChartSpec, HtmlPage, PresentationSink, TableView};
