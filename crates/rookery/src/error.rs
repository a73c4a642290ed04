//! Error types for the Rookery library.
//!
//! Errors are split along the request lifecycle: [`DataLoadError`] is fatal at
//! startup, the other three are per-request and are caught at the dashboard
//! boundary so one failing step never takes the session down.

use std::path::PathBuf;
use thiserror::Error;

/// Startup failure while loading the dataset or the pipeline artifact.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file or no data rows.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// A declared column is not present in the table header.
    #[error("Column '{0}' not found in dataset")]
    MissingColumn(String),

    /// A numeric column has no finite values, so its range is undefined.
    #[error("Numeric column '{0}' contains no finite values")]
    NoFiniteValues(String),

    /// A categorical or label column has only missing values.
    #[error("Column '{0}' contains no non-missing values")]
    EmptyColumn(String),

    /// The pipeline artifact could not be decoded.
    #[error("Invalid pipeline artifact '{path}': {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A form value outside the declared feature domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing value for '{0}'")]
    MissingField(String),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("'{value}' is not a valid choice for '{column}' (expected one of: {})", allowed.join(", "))]
    UnknownCategory {
        column: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("'{value}' is not a number for '{column}'")]
    NotANumber { column: String, value: String },

    #[error("{value} is outside [{min}, {max}] for '{column}'")]
    OutOfRange {
        column: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// The pipeline rejected its input or produced an unusable output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Category not seen when the encoding stage was fit.
    #[error("Category '{value}' was not seen for '{column}' when the pipeline was fit")]
    UnknownCategory { column: String, value: String },

    /// Record or matrix columns do not line up with what the pipeline expects.
    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    /// The artifact's input columns differ from the dataset's feature order.
    #[error("Pipeline expects columns [{expected}] but dataset provides [{found}]")]
    FeatureOrderMismatch { expected: String, found: String },

    /// The artifact's class labels differ from the dataset's labels.
    #[error("Pipeline class labels [{expected}] do not match dataset labels [{found}]")]
    ClassLabelMismatch { expected: String, found: String },

    /// The encoder's fitted categories differ from the dataset's domain.
    #[error("Pipeline categories for '{column}' are [{expected}] but dataset provides [{found}]")]
    CategoryDomainMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// The artifact is structurally broken (bad node index, wrong widths, ...).
    #[error("Malformed pipeline: {0}")]
    Malformed(String),

    /// Probabilities out of range or not summing to one.
    #[error("Invalid class probabilities: {0}")]
    InvalidProbabilities(String),
}

/// One of the explainer backends failed to produce an explanation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExplainabilityError {
    /// The classifier stage has no structure the backend can use.
    #[error("{backend} does not support a {model} classifier")]
    UnsupportedModel { backend: String, model: String },

    /// Attributions do not sum to the model output within tolerance.
    #[error("Additivity check failed for class '{class_label}': residual {residual:.3e} exceeds {tolerance:.1e}")]
    AdditivityViolation {
        class_label: String,
        residual: f64,
        tolerance: f64,
    },

    /// Categorical index mapping disagrees with the encoder's category order.
    #[error("Category order for '{0}' differs between dataset profile and encoder")]
    CategoryMismatch(String),

    /// Requested precision threshold is outside (0, 1].
    #[error("Precision threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    /// Rule search found no rule reaching the requested precision.
    #[error("No rule reached precision {threshold:.2} (best candidate: {best_precision:.3})")]
    ThresholdNotMet { threshold: f64, best_precision: f64 },

    /// Rule search ran out of wall-clock budget.
    #[error("Rule search exceeded its {budget_ms} ms budget")]
    Timeout { budget_ms: u64 },

    /// The reference distribution is empty or unusable.
    #[error("Reference data unusable: {0}")]
    Reference(String),

    /// The model failed while the backend was querying it.
    #[error("Model error during explanation: {0}")]
    Model(#[from] ModelError),
}

/// Umbrella error for Rookery operations.
#[derive(Debug, Error)]
pub enum RookeryError {
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Explainability(#[from] ExplainabilityError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Rookery operations.
pub type Result<T> = std::result::Result<T, RookeryError>;
