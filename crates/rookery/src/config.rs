//! Configuration for the dashboard and its pipeline components.
//!
//! Every section has a default matching the penguin dataset, so an empty or
//! missing config file yields a working setup. Values can be overridden from
//! a TOML file:
//!
//! ```toml
//! [dataset]
//! label_column = "species"
//!
//! [form]
//! bounds = "advisory"
//!
//! [explain.anchor]
//! threshold = 0.9
//! timeout_ms = 5000
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RookeryError};
use crate::explain::{AnchorConfig, AttributionConfig};
use crate::form::BoundsPolicy;
use crate::input::ParserConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RookeryConfig {
    pub dataset: DatasetConfig,
    pub form: FormConfig,
    pub explain: ExplainConfig,
    pub overview: OverviewConfig,
    pub server: ServerConfig,
}

impl RookeryConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RookeryConfig =
            toml::from_str(text).map_err(|e| RookeryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            RookeryError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject settings that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.explain.anchor.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(RookeryError::Config(format!(
                "anchor threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.explain.anchor.batch_size == 0 || self.explain.anchor.beam_size == 0 {
            return Err(RookeryError::Config(
                "anchor batch_size and beam_size must be positive".to_string(),
            ));
        }
        if self.dataset.label_column.is_empty() {
            return Err(RookeryError::Config("label_column is empty".to_string()));
        }
        for column in self
            .dataset
            .categorical_columns
            .iter()
            .chain(&self.dataset.numeric_columns)
        {
            if *column == self.dataset.label_column {
                return Err(RookeryError::Config(format!(
                    "label column '{}' cannot also be a feature",
                    column
                )));
            }
        }
        for (column, step) in &self.form.steps {
            if !(step.is_finite() && *step > 0.0) {
                return Err(RookeryError::Config(format!(
                    "step for '{}' must be a positive number",
                    column
                )));
            }
        }
        Ok(())
    }
}

/// Which columns of the dataset play which role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub categorical_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub label_column: String,
    pub parser: ParserConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            categorical_columns: vec!["island".into(), "gender".into()],
            numeric_columns: vec![
                "culmen_length_mm".into(),
                "culmen_depth_mm".into(),
                "flipper_length_mm".into(),
                "body_mass_g".into(),
            ],
            label_column: "species".into(),
            parser: ParserConfig::default(),
        }
    }
}

impl DatasetConfig {
    /// Whether a column is declared as a feature.
    pub fn is_feature(&self, name: &str) -> bool {
        self.categorical_columns.iter().any(|c| c == name)
            || self.numeric_columns.iter().any(|c| c == name)
    }
}

/// Input widget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Widget step per numeric column.
    pub steps: IndexMap<String, f64>,
    /// Step for numeric columns without an entry in `steps`.
    pub default_step: f64,
    /// Whether numeric bounds are enforced.
    pub bounds: BoundsPolicy,
}

impl Default for FormConfig {
    fn default() -> Self {
        let mut steps = IndexMap::new();
        steps.insert("culmen_length_mm".to_string(), 5.0);
        steps.insert("culmen_depth_mm".to_string(), 2.0);
        steps.insert("flipper_length_mm".to_string(), 10.0);
        steps.insert("body_mass_g".to_string(), 200.0);

        Self {
            steps,
            default_step: 1.0,
            bounds: BoundsPolicy::Strict,
        }
    }
}

impl FormConfig {
    /// Widget step for a numeric column.
    pub fn step_for(&self, column: &str) -> f64 {
        self.steps.get(column).copied().unwrap_or(self.default_step)
    }
}

/// Explanation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    pub attribution: AttributionConfig,
    pub anchor: AnchorConfig,
    /// Number of reference rows to keep (None = the whole dataset).
    pub reference_sample: Option<usize>,
    /// Seed for reference sampling.
    pub seed: u64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            attribution: AttributionConfig::default(),
            anchor: AnchorConfig::default(),
            reference_sample: None,
            seed: 42,
        }
    }
}

/// Columns and links used by the dataset overview page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewConfig {
    /// Column whose per-class density is plotted.
    pub density_column: String,
    pub scatter_x: String,
    pub scatter_y: String,
    /// Column summarized by box statistics.
    pub box_column: String,
    /// Column that splits each class into box groups.
    pub box_group: String,
    /// Number of raw rows shown in the preview table.
    pub preview_rows: usize,
    /// Reference page per class label.
    pub links: IndexMap<String, String>,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        let mut links = IndexMap::new();
        links.insert(
            "Adelie".to_string(),
            "https://en.wikipedia.org/wiki/Adélie_penguin".to_string(),
        );
        links.insert(
            "Chinstrap".to_string(),
            "https://en.wikipedia.org/wiki/Chinstrap_penguin".to_string(),
        );
        links.insert(
            "Gentoo".to_string(),
            "https://en.wikipedia.org/wiki/Gentoo_penguin".to_string(),
        );

        Self {
            density_column: "flipper_length_mm".into(),
            scatter_x: "culmen_length_mm".into(),
            scatter_y: "culmen_depth_mm".into(),
            box_column: "body_mass_g".into(),
            box_group: "gender".into(),
            preview_rows: 20,
            links,
        }
    }
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on one explain request, including rule search.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            request_timeout_secs: 30,
        }
    }
}
