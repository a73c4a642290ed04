//! CLI command implementations.

pub mod explain;
pub mod overview;
pub mod predict;
pub mod profile;
pub mod serve;

use std::path::Path;

use colored::Colorize;
use rookery::{Dashboard, FormValues, Prediction, RookeryConfig, TableView};

use crate::cli::{Inputs, Specimen};

/// Configuration from the `--config` file, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<RookeryConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            Ok(RookeryConfig::load(path)?)
        }
        None => Ok(RookeryConfig::default()),
    }
}

/// Load the dataset and pipeline named on the command line.
pub fn load_dashboard(
    config: RookeryConfig,
    inputs: &Inputs,
) -> Result<Dashboard, Box<dyn std::error::Error>> {
    Ok(Dashboard::load(config, &inputs.data, &inputs.model)?)
}

/// Values given with `--set`, completed with the form defaults.
pub fn specimen_values(dashboard: &Dashboard, specimen: &Specimen) -> FormValues {
    specimen
        .values
        .iter()
        .cloned()
        .collect::<FormValues>()
        .with_defaults(dashboard.form_spec())
}

/// ` (probability 0.912)` after the predicted label, when known.
pub fn confidence_suffix(prediction: &Prediction) -> String {
    prediction
        .confidence()
        .map(|p| format!(" (probability {:.3})", p))
        .unwrap_or_default()
}

/// Print a table with padded columns.
pub fn print_table(table: &TableView) {
    let widths: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("  {}", line(&table.headers).bold());
    for row in &table.rows {
        println!("  {}", line(row));
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rookery::{DataLoadError, RookeryError};

    use super::*;

    #[test]
    fn test_missing_dataset_reports_load_error() {
        let inputs = Inputs {
            data: PathBuf::from("/nonexistent/penguins.csv"),
            model: PathBuf::from("/nonexistent/penguin_clf.json"),
        };
        let Err(err) = load_dashboard(RookeryConfig::default(), &inputs) else {
            panic!("loading a missing dataset should fail");
        };
        let err = err.downcast_ref::<RookeryError>().expect("rookery error");
        match err {
            RookeryError::DataLoad(DataLoadError::Io { path, .. }) => {
                assert_eq!(path, &PathBuf::from("/nonexistent/penguins.csv"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().contains("/nonexistent/penguins.csv"));
    }

    #[test]
    fn test_confidence_suffix() {
        let prediction: Prediction = serde_json::from_value(serde_json::json!({
            "class_index": 1,
            "class_label": "Gentoo",
            "probabilities": {"Adelie": 0.25, "Gentoo": 0.75}
        }))
        .unwrap();
        assert_eq!(confidence_suffix(&prediction), " (probability 0.750)");

        let unknown = Prediction {
            class_index: 5,
            ..prediction
        };
        assert_eq!(confidence_suffix(&unknown), "");
    }
}
