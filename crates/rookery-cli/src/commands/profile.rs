//! Profile command - show what the dashboard learned from the dataset.

use colored::Colorize;
use rookery::{Classifier, RookeryConfig};

use crate::cli::Inputs;

pub fn run(
    config: RookeryConfig,
    inputs: Inputs,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = super::load_dashboard(config, &inputs)?;
    let profile = dashboard.profile();

    if json_output {
        let output = serde_json::json!({
            "source": dashboard.source(),
            "profile": profile,
            "reference_rows": dashboard.reference().n_rows(),
            "classifier": dashboard.pipeline().classifier.name(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if let Some(source) = dashboard.source() {
        println!(
            "{} {}",
            "Dataset profile for".cyan().bold(),
            source.file.white()
        );
        println!(
            "  {} rows, {} columns, {}",
            source.row_count, source.column_count, source.hash
        );
    }
    println!(
        "  Classifier: {} over {} reference rows",
        dashboard.pipeline().classifier.name(),
        dashboard.reference().n_rows()
    );
    println!();

    println!("{}", "Feature order:".yellow().bold());
    println!("  {}", profile.feature_order.join(", "));
    println!();

    println!("{}", "Categorical features:".yellow().bold());
    for (column, domain) in &profile.categorical_domains {
        println!("  {:20} {}", column, domain.join(", "));
    }
    println!();

    println!("{}", "Numeric features:".yellow().bold());
    for (column, stats) in &profile.numeric_statistics {
        println!(
            "  {:20} {:>9.2} .. {:<9.2} mean {:.2}, sd {:.2}",
            column, stats.min, stats.max, stats.mean, stats.std
        );
    }
    println!();

    println!(
        "{} {}",
        format!("Classes ({}):", profile.label_column).yellow().bold(),
        profile.class_labels.join(", ")
    );

    Ok(())
}
