//! Predict command - classify one specimen.

use colored::Colorize;
use rookery::{RookeryConfig, TableView};

use crate::cli::{Inputs, Specimen};

pub fn run(
    config: RookeryConfig,
    inputs: Inputs,
    specimen: Specimen,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = super::load_dashboard(config, &inputs)?;
    let values = super::specimen_values(&dashboard, &specimen);

    let record = dashboard.collect(&values)?;
    let prediction = dashboard.predict(&record)?;

    if json_output {
        let output = serde_json::json!({
            "record": record,
            "prediction": prediction,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Specimen:".yellow().bold());
    for (column, value) in record.iter() {
        println!("  {:20} {}", column, value);
    }
    println!();

    println!(
        "{} {}{}",
        format!("Predicted {}:", dashboard.profile().label_column)
            .cyan()
            .bold(),
        prediction.class_label.white().bold(),
        super::confidence_suffix(&prediction)
    );
    println!();
    super::print_table(&TableView::probabilities(
        &prediction,
        &dashboard.profile().label_column,
    ));

    Ok(())
}
