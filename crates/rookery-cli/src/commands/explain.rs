//! Explain command - classify one specimen and explain the prediction.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use rookery::explain::ClassAttribution;
use rookery::{
    AdditiveAttribution, BackendResult, ExplainRequest, HtmlPage, RequestOutcome, RookeryConfig,
    RuleExplanation, TableView,
};

use crate::cli::{Inputs, Specimen};

pub fn run(
    config: RookeryConfig,
    inputs: Inputs,
    specimen: Specimen,
    threshold: Option<f64>,
    json_output: bool,
    html: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = super::load_dashboard(config, &inputs)?;
    let values = super::specimen_values(&dashboard, &specimen);

    let mut request = dashboard.default_request();
    if let Some(threshold) = threshold {
        request = ExplainRequest { threshold };
    }
    request.validate()?;

    if let Some(path) = html {
        let mut page = HtmlPage::new("Penguin species classifier", values);
        let outcome = dashboard.render(&mut page, &request);
        fs::write(&path, page.finish())?;
        println!("{} {}", "Wrote".green().bold(), path.display());
        return outcome_result(&outcome);
    }

    let outcome = dashboard.handle(&values, &request);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return outcome_result(&outcome);
    }

    if let RequestOutcome::Explained {
        prediction, report, ..
    } = &outcome
    {
        println!(
            "{} {}{}",
            format!("Predicted {}:", dashboard.profile().label_column)
                .cyan()
                .bold(),
            prediction.class_label.white().bold(),
            super::confidence_suffix(prediction)
        );
        println!();
        super::print_table(&TableView::probabilities(
            prediction,
            &dashboard.profile().label_column,
        ));
        println!();

        println!("{}", "Feature attribution:".yellow().bold());
        match &report.attribution {
            BackendResult::Ready { explanation } => {
                print_attribution(explanation, &report.predicted_class)
            }
            BackendResult::Failed { error } => println!("  {} {}", "unavailable:".red(), error),
        }
        println!();

        println!(
            "{} {}",
            "Rule explanation".yellow().bold(),
            format!("(precision >= {:.2}):", request.threshold).yellow()
        );
        match &report.rule {
            BackendResult::Ready { explanation } => print_rule(explanation),
            BackendResult::Failed { error } => println!("  {} {}", "unavailable:".red(), error),
        }
    }

    outcome_result(&outcome)
}

/// Request-level failures become the command's error.
fn outcome_result(outcome: &RequestOutcome) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        RequestOutcome::Explained { .. } => Ok(()),
        RequestOutcome::Invalid { error } | RequestOutcome::ModelFailed { error } => {
            Err(error.clone().into())
        }
    }
}

fn print_attribution(attribution: &AdditiveAttribution, predicted: &str) {
    let Some(class) = attribution.for_class(predicted) else {
        return;
    };
    println!(
        "  {} base value {:.4}, output {:.4}",
        class.class_label.bold(),
        class.baseline,
        class.model_output
    );
    for (name, value, contribution) in ranked(attribution, class) {
        let shown = format!("{:+.4}", contribution);
        let shown = if contribution >= 0.0 {
            shown.red()
        } else {
            shown.blue()
        };
        println!("  {:20} {:>10}  {}", name, value, shown);
    }
}

/// Contributions by decreasing magnitude, with the feature's display value.
fn ranked<'a>(
    attribution: &'a AdditiveAttribution,
    class: &'a ClassAttribution,
) -> Vec<(&'a str, &'a str, f64)> {
    let mut rows: Vec<(&str, &str, f64)> = attribution
        .feature_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let value = attribution
                .feature_values
                .get(i)
                .map(|v| v.as_str())
                .unwrap_or("");
            let contribution = class.contributions.get(name).copied().unwrap_or(0.0);
            (name.as_str(), value, contribution)
        })
        .collect();
    rows.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
    rows
}

fn print_rule(rule: &RuleExplanation) {
    println!("  {}", rule.describe().white().bold());
    println!(
        "  precision {:.3}, coverage {:.3}, {} samples",
        rule.precision, rule.coverage, rule.samples_drawn
    );
}
