//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Rookery: classify penguin specimens and explain the predictions
#[derive(Parser)]
#[command(name = "rookery")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Dataset and pipeline artifact locations.
#[derive(Args, Clone, Debug)]
pub struct Inputs {
    /// Path to the dataset (CSV/TSV)
    #[arg(long, value_name = "FILE", default_value = "penguins.csv")]
    pub data: PathBuf,

    /// Path to the pipeline artifact (JSON)
    #[arg(long, value_name = "FILE", default_value = "penguin_clf.json")]
    pub model: PathBuf,
}

/// Feature values for one specimen.
#[derive(Args, Clone, Debug)]
pub struct Specimen {
    /// Feature value, repeatable (e.g. --set island=Biscoe). Unset features use
    /// the form defaults.
    #[arg(short = 's', long = "set", value_name = "FEATURE=VALUE", value_parser = parse_assignment)]
    pub values: Vec<(String, String)>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web dashboard
    Serve {
        #[command(flatten)]
        inputs: Inputs,

        /// Address to bind (overrides the configuration)
        #[arg(long)]
        host: Option<String>,

        /// Port for web server (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,

        /// Don't automatically open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Show the dataset profile the form and explainers are built from
    Profile {
        #[command(flatten)]
        inputs: Inputs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify one specimen
    Predict {
        #[command(flatten)]
        inputs: Inputs,

        #[command(flatten)]
        specimen: Specimen,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify one specimen and explain the prediction
    Explain {
        #[command(flatten)]
        inputs: Inputs,

        #[command(flatten)]
        specimen: Specimen,

        /// Precision a rule explanation must reach, in (0, 1]
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Output as JSON
        #[arg(long, conflicts_with = "html")]
        json: bool,

        /// Write the rendered dashboard page to a file
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,
    },

    /// Summarize the dataset: class balance and feature distributions
    Overview {
        #[command(flatten)]
        inputs: Inputs,

        /// Output as JSON
        #[arg(long, conflicts_with = "html")]
        json: bool,

        /// Write the rendered overview page to a file
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,
    },
}

/// Parse a `FEATURE=VALUE` pair.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("Expected FEATURE=VALUE, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("island=Biscoe"),
            Ok(("island".to_string(), "Biscoe".to_string()))
        );
        assert_eq!(
            parse_assignment(" body_mass_g = 4200 "),
            Ok(("body_mass_g".to_string(), "4200".to_string()))
        );
        assert!(parse_assignment("island").is_err());
        assert!(parse_assignment("=Biscoe").is_err());
    }

    #[test]
    fn test_explain_arguments() {
        let cli = Cli::parse_from([
            "rookery",
            "explain",
            "--data",
            "data.csv",
            "--set",
            "island=Dream",
            "-s",
            "gender=male",
            "--threshold",
            "0.9",
        ]);
        match cli.command {
            Commands::Explain {
                inputs,
                specimen,
                threshold,
                ..
            } => {
                assert_eq!(inputs.data, PathBuf::from("data.csv"));
                assert_eq!(inputs.model, PathBuf::from("penguin_clf.json"));
                assert_eq!(specimen.values.len(), 2);
                assert_eq!(threshold, Some(0.9));
            }
            _ => panic!("expected explain"),
        }
    }
}
