//! Rookery CLI - penguin species classifier with explanations.

mod cli;
mod commands;
mod server;
mod web;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = commands::load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Serve {
            inputs,
            host,
            port,
            no_open,
        } => commands::serve::run(config, inputs, host, port, no_open),

        Commands::Profile { inputs, json } => commands::profile::run(config, inputs, json),

        Commands::Predict {
            inputs,
            specimen,
            json,
        } => commands::predict::run(config, inputs, specimen, json),

        Commands::Explain {
            inputs,
            specimen,
            threshold,
            json,
            html,
        } => commands::explain::run(config, inputs, specimen, threshold, json, html),

        Commands::Overview { inputs, json, html } => {
            commands::overview::run(config, inputs, json, html)
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins unless `--verbose` asks for debug output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
