//! Serve command - run the web dashboard.

use colored::Colorize;
use rookery::RookeryConfig;

use crate::cli::Inputs;
use crate::server::{app, state::AppState};

pub fn run(
    mut config: RookeryConfig,
    inputs: Inputs,
    host: Option<String>,
    port: Option<u16>,
    no_open: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let dashboard = super::load_dashboard(config, &inputs)?;
    let server = dashboard.config().server.clone();
    let state = AppState::new(dashboard);

    let url = format!("http://{}:{}", server.host, server.port);
    println!();
    println!(
        "{} {}",
        "Starting dashboard at".cyan().bold(),
        url.white().bold()
    );
    println!();
    println!("  Data: {}", inputs.data.display());
    println!("  Model: {}", inputs.model.display());
    println!();
    println!("Press {} to stop the server", "Ctrl+C".yellow().bold());
    println!();

    if !no_open {
        if let Err(e) = open::that(&url) {
            eprintln!("{} Could not open browser: {}", "Warning:".yellow(), e);
        }
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(app::run_server(state, &server.host, server.port))?;

    println!("{}", "Shut down.".yellow());
    Ok(())
}
