mod app;
mod cli;
mod config;
mod logging;
mod modules;
mod output;
mod scanner;
mod utils;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use crate::app::{App, Request};
use crate::cli::Cli;
use crate::config::Config;
use crate::modules::{ModuleContext, ModuleRegistry};

#[tokio::main]
async fn main() -> ExitCode {
    output::print_header();

    if std::env::args_os().len() > 1 {
        let cli = Cli::parse();
        run_cli(cli).await
    } else {
        run_interactive().await
    }
}

async fn run_cli(cli: Cli) -> ExitCode {
    let app = match build_app(&cli) {
        Ok(app) => app,
        Err(e) => {
            output::print_error(&format!("Configuration error: {:#}", e));
            return ExitCode::FAILURE;
        }
    };

    let request = Request {
        module: cli.module,
        target: cli.target,
        ports: cli.ports,
        output: cli.output,
    };

    if app.execute(&request, true).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run_interactive() -> ExitCode {
    let app = match load_config(None).and_then(|config| start(config, false)) {
        Ok(app) => app,
        Err(e) => {
            output::print_error(&format!("Configuration error: {:#}", e));
            return ExitCode::FAILURE;
        }
    };

    match app.run_interactive(io::stdin().lock()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("Error: {}", e));
            error!(error = %e, "Interactive session failed");
            ExitCode::FAILURE
        }
    }
}

fn build_app(cli: &Cli) -> Result<App> {
    let mut config = load_config(cli.config.as_deref())?;

    if let Some(workers) = cli.workers {
        config.scan.workers = workers;
    }
    if let Some(timeout) = cli.timeout {
        config.scan.timeout_ms = timeout;
    }
    if cli.detailed {
        config.scan.detailed_status = true;
    }
    config.validate()?;

    start(config, cli.verbose)
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let mut config = Config::load(path)?;
    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Install logging, then build the module registry around the final config.
fn start(config: Config, verbose: bool) -> Result<App> {
    if let Err(e) = logging::initialize_logging(&config.logging, verbose) {
        output::print_warning(&format!("Logging disabled: {:#}", e));
    }

    let ctx = ModuleContext::new(config)?;
    Ok(App::new(ModuleRegistry::with_builtin(&ctx)))
}
