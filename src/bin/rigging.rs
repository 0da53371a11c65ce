//! Rigging CLI Binary
//!
//! Command-line interface for the rigging execution kernel.

use clap::Parser;
use rigging::cli::{Cli, RunContext};
use rigging::config::ConfigLoader;
use rigging::error::KernelError;
use rigging::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    // Initialize logging early
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Rigging CLI starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx.with_color(!cli.no_color),
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", rigging::cli::map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output.text);
            process::exit(output.exit_code());
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", rigging::cli::map_error(&e));
            process::exit(error_exit_code(&e));
        }
    }
}

/// Usage errors exit with 2, everything else with 1.
fn error_exit_code(e: &KernelError) -> i32 {
    match e {
        KernelError::Usage(_) => 2,
        _ => 1,
    }
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }
    if cli.no_color {
        config.color = false;
    }

    config
}
