//! Stratum CLI Binary
//!
//! Command-line interface for layered skill discovery, validation, and authoring.

use clap::Parser;
use stratum::logging::{init_logging, LogOutput, LoggingConfig};
use stratum::tooling::cli::{Cli, CliContext};
use std::process;

fn logging_config(cli: &Cli, base: &LoggingConfig) -> LoggingConfig {
    let mut config = base.clone();
    if cli.verbose {
        config.level = "debug".to_string();
        config.output = LogOutput::Stderr;
    }
    if let Some(level) = &cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.format = format;
    }
    if let Some(output) = cli.log_output {
        config.output = output;
    }
    if let Some(file) = &cli.log_file {
        config.file = Some(file.clone());
    }
    config
}

fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let logging = logging_config(&cli, &context.config().logging);
    if let Err(e) = init_logging(&logging) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
