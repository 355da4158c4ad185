//! Trust-boundary sanitizer binary entry point.
//!
//! Reads one input from stdin, sanitizes it with the selected command and
//! writes the result to stdout. All logs go to stderr.

use std::io::Write;
use std::process::ExitCode;

use trust_boundary::cli::{read_input, Command, USAGE};
use trust_boundary::config::Config;
use trust_boundary::error::AppError;
use trust_boundary::Sanitizer;

fn main() -> ExitCode {
    // Load configuration from environment before logging so LOG_LEVEL applies
    let config = Config::from_env();
    let log_level = config
        .as_ref()
        .map_or_else(|_| "info".to_string(), |c| c.log_level.clone());

    // Initialize logging to stderr only (stdout carries results)
    tracing_subscriber::fmt()
        .with_env_filter(
            log_level
                .parse()
                .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(&config, &command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("trust-boundary failed: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(config: &Config, command: &Command) -> Result<ExitCode, AppError> {
    let sanitizer = Sanitizer::from_config(config)?;

    let input = if command.reads_input() {
        read_input(std::io::stdin().lock())?
    } else {
        String::new()
    };
    tracing::debug!(?command, input_bytes = input.len(), "Running command");

    let output = command.execute(&sanitizer, &input)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output.stdout)?;
    stdout.flush()?;

    Ok(ExitCode::from(u8::try_from(output.exit_code).unwrap_or(1)))
}
