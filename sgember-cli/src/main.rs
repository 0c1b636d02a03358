//! CLI entry point for the sgember embedding driver.
//!
//! Resolves command-line arguments, executes the staging pipeline, renders
//! the outcome to stdout, and maps errors to exit codes. Logging is
//! initialized eagerly so subsequent operations can emit structured
//! diagnostics via `tracing`.

use std::env;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};

use sgember_cli::{
    cli::{CliError, render_outcome, resolve_args, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

/// Resolve arguments, execute the pipeline, render the outcome, and flush
/// the output stream.
fn try_main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let cli = resolve_args(&args)?;
    let outcome = run_cli(&cli).context("failed to execute run")?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    render_outcome(&outcome, &mut writer).context("failed to render outcome")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        if let Some(CliError::Help(help)) = err.downcast_ref::<CliError>() {
            if help.print().is_err() {
                return ExitCode::FAILURE;
            }
            return ExitCode::SUCCESS;
        }

        let code_field = err
            .downcast_ref::<CliError>()
            .map(|cli_error| field::display(cli_error.code()));
        error!(error = %err, code = code_field, "run failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
