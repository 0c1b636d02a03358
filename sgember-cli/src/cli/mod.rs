//! Command-line interface orchestration for the sgember driver.
//!
//! Resolves the raw argument vector into a validated parameter set (with
//! getopt-compatible leniency for unknown flags), then stages the pipeline:
//! worker-pool resolution, graph load, optional seed load, engine
//! invocation, and export.

mod commands;

pub use commands::{
    Cli, CliError, DEFAULT_OUTPUT, RunOutcome, params_from_cli, render_outcome, resolve_args,
    run_cli, run_pipeline,
};

#[cfg(test)]
mod tests;
