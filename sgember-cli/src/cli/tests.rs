//! Unit tests for argument resolution and pipeline staging.

use super::commands::{params_from_cli, resolve_args, run_cli, run_pipeline};
use super::{Cli, CliError};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rstest::rstest;
use tempfile::TempDir;

use sgember_core::{
    AffinityGraph, Embedding, EmbeddingEngine, EngineError, GraphSource, GraphSourceError,
    Params, WorkerPool,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// In-memory ring graph standing in for an on-disk loader.
struct StubSource {
    nodes: usize,
}

impl GraphSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    fn load(&self) -> Result<AffinityGraph, GraphSourceError> {
        let triplets = (0..self.nodes)
            .map(|i| (i, (i + 1) % self.nodes, 1.0))
            .collect();
        Ok(AffinityGraph::from_triplets(self.nodes, triplets)
            .expect("stub triplets are valid"))
    }
}

/// Loader that always fails, standing in for malformed input.
struct FailingSource;

impl GraphSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    fn load(&self) -> Result<AffinityGraph, GraphSourceError> {
        Err(GraphSourceError::Malformed {
            line: 1,
            message: "stubbed failure".to_owned(),
        })
    }
}

/// Engine returning a constant buffer, making exports byte-checkable.
struct FixedEngine {
    value: f64,
}

impl EmbeddingEngine for FixedEngine {
    fn name(&self) -> &str {
        "fixed"
    }

    fn embed(
        &self,
        graph: &AffinityGraph,
        params: &Params,
        _seed: &[f64],
    ) -> Result<Embedding, EngineError> {
        let extent = graph.nodes() * params.dim().get();
        Ok(Embedding::from_coords(vec![self.value; extent], graph.nodes(), params.dim().get())
            .expect("stub extent is correct"))
    }
}

/// Engine that records the seed buffer it was handed.
struct RecordingEngine {
    seen_seed: Mutex<Option<Vec<f64>>>,
}

impl RecordingEngine {
    fn new() -> Self {
        Self {
            seen_seed: Mutex::new(None),
        }
    }
}

impl EmbeddingEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn embed(
        &self,
        graph: &AffinityGraph,
        params: &Params,
        seed: &[f64],
    ) -> Result<Embedding, EngineError> {
        *self.seen_seed.lock().expect("lock is never poisoned") = Some(seed.to_vec());
        let extent = graph.nodes() * params.dim().get();
        Ok(Embedding::from_coords(vec![0.0; extent], graph.nodes(), params.dim().get())
            .expect("stub extent is correct"))
    }
}

/// Pool that honours every request verbatim.
struct FakePool {
    size: usize,
}

impl WorkerPool for FakePool {
    fn effective(&self) -> usize {
        self.size
    }

    fn request(&mut self, workers: usize) {
        self.size = workers;
    }
}

fn resolve(args: &[&str]) -> Result<Cli, CliError> {
    let owned: Vec<String> = args.iter().map(|&arg| arg.to_owned()).collect();
    resolve_args(&owned)
}

fn cli_with_output(output: &Path) -> Cli {
    let mut cli = resolve(&["stub.mtx"]).expect("minimal arguments are valid");
    cli.output = Some(output.to_path_buf());
    cli
}

#[rstest]
#[case::separate(&["-d", "4", "graph.mtx"], Some(4))]
#[case::attached(&["-d4", "graph.mtx"], Some(4))]
#[case::long_form(&["--dim", "5", "graph.mtx"], Some(5))]
#[case::long_inline(&["--dim=6", "graph.mtx"], Some(6))]
#[case::absent(&["graph.mtx"], None)]
fn dim_flag_resolves(#[case] args: &[&str], #[case] expected: Option<usize>) -> TestResult {
    let cli = resolve(args)?;
    assert_eq!(cli.dim, expected);
    let params = params_from_cli(&cli)?;
    assert_eq!(params.dim().get(), expected.unwrap_or(2));
    Ok(())
}

#[rstest]
fn every_flag_reaches_the_parameter_set() -> TestResult {
    let cli = resolve(&[
        "-l", "0.5", "-a", "6.0", "-m", "100", "-e", "25", "-h", "0.1", "-p", "3",
        "graph.mtx",
    ])?;
    let params = params_from_cli(&cli)?;
    assert_eq!(params.lambda(), 0.5);
    assert_eq!(params.alpha(), 6.0);
    assert_eq!(params.max_iters(), 100);
    assert_eq!(params.early_iters(), 25);
    assert_eq!(params.step(), 0.1);
    assert_eq!(params.requested_workers(), 3);
    Ok(())
}

#[rstest]
#[case::empty(&[])]
#[case::only_flags(&["-d", "2", "-l"])]
#[case::trailing_flag(&["graph.mtx", "-z"])]
fn missing_input_is_rejected(#[case] args: &[&str]) {
    let err = resolve(args).expect_err("absent or flag-like input must fail");
    assert!(matches!(err, CliError::MissingInput));
    assert_eq!(err.code(), "CLI_MISSING_INPUT");
}

#[rstest]
#[case(&["-d", "abc", "graph.mtx"])]
#[case(&["-l", "much", "graph.mtx"])]
#[case(&["--max-iter", "1.5", "graph.mtx"])]
fn malformed_numeric_values_are_fatal(#[case] args: &[&str]) {
    let err = resolve(args).expect_err("unparseable flag value must fail");
    assert!(matches!(err, CliError::InvalidFlagValue { .. }));
    assert_eq!(err.code(), "CLI_INVALID_FLAG_VALUE");
}

#[rstest]
#[case(&["-z", "graph.mtx"])]
#[case(&["--bogus=3", "graph.mtx"])]
#[case(&["-z", "-d", "4", "graph.mtx"])]
fn unknown_flags_are_dropped_with_a_warning(#[case] args: &[&str]) -> TestResult {
    let cli = resolve(args)?;
    assert_eq!(cli.input, PathBuf::from("graph.mtx"));
    // Dropped flags must not disturb recognized settings or defaults.
    let params = params_from_cli(&cli)?;
    assert_eq!(params.lambda(), 1.0);
    assert_eq!(params.max_iters(), 1000);
    Ok(())
}

#[rstest]
fn help_is_reported_as_help() {
    let err = resolve(&["--help"]).expect_err("help must short-circuit");
    assert!(matches!(err, CliError::Help(_)));
}

#[rstest]
fn step_flag_uses_the_short_h() -> TestResult {
    let cli = resolve(&["-h", "0.25", "graph.mtx"])?;
    assert_eq!(cli.step, Some(0.25));
    Ok(())
}

#[rstest]
fn effective_workers_follow_the_pool() -> TestResult {
    let dir = TempDir::new()?;
    let mut cli = cli_with_output(&dir.path().join("out.txt"));
    cli.workers = Some(3);
    let mut pool = FakePool { size: 1 };
    let outcome = run_pipeline(&cli, &mut pool, &StubSource { nodes: 4 }, &FixedEngine {
        value: 1.0,
    })?;
    assert_eq!(outcome.workers, 3);
    assert_eq!(outcome.workers, pool.effective());
    Ok(())
}

#[rstest]
fn fixed_engine_export_is_byte_exact() -> TestResult {
    let dir = TempDir::new()?;
    let output = dir.path().join("out.txt");
    let cli = cli_with_output(&output);
    let mut pool = FakePool { size: 1 };
    let outcome = run_pipeline(&cli, &mut pool, &StubSource { nodes: 4 }, &FixedEngine {
        value: 1.0,
    })?;
    assert_eq!(outcome.nodes, 4);
    assert_eq!(outcome.dim, 2);
    let text = fs::read_to_string(&output)?;
    assert_eq!(text, "1 1\n1 1\n1 1\n1 1\n");
    Ok(())
}

#[rstest]
fn bin_extension_selects_the_binary_format() -> TestResult {
    let dir = TempDir::new()?;
    let output = dir.path().join("out.bin");
    let cli = cli_with_output(&output);
    let mut pool = FakePool { size: 1 };
    run_pipeline(&cli, &mut pool, &StubSource { nodes: 4 }, &FixedEngine { value: 1.0 })?;
    let bytes = fs::read(&output)?;
    assert_eq!(bytes.len(), 4 * 2 * 8);
    let first = f64::from_le_bytes(bytes[0..8].try_into()?);
    assert_eq!(first, 1.0);
    Ok(())
}

#[rstest]
fn unknown_flag_still_reaches_export() -> TestResult {
    let dir = TempDir::new()?;
    let output = dir.path().join("out.txt");
    let mut cli = resolve(&["-z", "stub.mtx"])?;
    cli.output = Some(output.clone());
    let mut pool = FakePool { size: 1 };
    let outcome = run_pipeline(&cli, &mut pool, &StubSource { nodes: 4 }, &FixedEngine {
        value: 1.0,
    })?;
    assert_eq!(outcome.dim, 2);
    assert!(output.exists());
    Ok(())
}

#[rstest]
fn seed_file_reaches_the_engine_sized_by_the_graph() -> TestResult {
    let dir = TempDir::new()?;
    let seed_path = dir.path().join("seed.txt");
    fs::write(&seed_path, "1 2 3 4 5 6 7 8")?;
    let mut cli = cli_with_output(&dir.path().join("out.txt"));
    cli.initial = Some(seed_path);
    let engine = RecordingEngine::new();
    let mut pool = FakePool { size: 1 };
    run_pipeline(&cli, &mut pool, &StubSource { nodes: 4 }, &engine)?;
    let seen = engine
        .seen_seed
        .lock()
        .expect("lock is never poisoned")
        .clone()
        .expect("engine must have been invoked");
    assert_eq!(seen, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    Ok(())
}

#[rstest]
fn absent_seed_reaches_the_engine_as_zero_fill() -> TestResult {
    let dir = TempDir::new()?;
    let cli = cli_with_output(&dir.path().join("out.txt"));
    let engine = RecordingEngine::new();
    let mut pool = FakePool { size: 1 };
    run_pipeline(&cli, &mut pool, &StubSource { nodes: 3 }, &engine)?;
    let seen = engine
        .seen_seed
        .lock()
        .expect("lock is never poisoned")
        .clone()
        .expect("engine must have been invoked");
    assert_eq!(seen, vec![0.0; 6]);
    Ok(())
}

#[rstest]
fn graph_load_failure_is_fatal() -> TestResult {
    let dir = TempDir::new()?;
    let cli = cli_with_output(&dir.path().join("out.txt"));
    let mut pool = FakePool { size: 1 };
    let err = run_pipeline(&cli, &mut pool, &FailingSource, &FixedEngine { value: 1.0 })
        .expect_err("loader failure must abort the run");
    assert!(matches!(err, CliError::Graph { .. }));
    assert_eq!(err.code(), "GRAPH_SOURCE_MALFORMED");
    Ok(())
}

#[rstest]
fn zero_dimension_is_rejected_before_any_io() -> TestResult {
    let dir = TempDir::new()?;
    let output = dir.path().join("out.txt");
    let mut cli = cli_with_output(&output);
    cli.dim = Some(0);
    let mut pool = FakePool { size: 1 };
    let err = run_pipeline(&cli, &mut pool, &StubSource { nodes: 4 }, &FixedEngine {
        value: 1.0,
    })
    .expect_err("zero dimension must fail");
    assert_eq!(err.code(), "PARAMS_INVALID_DIMENSION");
    assert!(!output.exists());
    Ok(())
}

#[rstest]
fn end_to_end_with_the_production_collaborators() -> TestResult {
    let dir = TempDir::new()?;
    let graph_path = dir.path().join("affinities.mtx");
    fs::write(
        &graph_path,
        "%%MatrixMarket matrix coordinate real symmetric\n\
         4 4 4\n\
         2 1 1.0\n\
         3 2 1.0\n\
         4 3 1.0\n\
         4 1 1.0\n",
    )?;
    let output = dir.path().join("out.txt");
    let cli = resolve(&[
        "-m",
        "20",
        "-e",
        "5",
        "-o",
        output.to_str().ok_or("path is UTF-8")?,
        graph_path.to_str().ok_or("path is UTF-8")?,
    ])?;
    let outcome = run_cli(&cli)?;
    assert_eq!(outcome.nodes, 4);
    assert_eq!(outcome.dim, 2);
    let text = fs::read_to_string(&output)?;
    assert_eq!(text.lines().count(), 4);
    for line in text.lines() {
        assert_eq!(line.split_whitespace().count(), 2);
        for token in line.split_whitespace() {
            token.parse::<f64>()?;
        }
    }
    Ok(())
}
