//! Argument resolution and pipeline orchestration for the sgember CLI.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser, error::ErrorKind};
use thiserror::Error;
use tracing::{Span, field, info, instrument, warn};

use sgember_core::{
    EmbeddingEngine, EngineError, ExportError, ExportFormat, GraphSource, GraphSourceError,
    Params, ParamsBuilder, ParamsError, RayonPool, SgdEngine, WorkerPool, WorkerPoolError,
    export_to_path, load_seed, resolve_workers,
};
use sgember_providers_mtx::MtxSource;

/// Destination used when `-o` is not supplied.
pub const DEFAULT_OUTPUT: &str = "embedding.txt";

/// Command-line surface parsed by [`clap`].
///
/// The automatic short help flag is disabled so `-h` can carry the gradient
/// step size, mirroring the getopt option string the driver grew out of;
/// `--help` still works.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "sgember",
    about = "Embed a sparse affinity graph into low-dimensional coordinates.",
    disable_help_flag = true
)]
pub struct Cli {
    /// Graph regularization factor.
    #[arg(short = 'l', long = "lambda")]
    pub lambda: Option<f64>,

    /// Embedding dimensionality.
    #[arg(short = 'd', long = "dim")]
    pub dim: Option<usize>,

    /// Early-exaggeration factor.
    #[arg(short = 'a', long = "alpha")]
    pub alpha: Option<f64>,

    /// Iteration budget.
    #[arg(short = 'm', long = "max-iter")]
    pub max_iters: Option<usize>,

    /// Early-exaggeration iteration count.
    #[arg(short = 'e', long = "early-iter")]
    pub early_iters: Option<usize>,

    /// Gradient step size.
    #[arg(short = 'h', long = "step")]
    pub step: Option<f64>,

    /// Worker count; zero lets the pool decide.
    #[arg(short = 'p', long = "workers")]
    pub workers: Option<usize>,

    /// Destination for the exported embedding. A `.bin` extension selects
    /// the flat binary format; anything else selects text.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Initial-embedding seed file (whitespace-separated values, row-major).
    #[arg(short = 'i', long = "initial")]
    pub initial: Option<PathBuf>,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,

    /// Path to the affinity graph in Matrix Market coordinate format.
    pub input: PathBuf,
}

/// Errors surfaced while resolving arguments or executing the pipeline.
#[derive(Debug, Error)]
pub enum CliError {
    /// The required graph path was absent or looked like a flag.
    #[error("no input graph supplied")]
    MissingInput,
    /// A recognized flag carried a value that failed to parse.
    #[error("invalid flag value: {message}")]
    InvalidFlagValue {
        /// Diagnostic naming the flag and the rejected value.
        message: String,
    },
    /// Argument parsing failed for another reason.
    #[error("{0}")]
    Usage(Box<clap::Error>),
    /// Help was requested; not a failure.
    #[error("help requested")]
    Help(Box<clap::Error>),
    /// The graph could not be loaded.
    #[error("failed to load graph from `{path}`")]
    Graph {
        /// Input path that failed to load.
        path: PathBuf,
        /// Underlying loader error.
        #[source]
        source: GraphSourceError,
    },
    /// Parameter validation failed.
    #[error(transparent)]
    Params(#[from] ParamsError),
    /// The worker pool could not be built.
    #[error(transparent)]
    Pool(#[from] WorkerPoolError),
    /// The embedding computation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The result could not be exported.
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl CliError {
    /// Return the stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingInput => "CLI_MISSING_INPUT",
            Self::InvalidFlagValue { .. } => "CLI_INVALID_FLAG_VALUE",
            Self::Usage(_) => "CLI_USAGE",
            Self::Help(_) => "CLI_HELP",
            Self::Graph { source, .. } => source.code(),
            Self::Params(inner) => inner.code(),
            Self::Pool(inner) => inner.code(),
            Self::Engine(inner) => inner.code(),
            Self::Export(inner) => inner.code(),
        }
    }
}

/// What a successful run produced, for rendering to stdout.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Number of embedded nodes.
    pub nodes: usize,
    /// Embedding dimensionality.
    pub dim: usize,
    /// Worker count honoured by the pool.
    pub workers: usize,
    /// Where the embedding was written.
    pub output: PathBuf,
}

enum Scan {
    Keep,
    KeepWithValue,
    Drop,
}

fn scan_flag(token: &str) -> Scan {
    const SHORTS: &[char] = &['l', 'd', 'a', 'm', 'e', 'h', 'p', 'o', 'i'];
    const LONGS: &[&str] = &[
        "lambda",
        "dim",
        "alpha",
        "max-iter",
        "early-iter",
        "step",
        "workers",
        "output",
        "initial",
    ];
    if let Some(rest) = token.strip_prefix("--") {
        let (name, has_inline_value) = match rest.split_once('=') {
            Some((name, _)) => (name, true),
            None => (rest, false),
        };
        if name == "help" {
            return Scan::Keep;
        }
        if LONGS.contains(&name) {
            return if has_inline_value {
                Scan::Keep
            } else {
                Scan::KeepWithValue
            };
        }
        return Scan::Drop;
    }
    let mut chars = token.chars();
    chars.next();
    match chars.next() {
        Some(short) if SHORTS.contains(&short) => {
            // `-d 2` needs the next token; `-d2` and `-d=2` are
            // self-contained.
            if chars.next().is_none() {
                Scan::KeepWithValue
            } else {
                Scan::Keep
            }
        }
        _ => Scan::Drop,
    }
}

/// Resolves the raw argument vector (without the program name) into a
/// [`Cli`].
///
/// The input graph path is the last argument and must not look like a
/// flag. Unrecognized flags are reported as warnings and dropped rather
/// than aborting the run; recognized flags with unparseable values are
/// fatal.
///
/// # Errors
/// Returns [`CliError::MissingInput`] when the graph path is absent or
/// flag-like, [`CliError::InvalidFlagValue`] for unparseable flag values,
/// [`CliError::Help`] when help was requested, and [`CliError::Usage`] for
/// other argument errors.
///
/// # Examples
/// ```
/// use sgember_cli::cli::resolve_args;
///
/// let cli = resolve_args(&["-d".into(), "3".into(), "graph.mtx".into()])
///     .expect("arguments are valid");
/// assert_eq!(cli.dim, Some(3));
/// assert_eq!(cli.input.to_str(), Some("graph.mtx"));
/// ```
pub fn resolve_args(args: &[String]) -> Result<Cli, CliError> {
    if args.iter().any(|arg| arg == "--help") {
        if let Err(err) = Cli::try_parse_from(["sgember", "--help"]) {
            return Err(CliError::Help(Box::new(err)));
        }
    }

    let Some(input) = args.last() else {
        return Err(CliError::MissingInput);
    };
    if input.starts_with('-') {
        return Err(CliError::MissingInput);
    }

    let body = &args[..args.len() - 1];
    let mut filtered: Vec<String> = Vec::with_capacity(args.len() + 1);
    filtered.push("sgember".to_owned());
    let mut index = 0;
    while index < body.len() {
        let token = &body[index];
        index += 1;
        if !token.starts_with('-') || token == "-" {
            filtered.push(token.clone());
            continue;
        }
        match scan_flag(token) {
            Scan::Keep => filtered.push(token.clone()),
            Scan::KeepWithValue => {
                filtered.push(token.clone());
                if index < body.len() {
                    filtered.push(body[index].clone());
                    index += 1;
                }
            }
            Scan::Drop => {
                warn!(flag = token.as_str(), "ignoring unrecognized flag");
            }
        }
    }
    filtered.push(input.clone());

    match Cli::try_parse_from(&filtered) {
        Ok(cli) => Ok(cli),
        Err(err) => Err(match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => CliError::Help(Box::new(err)),
            ErrorKind::ValueValidation | ErrorKind::InvalidValue => CliError::InvalidFlagValue {
                message: err.to_string(),
            },
            _ => CliError::Usage(Box::new(err)),
        }),
    }
}

/// Builds a validated [`Params`] record from the parsed surface.
///
/// # Errors
/// Returns [`ParamsError`] when a supplied value fails validation.
pub fn params_from_cli(cli: &Cli) -> Result<Params, ParamsError> {
    let mut builder = ParamsBuilder::new();
    if let Some(lambda) = cli.lambda {
        builder = builder.with_lambda(lambda);
    }
    if let Some(dim) = cli.dim {
        builder = builder.with_dim(dim);
    }
    if let Some(alpha) = cli.alpha {
        builder = builder.with_alpha(alpha);
    }
    if let Some(max_iters) = cli.max_iters {
        builder = builder.with_max_iters(max_iters);
    }
    if let Some(early_iters) = cli.early_iters {
        builder = builder.with_early_iters(early_iters);
    }
    if let Some(step) = cli.step {
        builder = builder.with_step(step);
    }
    if let Some(workers) = cli.workers {
        builder = builder.with_requested_workers(workers);
    }
    builder.build()
}

/// Executes the full pipeline with the production collaborators: a rayon
/// worker pool, the Matrix Market loader, and the baseline engine.
///
/// # Errors
/// Returns [`CliError`] when any pipeline stage fails.
pub fn run_cli(cli: &Cli) -> Result<RunOutcome, CliError> {
    let mut pool = RayonPool::new()?;
    let source = MtxSource::from_path(&cli.input);
    let engine = SgdEngine::new();
    run_pipeline(cli, &mut pool, &source, &engine)
}

/// Stages the pipeline: worker resolution, graph load, seed load, engine
/// invocation, export.
///
/// Stage ordering is load-bearing: the worker count is recorded before the
/// graph loads, and the seed buffer is sized from the node count the graph
/// reports. The graph and seed are dropped once the engine returns; the
/// embedding is dropped after export.
///
/// # Errors
/// Returns [`CliError`] when any pipeline stage fails.
#[instrument(
    name = "cli.run",
    err,
    skip_all,
    fields(
        input = %cli.input.display(),
        graph = field::Empty,
        nodes = field::Empty,
        workers = field::Empty,
    ),
)]
pub fn run_pipeline<P, G, E>(
    cli: &Cli,
    pool: &mut P,
    source: &G,
    engine: &E,
) -> Result<RunOutcome, CliError>
where
    P: WorkerPool,
    G: GraphSource,
    E: EmbeddingEngine + Sync,
{
    let mut params = params_from_cli(cli)?;
    resolve_workers(pool, &mut params);

    let span = Span::current();
    span.record("workers", field::display(params.effective_workers()));

    let graph = source.load().map_err(|source_err| CliError::Graph {
        path: cli.input.clone(),
        source: source_err,
    })?;
    params.record_nodes(graph.nodes());
    span.record("graph", field::display(source.name()));
    span.record("nodes", field::display(graph.nodes()));

    let seed = load_seed(cli.initial.as_deref(), graph.nodes(), params.dim().get());
    let embedding = pool.scope(|| engine.embed(&graph, &params, &seed))?;
    drop(seed);
    drop(graph);

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    export_to_path(&embedding, &output, ExportFormat::from_path(&output))?;

    info!(
        engine = engine.name(),
        nodes = params.nodes(),
        dim = params.dim().get(),
        workers = params.effective_workers(),
        output = %output.display(),
        "run completed"
    );
    Ok(RunOutcome {
        nodes: params.nodes(),
        dim: params.dim().get(),
        workers: params.effective_workers(),
        output,
    })
}

/// Renders `outcome` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use sgember_cli::cli::{RunOutcome, render_outcome};
///
/// let outcome = RunOutcome {
///     nodes: 4,
///     dim: 2,
///     workers: 1,
///     output: PathBuf::from("embedding.txt"),
/// };
/// let mut buffer = Vec::new();
/// render_outcome(&outcome, &mut buffer).expect("writing to a vec cannot fail");
/// let text = String::from_utf8(buffer).unwrap();
/// assert!(text.contains("nodes: 4"));
/// ```
pub fn render_outcome(outcome: &RunOutcome, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "nodes: {}", outcome.nodes)?;
    writeln!(writer, "dimensions: {}", outcome.dim)?;
    writeln!(writer, "workers: {}", outcome.workers)?;
    writeln!(writer, "output: {}", outcome.output.display())?;
    Ok(())
}
