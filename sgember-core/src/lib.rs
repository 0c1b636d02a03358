//! Sgember core library: configuration resolution and data staging for
//! sparse-graph embedding runs.

mod embedding;
mod engine;
mod error;
mod export;
mod graph;
mod params;
mod seed;
mod workers;

pub use crate::{
    embedding::{Embedding, ShapeMismatch},
    engine::{EmbeddingEngine, SgdEngine},
    error::{
        EngineError, ExportError, GraphError, GraphSourceError, ParamsError, WorkerPoolError,
    },
    export::{ExportFormat, export_to_path, write_binary, write_text},
    graph::{AffinityGraph, GraphSource},
    params::{Params, ParamsBuilder},
    seed::load_seed,
    workers::{RayonPool, WorkerPool, resolve_workers},
};
