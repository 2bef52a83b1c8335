//! nnbringup core: Runtime traits, Pipeline, and Data Model
//!
//! Staged bring-up of a trainable model: create, load, compile, initialize,
//! report shapes, summarize. Each stage only runs after the previous one
//! succeeded and the first failure ends the run.

pub mod stage;
pub mod runner;
pub mod runtime;
pub mod data_model;
pub mod error;
pub mod context;

pub use stage::{PipelineStage, PipelineState};
pub use runner::BringupPipeline;
pub use runtime::{ModelHandle, ModelRuntime, RuntimeError};
pub use data_model::{
    BringupReport, ModelFormat, ModelKind, Seed, ShapeDescriptor, StageRecord, SummaryLevel,
};
pub use context::ExecutionContext;
pub use error::{BringupError, ExitStatus};

/// Engine version reported by the CLI
pub const NNBRINGUP_VERSION: &str = env!("CARGO_PKG_VERSION");
