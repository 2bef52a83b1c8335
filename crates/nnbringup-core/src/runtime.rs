//! Model Runtime contract: the capabilities the pipeline drives
use std::io::Write;
use std::path::Path;
use thiserror::Error;

use crate::data_model::{ModelFormat, ModelKind, Seed, ShapeDescriptor, SummaryLevel};

/// Failure reported by a runtime. The pipeline classifies it by stage.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Factory side of a runtime
pub trait ModelRuntime {
    type Model: ModelHandle;

    /// Create an empty model of the requested kind
    fn create_model(&self, kind: ModelKind) -> Result<Self::Model, RuntimeError>;
}

/// One trainable model instance, mutated in place by each stage
pub trait ModelHandle {
    /// Populate the layer graph and hyperparameters from `path`
    fn load(&mut self, path: &Path, format: ModelFormat) -> Result<(), RuntimeError>;

    /// Validate and finalize the graph (connectivity, shape inference)
    fn compile(&mut self) -> Result<(), RuntimeError>;

    /// Allocate and fill trainable state
    fn initialize(&mut self, seed: Seed) -> Result<(), RuntimeError>;

    /// Input shapes in declaration order. Meaningful once initialized.
    fn input_dimensions(&self) -> Vec<ShapeDescriptor>;

    /// Output shapes in declaration order. Meaningful once initialized.
    fn output_dimensions(&self) -> Vec<ShapeDescriptor>;

    /// Write a textual report of the given detail level to `sink`
    fn summarize(&self, sink: &mut dyn Write, level: SummaryLevel) -> Result<(), RuntimeError>;
}
