//! Reference Model Runtime
//!
//! Loads INI topologies, infers shapes, allocates seeded weights and writes
//! layer/model/tensor summaries. Implements the runtime contract from
//! `nnbringup-core`, so the bring-up pipeline can drive it directly.
//!
//! # Flow
//!
//! ```text
//! INI text → IniDocument → ModelDescription → CompiledGraph → weights
//!              (load)          (load)            (compile)    (initialize)
//! ```

pub mod description;
pub mod error;
pub mod graph;
pub mod layer;
pub mod model;
mod props;
pub mod summary;
pub mod tensor;

pub use description::{Loss, ModelDescription, OptimizerKind, OptimizerSpec, TrainingProps};
pub use error::NetError;
pub use graph::CompiledGraph;
pub use layer::{Activation, Initializer, LayerKind, LayerSpec};
pub use model::NeuralNetwork;
pub use tensor::Tensor;

use nnbringup_core::{ModelKind, ModelRuntime, RuntimeError};

/// Runtime producing [`NeuralNetwork`] handles
#[derive(Debug, Clone, Copy, Default)]
pub struct NeuralNetRuntime;

impl NeuralNetRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl ModelRuntime for NeuralNetRuntime {
    type Model = NeuralNetwork;

    fn create_model(&self, kind: ModelKind) -> Result<NeuralNetwork, RuntimeError> {
        match kind {
            ModelKind::NeuralNet => {
                tracing::debug!(%kind, "model created");
                Ok(NeuralNetwork::new(kind))
            }
            other => Err(NetError::Unsupported(format!("model kind {}", other)).into()),
        }
    }
}
