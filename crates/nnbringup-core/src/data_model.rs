//! Data Model: shapes, model selectors, seed and the run report
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stage::PipelineStage;

/// Structural shape of a tensor, batch first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    pub batch: usize,
    pub channel: usize,
    pub height: usize,
    pub width: usize,
}

impl ShapeDescriptor {
    pub const fn new(batch: usize, channel: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            channel,
            height,
            width,
        }
    }

    /// Elements of a single sample (channel × height × width); `None` on
    /// overflow
    pub fn feature_len(&self) -> Option<usize> {
        self.channel
            .checked_mul(self.height)?
            .checked_mul(self.width)
    }

    /// Elements including the batch axis; `None` on overflow
    pub fn len(&self) -> Option<usize> {
        self.batch.checked_mul(self.feature_len()?)
    }

    /// Whether any axis is zero
    pub fn is_empty(&self) -> bool {
        self.batch == 0 || self.channel == 0 || self.height == 0 || self.width == 0
    }
}

impl fmt::Display for ShapeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.batch, self.channel, self.height, self.width
        )
    }
}

/// Kind of model requested from the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ModelKind {
    /// General feed-forward neural network
    NeuralNet,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeuralNet => f.write_str("neural_net"),
        }
    }
}

/// Format selector for the configuration artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ModelFormat {
    /// INI-style model description
    Ini,
}

/// Detail level of a runtime summary. Printed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryLevel {
    Layer,
    Model,
    Tensor,
}

impl SummaryLevel {
    pub const ALL: [SummaryLevel; 3] = [Self::Layer, Self::Model, Self::Tensor];

    /// Literal label line printed before the report
    pub fn label(&self) -> &'static str {
        match self {
            Self::Layer => "ML_TRAIN_SUMMARY_LAYER",
            Self::Model => "ML_TRAIN_SUMMARY_MODEL",
            Self::Tensor => "ML_TRAIN_SUMMARY_TENSOR",
        }
    }
}

/// Seed handed to the runtime's initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed(pub u64);

impl Seed {
    /// Seed derived from the wall clock (UNIX seconds)
    pub fn from_clock() -> Self {
        Self(chrono::Utc::now().timestamp().max(0) as u64)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One completed stage transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: PipelineStage,
    pub latency_ms: u64,
}

/// What a successful run observed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BringupReport {
    pub trace_id: String,
    pub seed: Seed,
    pub stages: Vec<StageRecord>,
    pub inputs: Vec<ShapeDescriptor>,
    pub outputs: Vec<ShapeDescriptor>,
}

impl BringupReport {
    /// Stage sequence without timings
    pub fn transitions(&self) -> Vec<PipelineStage> {
        self.stages.iter().map(|r| r.stage).collect()
    }
}
