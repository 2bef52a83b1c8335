//! Unified Error Model
use thiserror::Error;

use crate::runtime::RuntimeError;
use crate::stage::PipelineStage;

/// A classified pipeline failure. Display is the one-line diagnostic.
#[derive(Error, Debug)]
pub enum BringupError {
    #[error("Error while creating model! details: {0}")]
    Create(RuntimeError),

    #[error("Error while loading model! details: {0}")]
    Load(RuntimeError),

    #[error("Error while compiling model! details: {0}")]
    Compile(RuntimeError),

    #[error("Error while initializing model! details: {0}")]
    Init(RuntimeError),

    #[error("Error while summarizing model! details: {0}")]
    Summary(RuntimeError),
}

impl BringupError {
    /// Classify a runtime failure by the stage that was being attempted
    pub fn at(stage: PipelineStage, source: RuntimeError) -> Self {
        match stage {
            PipelineStage::Created => Self::Create(source),
            PipelineStage::Loaded => Self::Load(source),
            PipelineStage::Compiled => Self::Compile(source),
            PipelineStage::Initialized => Self::Init(source),
            PipelineStage::Summarized => Self::Summary(source),
        }
    }

    /// Stage that failed
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Create(_) => PipelineStage::Created,
            Self::Load(_) => PipelineStage::Loaded,
            Self::Compile(_) => PipelineStage::Compiled,
            Self::Init(_) => PipelineStage::Initialized,
            Self::Summary(_) => PipelineStage::Summarized,
        }
    }
}

/// Process outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Ok,
    Failure,
    Usage,
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Failure => 1,
            Self::Usage => -1,
        }
    }
}

impl From<&BringupError> for ExitStatus {
    fn from(_: &BringupError) -> Self {
        Self::Failure
    }
}
