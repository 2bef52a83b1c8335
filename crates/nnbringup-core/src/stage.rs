//! Stage State Machine: monotonic progression of a bring-up run
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage reached by a run. Ordered; a run only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Created,
    Loaded,
    Compiled,
    Initialized,
    Summarized,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 5] = [
        Self::Created,
        Self::Loaded,
        Self::Compiled,
        Self::Initialized,
        Self::Summarized,
    ];

    /// Stage that must have completed before this one may run
    pub fn previous(&self) -> Option<PipelineStage> {
        match self {
            Self::Created => None,
            Self::Loaded => Some(Self::Created),
            Self::Compiled => Some(Self::Loaded),
            Self::Initialized => Some(Self::Compiled),
            Self::Summarized => Some(Self::Initialized),
        }
    }

    /// Progressive verb used in failure diagnostics
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Created => "creating model",
            Self::Loaded => "loading model",
            Self::Compiled => "compiling model",
            Self::Initialized => "initializing model",
            Self::Summarized => "summarizing model",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Loaded => "loaded",
            Self::Compiled => "compiled",
            Self::Initialized => "initialized",
            Self::Summarized => "summarized",
        };
        f.write_str(name)
    }
}

/// State of a run: not started, at a completed stage, or failed while
/// attempting a stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Start,
    At(PipelineStage),
    Failed {
        attempted: PipelineStage,
        message: String,
    },
}

impl PipelineState {
    /// Whether `stage` may run now
    pub fn can_enter(&self, stage: PipelineStage) -> bool {
        match self {
            Self::Start => stage.previous().is_none(),
            Self::At(current) => stage.previous() == Some(*current),
            Self::Failed { .. } => false,
        }
    }

    /// Record completion of `stage`. Returns false (state untouched) when the
    /// transition would skip or repeat a stage.
    pub fn advance(&mut self, stage: PipelineStage) -> bool {
        if !self.can_enter(stage) {
            return false;
        }
        *self = Self::At(stage);
        true
    }

    pub fn fail(&mut self, attempted: PipelineStage, message: impl Into<String>) {
        *self = Self::Failed {
            attempted,
            message: message.into(),
        };
    }

    /// Last stage completed, if any
    pub fn reached(&self) -> Option<PipelineStage> {
        match self {
            Self::At(stage) => Some(*stage),
            _ => None,
        }
    }
}
