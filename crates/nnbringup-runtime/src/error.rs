//! Runtime errors and their mapping onto the pipeline contract
use nnbringup_core::RuntimeError;
use nnini::IniError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ini: {0}")]
    Ini(#[from] IniError),

    #[error("[{section}] {message}")]
    Property { section: String, message: String },

    #[error("model has no layers")]
    EmptyModel,

    #[error("layer '{layer}': {message}")]
    Topology { layer: String, message: String },

    #[error("cycle detected through layer '{0}'")]
    Cycle(String),

    #[error("layer '{layer}': {message}")]
    Shape { layer: String, message: String },

    #[error("cannot allocate tensor '{tensor}': {message}")]
    Allocation { tensor: String, message: String },

    #[error("{0}")]
    State(String),

    #[error("{0}")]
    Unsupported(String),
}

impl NetError {
    pub(crate) fn property(section: &str, message: impl Into<String>) -> Self {
        Self::Property {
            section: section.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn topology(layer: &str, message: impl Into<String>) -> Self {
        Self::Topology {
            layer: layer.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn shape(layer: &str, message: impl Into<String>) -> Self {
        Self::Shape {
            layer: layer.to_string(),
            message: message.into(),
        }
    }
}

impl From<NetError> for RuntimeError {
    fn from(err: NetError) -> Self {
        match err {
            NetError::Read { .. } | NetError::Allocation { .. } => {
                RuntimeError::Other(err.to_string())
            }
            NetError::State(msg) => RuntimeError::InvalidState(msg),
            NetError::Unsupported(msg) => RuntimeError::Unsupported(msg),
            other => RuntimeError::InvalidConfig(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
