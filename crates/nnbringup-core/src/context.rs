//! Execution Context: per-run identity shared by every stage
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::data_model::Seed;

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub trace_id: String,
    pub config_path: PathBuf,
    pub seed: Seed,
    pub started_at: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn new(config_path: impl AsRef<Path>, seed: Seed) -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            config_path: config_path.as_ref().to_path_buf(),
            seed,
            started_at: Utc::now(),
        }
    }
}
