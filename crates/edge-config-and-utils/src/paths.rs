//! File system paths for the pipeline.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Hit queue database filename under the base directory.
const QUEUE_DATABASE_NAME: &str = "edge-hits.sqlite";

/// Manages file system paths for the pipeline.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for persistent files (~/.edge)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.edge`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".edge"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.edge).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.edge/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the hit queue database path (~/.edge/edge-hits.sqlite).
    pub fn queue_database_file(&self) -> PathBuf {
        self.base_dir.join(QUEUE_DATABASE_NAME)
    }

    /// Get the logs directory (~/.edge/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file path (~/.edge/logs/edge.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("edge.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
