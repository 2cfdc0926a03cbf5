use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::btree::DEFAULT_MAX_DEGREE;
use crate::buffer::DEFAULT_POOL_CAPACITY;
use crate::file::{FileError, FileManager};
use crate::storage::{Storage, StorageError};
use crate::wal::{LogManager, WalError};

/// Smallest pool that can hold a descent plus the pages touched by a split
pub const MIN_POOL_CAPACITY: usize = 3;

/// Smallest fan-out a B+ tree page can split with
pub const MIN_MAX_DEGREE: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Log error: {0}")]
    Wal(#[from] WalError),

    #[error("pool_capacity must be at least 3, got {0}")]
    PoolTooSmall(usize),

    #[error("max_degree must be at least 3, got {0}")]
    DegreeTooSmall(usize),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the storage and log files
    pub data_dir: PathBuf,
    pub storage_file: String,
    pub log_file: String,
    /// Frames in the buffer pool
    pub pool_capacity: usize,
    /// Fan-out of new trees; existing files keep the degree they were created with
    pub max_degree: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            storage_file: "storage.db".to_string(),
            log_file: "wal.log".to_string(),
            pool_capacity: DEFAULT_POOL_CAPACITY,
            max_degree: DEFAULT_MAX_DEGREE,
        }
    }
}

impl Config {
    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.pool_capacity < MIN_POOL_CAPACITY {
            return Err(ConfigError::PoolTooSmall(self.pool_capacity));
        }
        if self.max_degree < MIN_MAX_DEGREE {
            return Err(ConfigError::DegreeTooSmall(self.max_degree));
        }
        Ok(())
    }

    /// Open the storage file, creating an empty one on first use
    pub fn open_storage(&self) -> ConfigResult<Storage> {
        self.validate()?;
        let file_manager = FileManager::new(&self.data_dir)?;
        let storage = if file_manager.exists(&self.storage_file) {
            Storage::open(file_manager, &self.storage_file, self.pool_capacity)?
        } else {
            Storage::create(
                file_manager,
                &self.storage_file,
                self.pool_capacity,
                self.max_degree,
            )?
        };
        Ok(storage)
    }

    pub fn open_log(&self) -> ConfigResult<LogManager> {
        let file_manager = FileManager::new(&self.data_dir)?;
        Ok(LogManager::open(file_manager, &self.log_file)?)
    }
}
