pub mod config;
pub use config::{AnalyzeConfig, ConvertConfig, PipelineConfig, SyncConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TablePulseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("object storage error: {0}")]
    Storage(String),
    #[error("column '{column}' not found in {file}")]
    ColumnNotFound { column: String, file: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("run cancelled")]
    Cancelled,
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TablePulseError>;
