// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("XML parsing error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("Required section not found: {0}")]
    SectionNotFound(String),

    #[error("Value block <{element}> has no SINGLE_VALUE/RANGE_VALUE shape")]
    MissingValueShape { element: String },

    #[error("Value block <{element}> carries both single and range shapes")]
    AmbiguousValueShape { element: String },
}

#[derive(Error, Debug, PartialEq)]
pub enum SanitizeError {
    #[error("Compulsory field {0} is empty")]
    CompulsoryMissing(String),

    #[error("Field {field} expects one value, found {count}")]
    TooManyValues { field: String, count: usize },
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("I/O error reading lookup tables: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed lookup tables: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Per-document failure. Never aborts the batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Sanitizing failed: {0}")]
    Sanitize(#[from] SanitizeError),

    #[error("Processing budget of {0} ms exceeded")]
    BudgetExceeded(u64),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Lookup tables unavailable: {0}")]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}

impl AppError {
    pub fn missing_input(path: PathBuf) -> Self {
        AppError::Config(format!("Input directory {} does not exist", path.display()))
    }
}
