//! Error handling for BPCH reading operations.
//!
//! Provides error types with context for record framing, header decoding,
//! metadata table loading, grid resolution and the two scanning passes.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BpchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Record framing error at offset {offset}: leading length {leading}, trailing length {trailing}")]
    RecordFraming {
        offset: u64,
        leading: i32,
        trailing: i32,
    },

    #[error("Unexpected end of file at offset {offset} while reading {context}")]
    UnexpectedEof { offset: u64, context: String },

    #[error("Record at offset {offset} has {found} bytes, expected {expected} for {context}")]
    RecordLength {
        offset: u64,
        expected: usize,
        found: usize,
        context: String,
    },

    #[error("Unsupported file type '{file_type}' in {path}")]
    UnsupportedFileType { path: PathBuf, file_type: String },

    #[error("No grid definition for model '{model_name}' at resolution {lon_res}x{lat_res}: {reason}")]
    UnknownGrid {
        model_name: String,
        lon_res: f32,
        lat_res: f32,
        reason: String,
    },

    #[error("Diagnostic category '{category}' not found in category table")]
    MissingCategory { category: String },

    #[error("Tracer number {number} (category '{category}') not found in tracer table")]
    MissingTracer { category: String, number: i32 },

    #[error("'{name}' sanitizes to invalid identifier '{identifier}'")]
    InvalidIdentifier { name: String, identifier: String },

    #[error("Identifier collision: '{name}' and '{existing}' both sanitize to '{identifier}'")]
    IdentifierCollision {
        name: String,
        existing: String,
        identifier: String,
    },

    #[error("Dimension mismatch for {category}/{tracer}: first block {expected:?}, later block {found:?}")]
    DimensionMismatch {
        category: String,
        tracer: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Payload for {category}/{tracer} holds {found} values, dimensions {dims:?} need {expected}")]
    PayloadSize {
        category: String,
        tracer: String,
        dims: Vec<usize>,
        expected: usize,
        found: usize,
    },

    #[error("Category '{category}': tracer '{tracer}' has {found} samples, category expects {expected}")]
    NonUniformSampling {
        category: String,
        tracer: String,
        expected: usize,
        found: usize,
    },

    #[error("Table parsing failed for {path} line {line}: {reason}")]
    Table {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl BpchError {
    /// Whether an error policy may downgrade this error to a warning
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BpchError::UnsupportedFileType { .. }
                | BpchError::MissingCategory { .. }
                | BpchError::MissingTracer { .. }
                | BpchError::InvalidIdentifier { .. }
                | BpchError::IdentifierCollision { .. }
                | BpchError::NonUniformSampling { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BpchError>;
