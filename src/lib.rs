//! BPCH Reader Library
//!
//! Reads GEOS-Chem binary punch (BPCH) files into typed, multi-dimensional
//! tracer arrays with a time axis, plus the model grid that defines their
//! spatial axes.
//!
//! This library provides tools for:
//! - Decoding big-endian framed BPCH records and block headers
//! - Resolving model grids from the header's model name and resolution
//! - Loading GAMAP `tracerinfo.dat` / `diaginfo.dat` metadata tables
//! - Sanitizing category and tracer names into collision-free identifiers
//! - A two-pass read: a structural scan that counts samples, then
//!   materialization into pre-sized arrays
//! - Deriving grid box areas and approximate pressure levels

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod grid;
pub mod header;
pub mod materializer;
pub mod metadata;
pub mod models;
pub mod policy;
pub mod postprocess;
pub mod reader;
pub mod record;
pub mod sanitize;
pub mod scanner;
pub mod tau;

// Re-export commonly used types
pub use config::ReaderConfig;
pub use error::{BpchError, Result};
pub use grid::{GridDefinition, resolve_grid};
pub use models::{BpchOutput, CtmDataset, DatasetInfo, ModelDataset, SeriesKey, TracerSeries};
pub use reader::read_bpch;
pub use sanitize::Identifier;
