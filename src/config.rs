//! Reader configuration.
//!
//! Holds the metadata table locations and the flags that control how a
//! BPCH file is read: verbosity, strict vs. lenient error handling,
//! info-only discovery and derived grid output.

use crate::constants::{DEFAULT_CATEGORY_TABLE, DEFAULT_PATH_SENTINEL, DEFAULT_TRACER_TABLE};
use crate::error::{BpchError, Result};
use crate::policy::ErrorPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a single `read_bpch` invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Tracer table path (`None` or `"default"` = `tracerinfo.dat` next to the input)
    pub tracer_table: Option<PathBuf>,

    /// Category table path (`None` or `"default"` = `diaginfo.dat` next to the input)
    pub category_table: Option<PathBuf>,

    /// Report pass summaries and discovered series at info level
    pub verbose: bool,

    /// Downgrade recoverable problems (missing tracers, bad identifiers) to warnings
    pub lenient: bool,

    /// Stop after name sanitization and return identifier lists only
    pub info_only: bool,

    /// Derive grid areas and pressure levels after materialization
    pub grid_output: bool,
}

impl ReaderConfig {
    pub fn with_tracer_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.tracer_table = Some(path.into());
        self
    }

    pub fn with_category_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.category_table = Some(path.into());
        self
    }

    pub fn with_verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn with_lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    pub fn with_info_only(mut self) -> Self {
        self.info_only = true;
        self
    }

    pub fn with_grid_output(mut self) -> Self {
        self.grid_output = true;
        self
    }

    /// Reject flag combinations that cannot be honoured
    pub fn validate(&self) -> Result<()> {
        if self.info_only && self.grid_output {
            return Err(BpchError::Configuration {
                message: "info-only mode skips materialization, grid output needs it".to_string(),
            });
        }
        Ok(())
    }

    /// Error handling strategy derived from the leniency and verbosity flags
    pub fn policy(&self) -> ErrorPolicy {
        if self.lenient {
            ErrorPolicy::lenient(self.verbose)
        } else {
            ErrorPolicy::strict(self.verbose)
        }
    }

    /// Resolved tracer table location for the given input file
    pub fn tracer_table_path(&self, input: &Path) -> PathBuf {
        resolve_table_path(self.tracer_table.as_deref(), input, DEFAULT_TRACER_TABLE)
    }

    /// Resolved category table location for the given input file
    pub fn category_table_path(&self, input: &Path) -> PathBuf {
        resolve_table_path(self.category_table.as_deref(), input, DEFAULT_CATEGORY_TABLE)
    }
}

fn resolve_table_path(configured: Option<&Path>, input: &Path, default_name: &str) -> PathBuf {
    match configured {
        Some(path) if path.as_os_str() != DEFAULT_PATH_SENTINEL && !path.as_os_str().is_empty() => {
            path.to_path_buf()
        }
        _ => input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(default_name),
    }
}
