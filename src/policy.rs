//! Strict / lenient error handling strategy.
//!
//! Call sites that hit a recoverable problem hand the error to the policy.
//! A strict policy returns it, a lenient policy logs a warning and lets the
//! caller continue with its fallback (skip the block, keep the identifier).

use crate::error::{BpchError, Result};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Strict,
    Lenient,
}

/// Result of resolving one item under an error policy
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Resolved(T),
    Skipped,
}

#[derive(Debug, Clone, Copy)]
pub struct ErrorPolicy {
    mode: Mode,
    verbose: bool,
}

impl ErrorPolicy {
    pub fn strict(verbose: bool) -> Self {
        Self {
            mode: Mode::Strict,
            verbose,
        }
    }

    pub fn lenient(verbose: bool) -> Self {
        Self {
            mode: Mode::Lenient,
            verbose,
        }
    }

    pub fn is_lenient(&self) -> bool {
        self.mode == Mode::Lenient
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Return `err` in strict mode; warn and swallow it in lenient mode.
    ///
    /// Errors that are never recoverable are returned regardless of mode.
    pub fn tolerate(&self, err: BpchError) -> Result<()> {
        if self.mode == Mode::Strict || !err.is_recoverable() {
            return Err(err);
        }
        warn!("{}", err);
        Ok(())
    }

    /// Like [`tolerate`](Self::tolerate), mapping the lenient case to `Outcome::Skipped`
    pub fn skip<T>(&self, err: BpchError) -> Result<Outcome<T>> {
        self.tolerate(err).map(|_| Outcome::Skipped)
    }
}
