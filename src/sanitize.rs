//! Identifier sanitization for category and tracer names.
//!
//! Free-text names such as `IJ-AVG-$` become keys like `C_IJ_AVG`. Each
//! sanitizer remembers which source name produced which identifier so that
//! two different names can never share a key.

use crate::error::{BpchError, Result};
use crate::policy::ErrorPolicy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// A sanitized, collision-checked key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Category,
    Tracer,
}

impl Role {
    fn prefix(self) -> &'static str {
        match self {
            Role::Category => "C_",
            Role::Tracer => "T_",
        }
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_$]*$").expect("identifier pattern is a valid regex")
    })
}

/// Apply the sanitization rules without validation or collision checks
pub fn sanitize_name(name: &str, role: Role) -> String {
    let mut base = name.trim();
    if role == Role::Category {
        if let Some(stripped) = base.strip_suffix("-$").or_else(|| base.strip_suffix("=$")) {
            base = stripped;
        }
    }

    let body: String = base
        .chars()
        .filter(|c| !matches!(c, '$' | '(' | ')'))
        .map(|c| match c {
            '-' | ' ' | '/' | '=' => '_',
            other => other,
        })
        .collect();

    format!("{}{}", role.prefix(), body)
}

pub fn is_valid_identifier(candidate: &str) -> bool {
    identifier_pattern().is_match(candidate)
}

/// Stateful sanitizer for one reading session
#[derive(Debug)]
pub struct Sanitizer {
    policy: ErrorPolicy,
    by_source: HashMap<(Role, String), Identifier>,
    by_identifier: HashMap<(Role, String), String>,
}

impl Sanitizer {
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            by_source: HashMap::new(),
            by_identifier: HashMap::new(),
        }
    }

    /// Sanitize `name`; the same name always maps to the same identifier
    pub fn sanitize(&mut self, name: &str, role: Role) -> Result<Identifier> {
        let source = name.trim().to_string();
        if let Some(existing) = self.by_source.get(&(role, source.clone())) {
            return Ok(existing.clone());
        }

        let mut candidate = sanitize_name(&source, role);
        if !is_valid_identifier(&candidate) {
            self.policy.tolerate(BpchError::InvalidIdentifier {
                name: source.clone(),
                identifier: candidate.clone(),
            })?;
        }

        if let Some(existing) = self.by_identifier.get(&(role, candidate.clone())) {
            self.policy.tolerate(BpchError::IdentifierCollision {
                name: source.clone(),
                existing: existing.clone(),
                identifier: candidate.clone(),
            })?;
            candidate = self.disambiguate(&candidate, role);
            warn!("Using '{}' for '{}'", candidate, source);
        }

        let identifier = Identifier(candidate.clone());
        self.by_identifier.insert((role, candidate), source.clone());
        self.by_source.insert((role, source), identifier.clone());
        Ok(identifier)
    }

    /// Identifier previously produced for `name`, if any
    pub fn lookup(&self, name: &str, role: Role) -> Option<&Identifier> {
        self.by_source.get(&(role, name.trim().to_string()))
    }

    fn disambiguate(&self, candidate: &str, role: Role) -> String {
        (2..)
            .map(|n| format!("{candidate}_{n}"))
            .find(|c| !self.by_identifier.contains_key(&(role, c.clone())))
            .unwrap_or_else(|| candidate.to_string())
    }
}
