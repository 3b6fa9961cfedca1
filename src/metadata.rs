//! Tracer and diagnostic category tables.
//!
//! Normally loaded from the GAMAP `tracerinfo.dat` and `diaginfo.dat`
//! fixed-column text files that sit next to the BPCH file. PSC state and
//! CSPEC checkpoint files instead get a synthetic one-tracer,
//! one-category table.

use crate::config::ReaderConfig;
use crate::constants::{UNCATEGORIZED_NAME, file_kinds};
use crate::error::{BpchError, Result};
use crate::header::FileHeader;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// One entry of the tracer table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracerDefinition {
    pub number: i32,
    pub name: String,
    pub full_name: String,
    /// kg/mol
    pub molecular_weight: f64,
    /// Carbon-mole equivalent
    pub carbon: f64,
    pub unit: String,
    /// Factor applied to raw payload values
    pub scale: f64,
}

/// One entry of the category table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticCategory {
    pub name: String,
    /// Added to a block's tracer number before looking it up
    pub offset: i32,
    pub description: String,
}

/// File kinds recognised from the title line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Standard,
    PscState,
    CspecCheckpoint,
}

impl FileKind {
    pub fn from_title(title: &str) -> Self {
        let title = title.to_lowercase();
        if title.contains(file_kinds::PSC_STATE_TITLE) {
            FileKind::PscState
        } else if title.contains(file_kinds::CSPEC_TITLE)
            || title.contains(file_kinds::CHECKPOINT_TITLE)
        {
            FileKind::CspecCheckpoint
        } else {
            FileKind::Standard
        }
    }
}

/// How blocks are assigned to categories, fixed before scanning starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryMode {
    Categorized,
    /// No categories are known; every block goes to the `"data"` category
    Uncategorized,
}

/// Lookup tables for one BPCH file
#[derive(Debug, Clone)]
pub struct MetadataTables {
    kind: FileKind,
    tracers: BTreeMap<i32, TracerDefinition>,
    categories: Vec<DiagnosticCategory>,
    category_index: HashMap<String, usize>,
    fallback: DiagnosticCategory,
}

impl MetadataTables {
    pub fn new(
        kind: FileKind,
        tracers: impl IntoIterator<Item = TracerDefinition>,
        categories: impl IntoIterator<Item = DiagnosticCategory>,
    ) -> Self {
        let tracers: BTreeMap<i32, TracerDefinition> =
            tracers.into_iter().map(|t| (t.number, t)).collect();

        let mut ordered = Vec::new();
        let mut category_index = HashMap::new();
        for category in categories {
            match category_index.get(&category.name) {
                Some(&idx) => ordered[idx] = category,
                None => {
                    category_index.insert(category.name.clone(), ordered.len());
                    ordered.push(category);
                }
            }
        }

        Self {
            kind,
            tracers,
            categories: ordered,
            category_index,
            fallback: DiagnosticCategory {
                name: UNCATEGORIZED_NAME.to_string(),
                offset: 0,
                description: "All tracers (no category table entries)".to_string(),
            },
        }
    }

    /// Build the tables for a file: synthetic for special file kinds,
    /// otherwise loaded from the configured (or default) table files
    pub fn for_header(header: &FileHeader, config: &ReaderConfig, input: &Path) -> Result<Self> {
        let kind = FileKind::from_title(&header.title);
        match kind {
            FileKind::PscState => Ok(Self::psc_state()),
            FileKind::CspecCheckpoint => Ok(Self::cspec_checkpoint()),
            FileKind::Standard => {
                let tracers = load_tracer_table(&config.tracer_table_path(input))?;
                let categories = load_category_table(&config.category_table_path(input))?;
                Ok(Self::new(kind, tracers, categories))
            }
        }
    }

    pub fn psc_state() -> Self {
        Self::synthetic(
            FileKind::PscState,
            file_kinds::PSC_CATEGORY,
            file_kinds::PSC_TRACER,
            "unitless",
        )
    }

    pub fn cspec_checkpoint() -> Self {
        Self::synthetic(
            FileKind::CspecCheckpoint,
            file_kinds::CSPEC_CATEGORY,
            file_kinds::CSPEC_TRACER,
            "molec/cm3",
        )
    }

    fn synthetic(kind: FileKind, category: &str, tracer: &str, unit: &str) -> Self {
        Self::new(
            kind,
            [TracerDefinition {
                number: 1,
                name: tracer.to_string(),
                full_name: tracer.to_string(),
                molecular_weight: 0.0,
                carbon: 1.0,
                unit: unit.to_string(),
                scale: 1.0,
            }],
            [DiagnosticCategory {
                name: category.to_string(),
                offset: 0,
                description: format!("Synthetic category for {kind:?} files"),
            }],
        )
    }

    pub fn file_kind(&self) -> FileKind {
        self.kind
    }

    pub fn category_mode(&self) -> CategoryMode {
        if self.categories.is_empty() {
            CategoryMode::Uncategorized
        } else {
            CategoryMode::Categorized
        }
    }

    pub fn tracer(&self, number: i32) -> Option<&TracerDefinition> {
        self.tracers.get(&number)
    }

    pub fn category(&self, name: &str) -> Option<&DiagnosticCategory> {
        self.category_index
            .get(name.trim())
            .map(|&idx| &self.categories[idx])
    }

    /// Category for a block under the given mode
    pub fn resolve_category(&self, mode: CategoryMode, name: &str) -> Option<&DiagnosticCategory> {
        match mode {
            CategoryMode::Categorized => self.category(name),
            CategoryMode::Uncategorized => Some(&self.fallback),
        }
    }

    pub fn tracers(&self) -> impl Iterator<Item = &TracerDefinition> {
        self.tracers.values()
    }

    /// Categories in table order; the synthetic `"data"` category when empty
    pub fn categories(&self) -> Vec<&DiagnosticCategory> {
        match self.category_mode() {
            CategoryMode::Categorized => self.categories.iter().collect(),
            CategoryMode::Uncategorized => vec![&self.fallback],
        }
    }
}

/// Start of the free-text trailing column in each table
const TRACER_UNIT_COLUMN: usize = 72;
const CATEGORY_DESCRIPTION_COLUMN: usize = 50;

fn read_table(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => BpchError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => BpchError::Io(e),
    })
}

/// Fixed-width column, clamped to the line length
fn column(line: &str, start: usize, end: Option<usize>) -> &str {
    let len = line.len();
    let start = start.min(len);
    let end = end.unwrap_or(len).min(len);
    line.get(start..end).unwrap_or("").trim()
}

fn parse_number<T: std::str::FromStr>(
    text: &str,
    path: &Path,
    line: usize,
    field: &str,
) -> Result<T> {
    let normalized = text.replace(['D', 'd'], "E");
    normalized.parse().map_err(|_| BpchError::Table {
        path: path.to_path_buf(),
        line,
        reason: format!("invalid {field} '{text}'"),
    })
}

/// Fixed columns are byte offsets; text before `width` must be ASCII for
/// them to line up
fn check_fixed_columns(line: &str, width: usize, path: &Path, line_num: usize) -> Result<()> {
    if line.bytes().take(width).all(|b| b.is_ascii()) {
        return Ok(());
    }
    Err(BpchError::Table {
        path: path.to_path_buf(),
        line: line_num,
        reason: format!("non-ASCII characters within the first {width} columns"),
    })
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Load a GAMAP `tracerinfo.dat` table
pub fn load_tracer_table(path: &Path) -> Result<Vec<TracerDefinition>> {
    let content = read_table(path)?;
    parse_tracer_table(&content, path)
}

pub fn parse_tracer_table(content: &str, path: &Path) -> Result<Vec<TracerDefinition>> {
    let mut by_number: BTreeMap<i32, TracerDefinition> = BTreeMap::new();

    for (idx, line) in content.lines().enumerate() {
        if is_comment(line) {
            continue;
        }
        let line_num = idx + 1;
        check_fixed_columns(line, TRACER_UNIT_COLUMN, path, line_num)?;

        let tracer = TracerDefinition {
            name: column(line, 0, Some(8)).to_string(),
            full_name: column(line, 9, Some(39)).to_string(),
            molecular_weight: parse_number(column(line, 39, Some(49)), path, line_num, "molecular weight")?,
            carbon: parse_number(column(line, 49, Some(52)), path, line_num, "carbon count")?,
            number: parse_number(column(line, 52, Some(61)), path, line_num, "tracer number")?,
            scale: parse_number(column(line, 61, Some(71)), path, line_num, "scale factor")?,
            unit: column(line, TRACER_UNIT_COLUMN, None).to_string(),
        };

        if tracer.name.is_empty() {
            return Err(BpchError::Table {
                path: path.to_path_buf(),
                line: line_num,
                reason: "empty tracer name".to_string(),
            });
        }

        if let Some(previous) = by_number.insert(tracer.number, tracer) {
            warn!(
                "Tracer number {} defined more than once in {} (replacing '{}')",
                previous.number,
                path.display(),
                previous.name
            );
        }
    }

    debug!("Loaded {} tracers from {}", by_number.len(), path.display());
    Ok(by_number.into_values().collect())
}

/// Load a GAMAP `diaginfo.dat` table
pub fn load_category_table(path: &Path) -> Result<Vec<DiagnosticCategory>> {
    let content = read_table(path)?;
    parse_category_table(&content, path)
}

pub fn parse_category_table(content: &str, path: &Path) -> Result<Vec<DiagnosticCategory>> {
    let mut categories = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if is_comment(line) {
            continue;
        }
        let line_num = idx + 1;
        check_fixed_columns(line, CATEGORY_DESCRIPTION_COLUMN, path, line_num)?;

        let name = column(line, 9, Some(49)).to_string();
        if name.is_empty() {
            return Err(BpchError::Table {
                path: path.to_path_buf(),
                line: line_num,
                reason: "empty category name".to_string(),
            });
        }

        categories.push(DiagnosticCategory {
            offset: parse_number(column(line, 0, Some(8)), path, line_num, "offset")?,
            name,
            description: column(line, CATEGORY_DESCRIPTION_COLUMN, None).to_string(),
        });
    }

    debug!(
        "Loaded {} categories from {}",
        categories.len(),
        path.display()
    );
    Ok(categories)
}
