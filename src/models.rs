//! Core data structures produced by the reader.
//!
//! `CtmDataset` maps a (category, tracer) identifier pair to its
//! `TracerSeries`, keeping the order in which pairs first appear in the
//! file. `ModelDataset` holds the optional grid-derived output.

use crate::grid::GridDefinition;
use crate::header::FileHeader;
use crate::sanitize::Identifier;
use crate::tau::tau_to_datetime;
use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayD};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key of one series: sanitized category and tracer identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub category: Identifier,
    pub tracer: Identifier,
}

impl SeriesKey {
    pub fn new(category: Identifier, tracer: Identifier) -> Self {
        Self { category, tracer }
    }
}

/// All samples of one (category, tracer) pair
#[derive(Debug, Clone)]
pub struct TracerSeries {
    pub category: String,
    pub tracer_number: i32,
    pub name: String,
    pub full_name: String,
    pub unit: String,
    pub molecular_weight: f64,
    pub carbon: f64,
    pub scale: f64,
    /// Raw (tau0, tau1) per sample, hours since 1985-01-01
    pub taus: Vec<(f64, f64)>,
    /// Converted (start, end) day numbers per sample
    pub timestamps: Vec<(f64, f64)>,
    /// Spatial axes followed by the time axis
    pub data: ArrayD<f32>,
    pub(crate) filled: usize,
}

impl TracerSeries {
    /// Number of time slots allocated
    pub fn sample_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Number of time slots written so far
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.sample_count()
    }

    /// Spatial shape (without the time axis)
    pub fn spatial_shape(&self) -> &[usize] {
        let shape = self.data.shape();
        &shape[..shape.len() - 1]
    }

    /// Sample start times as UTC timestamps
    pub fn start_times(&self) -> Vec<DateTime<Utc>> {
        self.taus.iter().map(|&(t0, _)| tau_to_datetime(t0)).collect()
    }
}

/// Ordered mapping (category, tracer) -> series
#[derive(Debug, Clone, Default)]
pub struct CtmDataset {
    series: Vec<(SeriesKey, TracerSeries)>,
    index: HashMap<SeriesKey, usize>,
}

impl CtmDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, key: &SeriesKey) -> Option<&TracerSeries> {
        self.index.get(key).map(|&idx| &self.series[idx].1)
    }

    pub(crate) fn get_mut(&mut self, key: &SeriesKey) -> Option<&mut TracerSeries> {
        self.index.get(key).map(|&idx| &mut self.series[idx].1)
    }

    /// Lookup by identifier strings, e.g. `("C_IJ_AVG", "T_NOx")`
    pub fn lookup(&self, category: &str, tracer: &str) -> Option<&TracerSeries> {
        self.series
            .iter()
            .find(|(key, _)| key.category.as_str() == category && key.tracer.as_str() == tracer)
            .map(|(_, series)| series)
    }

    pub(crate) fn insert(&mut self, key: SeriesKey, series: TracerSeries) {
        match self.index.get(&key) {
            Some(&idx) => self.series[idx].1 = series,
            None => {
                self.index.insert(key.clone(), self.series.len());
                self.series.push((key, series));
            }
        }
    }

    pub fn contains(&self, key: &SeriesKey) -> bool {
        self.index.contains_key(key)
    }

    /// Series in first-occurrence order
    pub fn iter(&self) -> impl Iterator<Item = (&SeriesKey, &TracerSeries)> {
        self.series.iter().map(|(key, series)| (key, series))
    }

    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.iter().map(|(key, _)| key)
    }

    /// Distinct category identifiers in first-occurrence order
    pub fn categories(&self) -> Vec<&Identifier> {
        let mut seen = Vec::new();
        for (key, _) in &self.series {
            if !seen.contains(&&key.category) {
                seen.push(&key.category);
            }
        }
        seen
    }
}

/// Grid-derived output
#[derive(Debug, Clone)]
pub struct ModelDataset {
    pub lon_edges: Vec<f64>,
    pub lat_edges: Vec<f64>,
    /// Box areas in m², shaped `[nlon, nlat]`
    pub area: Array2<f64>,
    /// Approximate pressure levels in hPa, when surface pressure was present
    pub pressure_levels: Option<Vec<f64>>,
}

/// Structural summary available without materializing any data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub header: FileHeader,
    pub grid: GridDefinition,
    pub tracers: Vec<Identifier>,
    pub categories: Vec<Identifier>,
}

/// Everything `read_bpch` returns
#[derive(Debug, Clone)]
pub struct BpchOutput {
    pub info: DatasetInfo,
    pub dataset: CtmDataset,
    pub model: Option<ModelDataset>,
}
