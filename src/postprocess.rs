//! Post-processing of a materialized dataset.
//!
//! Derives grid box areas and an approximate pressure-level axis from the
//! surface pressure series, and applies file-kind specific corrections.

use crate::constants::{TOA_PRESSURE_HPA, TOA_TOLERANCE, file_kinds};
use crate::grid::{GridDefinition, cell_areas};
use crate::metadata::FileKind;
use crate::models::{CtmDataset, ModelDataset, SeriesKey, TracerSeries};
use ndarray::{Array2, ArrayD, Axis};
use tracing::{debug, warn};

/// Build the grid-derived output for a dataset
pub fn derive_model_dataset(
    grid: &GridDefinition,
    dataset: &CtmDataset,
    surface_pressure: Option<&SeriesKey>,
) -> ModelDataset {
    let area = cell_areas(&grid.lon_edges, &grid.lat_edges);

    let pressure_levels = surface_pressure
        .and_then(|key| dataset.get(key))
        .and_then(|series| pressure_levels(series, &area));

    ModelDataset {
        lon_edges: grid.lon_edges.clone(),
        lat_edges: grid.lat_edges.clone(),
        area,
        pressure_levels,
    }
}

/// Area-weighted mean pressure profile from a `[lon, lat, (lev,) time]`
/// pressure series, with the TOA level appended when missing
pub fn pressure_levels(series: &TracerSeries, area: &Array2<f64>) -> Option<Vec<f64>> {
    let spatial = series.spatial_shape();
    if spatial.len() < 2 {
        warn!(
            "Surface pressure series has shape {:?}; need at least lon x lat",
            spatial
        );
        return None;
    }
    if spatial[1] != area.ncols() {
        warn!(
            "Surface pressure has {} latitudes, grid has {}; skipping pressure levels",
            spatial[1],
            area.ncols()
        );
        return None;
    }

    let data: ArrayD<f64> = series.data.mapv(f64::from);
    let time_axis = data.ndim() - 1;
    let time_mean = data.mean_axis(Axis(time_axis))?;
    // [lat, lev...]
    let zonal_mean = time_mean.mean_axis(Axis(0))?;

    let weights = area.sum_axis(Axis(0));
    let total_weight = weights.sum();
    if total_weight <= 0.0 {
        return None;
    }

    let mut profile = ArrayD::<f64>::zeros(zonal_mean.index_axis(Axis(0), 0).raw_dim());
    for (j, &weight) in weights.iter().enumerate() {
        profile.scaled_add(weight, &zonal_mean.index_axis(Axis(0), j));
    }
    profile /= total_weight;

    let mut levels: Vec<f64> = profile.iter().copied().collect();
    if let Some(&top) = levels.last() {
        if top - TOA_PRESSURE_HPA > TOA_TOLERANCE {
            levels.push(TOA_PRESSURE_HPA);
        }
    }

    debug!("Derived {} pressure levels", levels.len());
    Some(levels)
}

/// Corrections that depend on the kind of file that was read
pub fn apply_file_corrections(kind: FileKind, dataset: &mut CtmDataset) {
    if kind != FileKind::PscState {
        return;
    }

    let keys: Vec<SeriesKey> = dataset
        .iter()
        .filter(|(_, series)| series.name == file_kinds::PSC_TRACER)
        .map(|(key, _)| key.clone())
        .collect();

    for key in keys {
        if let Some(series) = dataset.get_mut(&key) {
            series.data.mapv_inplace(f32::floor);
            debug!("Floored PSC state values for {}/{}", key.category, key.tracer);
        }
    }
}
