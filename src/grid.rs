//! Model grid resolution.
//!
//! Maps the model name and horizontal resolution found in a BPCH header to
//! a concrete grid: longitude/latitude edges and centers plus the number of
//! vertical levels. There is no fallback grid; anything unrecognised is an
//! error.

use crate::constants::EARTH_RADIUS_M;
use crate::error::{BpchError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Concrete horizontal and vertical grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDefinition {
    pub model_name: String,
    pub family: ModelFamily,
    /// (longitude, latitude) spacing in degrees
    pub resolution: [f64; 2],
    pub lon_edges: Vec<f64>,
    pub lon_centers: Vec<f64>,
    pub lat_edges: Vec<f64>,
    pub lat_centers: Vec<f64>,
    pub levels: usize,
    pub half_polar: bool,
    pub center_180: bool,
}

impl GridDefinition {
    pub fn nlon(&self) -> usize {
        self.lon_centers.len()
    }

    pub fn nlat(&self) -> usize {
        self.lat_centers.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelFamily {
    Geos,
    Gcap,
}

/// Horizontal presets keyed by `round(lon_res * 3)`
#[derive(Debug, Clone, Copy, PartialEq)]
struct HorizontalPreset {
    code: i32,
    dlon: f64,
    dlat: f64,
}

const PRESETS: &[HorizontalPreset] = &[
    HorizontalPreset {
        code: 15,
        dlon: 5.0,
        dlat: 4.0,
    },
    HorizontalPreset {
        code: 8,
        dlon: 2.5,
        dlat: 2.0,
    },
    HorizontalPreset {
        code: 4,
        dlon: 1.25,
        dlat: 1.0,
    },
    HorizontalPreset {
        code: 3,
        dlon: 1.0,
        dlat: 1.0,
    },
    HorizontalPreset {
        code: 2,
        dlon: 2.0 / 3.0,
        dlat: 0.5,
    },
];

const GCAP_LEVELS: usize = 23;

/// Resolve a grid from the header's model name and (lon, lat) resolution
pub fn resolve_grid(model_name: &str, resolution: [f32; 2]) -> Result<GridDefinition> {
    let name = model_name.trim();
    let unknown = |reason: String| BpchError::UnknownGrid {
        model_name: name.to_string(),
        lon_res: resolution[0],
        lat_res: resolution[1],
        reason,
    };

    let prefix: String = name.chars().take(4).collect::<String>().to_lowercase();
    let (family, levels) = match prefix.as_str() {
        "geos" => {
            let selector = name
                .chars()
                .nth(4)
                .ok_or_else(|| unknown("model name has no version character".to_string()))?;
            let reduced = name.chars().count() > 5;
            let levels = geos_levels(selector, reduced)
                .ok_or_else(|| unknown(format!("unknown GEOS version '{selector}'")))?;
            (ModelFamily::Geos, levels)
        }
        "gcap" => (ModelFamily::Gcap, GCAP_LEVELS),
        _ => return Err(unknown(format!("unknown model family '{prefix}'"))),
    };

    let code = (resolution[0] * 3.0).round() as i32;
    let preset = PRESETS
        .iter()
        .find(|p| p.code == code)
        .ok_or_else(|| unknown(format!("no horizontal preset for code {code}")))?;

    let (lon_edges, lon_centers) = longitude_axis(preset.dlon);
    let (lat_edges, lat_centers) = latitude_axis(preset.dlat);

    Ok(GridDefinition {
        model_name: name.to_string(),
        family,
        resolution: [preset.dlon, preset.dlat],
        lon_edges,
        lon_centers,
        lat_edges,
        lat_centers,
        levels,
        half_polar: true,
        center_180: true,
    })
}

/// Vertical level count for a GEOS version character; `reduced` selects the
/// reduced-level variant (model names like `GEOS5_47L`)
fn geos_levels(selector: char, reduced: bool) -> Option<usize> {
    let (full, reduced_count) = match selector.to_ascii_uppercase() {
        '1' => (20, 20),
        'S' | '_' => (26, 26),
        '3' => (30, 30),
        '4' => (55, 30),
        '5' => (72, 47),
        _ => return None,
    };
    Some(if reduced { reduced_count } else { full })
}

/// Global longitude axis with the first box centered on -180
fn longitude_axis(dlon: f64) -> (Vec<f64>, Vec<f64>) {
    let nlon = (360.0 / dlon).round() as usize;
    let centers: Vec<f64> = (0..nlon).map(|i| -180.0 + i as f64 * dlon).collect();
    let edges: Vec<f64> = (0..=nlon)
        .map(|i| -180.0 - dlon / 2.0 + i as f64 * dlon)
        .collect();
    (edges, centers)
}

/// Global latitude axis with half-sized polar boxes
fn latitude_axis(dlat: f64) -> (Vec<f64>, Vec<f64>) {
    let nlat = (180.0 / dlat).round() as usize + 1;

    let mut edges = Vec::with_capacity(nlat + 1);
    edges.push(-90.0);
    for j in 0..nlat - 1 {
        edges.push(-90.0 + dlat / 2.0 + j as f64 * dlat);
    }
    edges.push(90.0);

    let mut centers: Vec<f64> = (0..nlat).map(|j| -90.0 + j as f64 * dlat).collect();
    centers[0] = -90.0 + dlat / 4.0;
    centers[nlat - 1] = 90.0 - dlat / 4.0;

    (edges, centers)
}

/// Surface area in m² of each grid box, shaped `[nlon, nlat]`
pub fn cell_areas(lon_edges: &[f64], lat_edges: &[f64]) -> Array2<f64> {
    let nlon = lon_edges.len().saturating_sub(1);
    let nlat = lat_edges.len().saturating_sub(1);
    let r2 = EARTH_RADIUS_M * EARTH_RADIUS_M;

    Array2::from_shape_fn((nlon, nlat), |(i, j)| {
        let dlon = (lon_edges[i + 1] - lon_edges[i]).to_radians();
        let sin_north = lat_edges[j + 1].to_radians().sin();
        let sin_south = lat_edges[j].to_radians().sin();
        r2 * dlon * (sin_north - sin_south)
    })
}
