//! Entry point tying the passes together.
//!
//! Opens the file once, resolves the grid and metadata tables, sanitizes
//! names, then runs the structural scan and the materializer before the
//! optional post-processing step.

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::grid::{GridDefinition, resolve_grid};
use crate::header::{FileHeader, read_file_header};
use crate::materializer::materialize;
use crate::metadata::MetadataTables;
use crate::models::{BpchOutput, CtmDataset, DatasetInfo};
use crate::postprocess::{apply_file_corrections, derive_model_dataset};
use crate::record::RecordReader;
use crate::sanitize::{Identifier, Role, Sanitizer};
use crate::scanner::scan;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Read a BPCH file into typed series.
///
/// File-kind corrections (flooring `STATE_PSC` in PSC state files) are
/// applied on every full read. `grid_output` only controls whether the
/// `ModelDataset` with areas and pressure levels is derived.
pub fn read_bpch(path: &Path, config: &ReaderConfig) -> Result<BpchOutput> {
    let start_time = Instant::now();
    config.validate()?;
    let policy = config.policy();

    let mut reader = RecordReader::open(path)?;
    let header = read_file_header(&mut reader, path, &policy)?;
    let grid = resolve_grid(&header.model.model_name, header.model.resolution)?;
    check_grid_flags(&header, &grid);

    let tables = MetadataTables::for_header(&header, config, path)?;
    let mut sanitizer = Sanitizer::new(policy);
    let info = describe(header, grid, &tables, &mut sanitizer)?;

    if config.info_only {
        debug!("Info-only read of {} complete", path.display());
        return Ok(BpchOutput {
            info,
            dataset: CtmDataset::new(),
            model: None,
        });
    }

    let mode = tables.category_mode();
    let summary = scan(&mut reader, info.header.data_start, &tables, mode, &policy)?;
    let materialized = materialize(&mut reader, &summary, &tables, &mut sanitizer, &policy)?;
    drop(reader);

    let mut dataset = materialized.dataset;
    apply_file_corrections(tables.file_kind(), &mut dataset);

    let model = config.grid_output.then(|| {
        derive_model_dataset(&info.grid, &dataset, materialized.surface_pressure.as_ref())
    });

    let elapsed = start_time.elapsed().as_millis();
    if config.verbose {
        info!(
            "Read {} series from {} in {}ms",
            dataset.len(),
            path.display(),
            elapsed
        );
    } else {
        debug!(
            "Read {} series from {} in {}ms",
            dataset.len(),
            path.display(),
            elapsed
        );
    }

    Ok(BpchOutput {
        info,
        dataset,
        model,
    })
}

/// Sanitize every table name, producing the structural summary
fn describe(
    header: FileHeader,
    grid: GridDefinition,
    tables: &MetadataTables,
    sanitizer: &mut Sanitizer,
) -> Result<DatasetInfo> {
    let mut tracers: Vec<Identifier> = Vec::new();
    for tracer in tables.tracers() {
        let id = sanitizer.sanitize(&tracer.name, Role::Tracer)?;
        if !tracers.contains(&id) {
            tracers.push(id);
        }
    }

    let mut categories: Vec<Identifier> = Vec::new();
    for category in tables.categories() {
        let id = sanitizer.sanitize(&category.name, Role::Category)?;
        if !categories.contains(&id) {
            categories.push(id);
        }
    }

    Ok(DatasetInfo {
        header,
        grid,
        tracers,
        categories,
    })
}

fn check_grid_flags(header: &FileHeader, grid: &GridDefinition) {
    if header.model.half_polar != grid.half_polar || header.model.center_180 != grid.center_180 {
        warn!(
            "Header grid flags (half_polar={}, center_180={}) differ from the {} preset",
            header.model.half_polar, header.model.center_180, grid.model_name
        );
    }
}
