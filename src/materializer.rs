//! Materialization (Pass 2).
//!
//! Re-walks the file from the data start, decodes each payload, scales it
//! and writes it into the next free time slot of its series. Arrays are
//! allocated once, on first occurrence, from the Pass 1 counts.

use crate::constants::SURFACE_PRESSURE_TRACER;
use crate::error::{BpchError, Result};
use crate::header::{DataBlockHeader, element_count};
use crate::metadata::{DiagnosticCategory, MetadataTables, TracerDefinition};
use crate::models::{CtmDataset, SeriesKey, TracerSeries};
use crate::policy::ErrorPolicy;
use crate::record::RecordReader;
use crate::sanitize::{Role, Sanitizer};
use crate::scanner::{PairSummary, Resolution, ScanSummary, resolve_block};
use crate::tau::tau_to_day_number;
use ndarray::{ArrayD, Axis, IxDyn, ShapeBuilder};
use std::io::{Read, Seek};
use tracing::{debug, info, warn};

/// Result of Pass 2
#[derive(Debug)]
pub struct Materialized {
    pub dataset: CtmDataset,
    /// Key of the surface pressure series, if one was read
    pub surface_pressure: Option<SeriesKey>,
    pub blocks_written: usize,
}

/// Run Pass 2 using the counts gathered by [`scan`](crate::scanner::scan)
pub fn materialize<R: Read + Seek>(
    reader: &mut RecordReader<R>,
    scan: &ScanSummary,
    tables: &MetadataTables,
    sanitizer: &mut Sanitizer,
    policy: &ErrorPolicy,
) -> Result<Materialized> {
    reader.seek_to(scan.data_start)?;

    let mut dataset = CtmDataset::new();
    let mut surface_pressure = None;
    let mut remaining = scan.total_samples();
    let mut blocks_written = 0;

    while remaining > 0 && reader.position()? < scan.data_end {
        reader.skip_record("model record")?;
        let block = DataBlockHeader::read(reader)?;

        // Unresolved blocks were already reported (or fatal) in Pass 1
        let Resolution::Resolved { category, tracer } = resolve_block(tables, scan.mode, &block)
        else {
            reader.skip_record("payload")?;
            continue;
        };
        let Some(pair) = scan.pair(&category.name, tracer.number) else {
            reader.skip_record("payload")?;
            continue;
        };

        let key = SeriesKey::new(
            sanitizer.sanitize(&category.name, Role::Category)?,
            sanitizer.sanitize(&tracer.name, Role::Tracer)?,
        );

        if let Some(existing) = dataset.get(&key) {
            if existing.tracer_number != tracer.number {
                policy.tolerate(BpchError::IdentifierCollision {
                    name: format!("{} (number {})", tracer.name, tracer.number),
                    existing: format!("{} (number {})", existing.name, existing.tracer_number),
                    identifier: format!("{}/{}", key.category, key.tracer),
                })?;
                reader.skip_record("payload")?;
                continue;
            }
        } else {
            dataset.insert(key.clone(), allocate_series(category, tracer, pair));
        }

        let values = reader.read_f32_record("payload")?;
        let Some(series) = dataset.get_mut(&key) else {
            continue;
        };
        if series.is_complete() {
            warn!(
                "More blocks than counted for {}/{}; ignoring extra block at tau {}",
                key.category, key.tracer, block.tau0
            );
            continue;
        }
        write_sample(series, &block, values, tracer)?;

        if tracer.name.eq_ignore_ascii_case(SURFACE_PRESSURE_TRACER) {
            surface_pressure = Some(key.clone());
        }

        remaining -= 1;
        blocks_written += 1;
    }

    if remaining > 0 {
        warn!("Pass 2 ended with {} unfilled samples", remaining);
    }

    if policy.is_verbose() {
        info!(
            "Pass 2: wrote {} blocks into {} series",
            blocks_written,
            dataset.len()
        );
    } else {
        debug!(
            "Pass 2: wrote {} blocks into {} series",
            blocks_written,
            dataset.len()
        );
    }

    Ok(Materialized {
        dataset,
        surface_pressure,
        blocks_written,
    })
}

/// Allocate `[dims..., count]` plus parallel time vectors
fn allocate_series(
    category: &DiagnosticCategory,
    tracer: &TracerDefinition,
    pair: &PairSummary,
) -> TracerSeries {
    let mut shape = pair.dims.clone();
    shape.push(pair.count);

    TracerSeries {
        category: category.name.clone(),
        tracer_number: tracer.number,
        name: tracer.name.clone(),
        full_name: tracer.full_name.clone(),
        unit: pair.unit.clone(),
        molecular_weight: pair.molecular_weight,
        carbon: pair.carbon,
        scale: tracer.scale,
        taus: vec![(0.0, 0.0); pair.count],
        timestamps: vec![(0.0, 0.0); pair.count],
        data: ArrayD::zeros(IxDyn(&shape)),
        filled: 0,
    }
}

/// Reshape a payload (column-major), scale it and store it in the next slot
fn write_sample(
    series: &mut TracerSeries,
    block: &DataBlockHeader,
    values: Vec<f32>,
    tracer: &TracerDefinition,
) -> Result<()> {
    let dims = block.effective_dims();
    let expected = element_count(&dims).unwrap_or(usize::MAX);
    let payload_error = |found: usize| BpchError::PayloadSize {
        category: series.category.clone(),
        tracer: series.name.clone(),
        dims: dims.clone(),
        expected,
        found,
    };

    if values.len() != expected || dims.as_slice() != series.spatial_shape() {
        return Err(payload_error(values.len()));
    }

    let found = values.len();
    let sample = ArrayD::from_shape_vec(IxDyn(&dims).f(), values)
        .map_err(|_| payload_error(found))?;
    let scale = tracer.scale;
    let scaled = sample.mapv(|v| (f64::from(v) * scale) as f32);

    let slot = series.filled;
    series
        .data
        .index_axis_mut(Axis(dims.len()), slot)
        .assign(&scaled);
    series.taus[slot] = (block.tau0, block.tau1);
    series.timestamps[slot] = (tau_to_day_number(block.tau0), tau_to_day_number(block.tau1));
    series.filled += 1;
    Ok(())
}
