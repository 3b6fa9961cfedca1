//! BPCH file header and per-block header decoding.
//!
//! The file starts with a type tag record and a title record. Each data
//! block then consists of a model record (model name, resolution, grid
//! flags), a block header record and the payload record.

use crate::constants::{
    BLOCK_DIMS, BLOCK_HEADER_LEN, FILE_TYPE_LEN, FILE_TYPE_TAG, MODEL_RECORD_LEN, TITLE_LEN,
};
use crate::error::{BpchError, Result};
use crate::policy::ErrorPolicy;
use crate::record::RecordReader;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;

/// File-level header, read once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub file_type: String,
    pub title: String,
    pub model: ModelRecord,
    /// Offset of the first block's model record
    pub data_start: u64,
}

/// Model description repeated in front of every block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model_name: String,
    /// (longitude, latitude) resolution in degrees
    pub resolution: [f32; 2],
    pub half_polar: bool,
    pub center_180: bool,
}

impl ModelRecord {
    pub fn read<R: Read + Seek>(reader: &mut RecordReader<R>) -> Result<Self> {
        let mut fields = reader.read_fixed(MODEL_RECORD_LEN, "model record")?;
        let model_name = fields.text(20);
        let resolution = [fields.f32(), fields.f32()];
        let half_polar = fields.i32() != 0;
        let center_180 = fields.i32() != 0;
        Ok(Self {
            model_name,
            resolution,
            half_polar,
            center_180,
        })
    }
}

/// Per-occurrence data block header
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlockHeader {
    pub category: String,
    pub tracer: i32,
    pub unit: String,
    pub tau0: f64,
    pub tau1: f64,
    pub reserved: String,
    pub dims: [i32; BLOCK_DIMS],
    pub payload_bytes: i32,
}

impl DataBlockHeader {
    pub fn read<R: Read + Seek>(reader: &mut RecordReader<R>) -> Result<Self> {
        let mut fields = reader.read_fixed(BLOCK_HEADER_LEN, "block header")?;
        let category = fields.text(40);
        let tracer = fields.i32();
        let unit = fields.text(40);
        let tau0 = fields.f64();
        let tau1 = fields.f64();
        let reserved = fields.text(40);
        let mut dims = [0i32; BLOCK_DIMS];
        for dim in dims.iter_mut() {
            *dim = fields.i32();
        }
        let payload_bytes = fields.i32();
        Ok(Self {
            category,
            tracer,
            unit,
            tau0,
            tau1,
            reserved,
            dims,
            payload_bytes,
        })
    }

    /// Declared dimensions with trailing singleton axes dropped
    pub fn effective_dims(&self) -> Vec<usize> {
        effective_dims(&self.dims)
    }

    /// Number of values the declared dimensions describe, `None` on overflow
    pub fn element_count(&self) -> Option<usize> {
        element_count(&self.effective_dims())
    }
}

/// Drop trailing axes of size one; negative sizes count as zero
pub fn effective_dims(dims: &[i32]) -> Vec<usize> {
    let mut out: Vec<usize> = dims.iter().map(|&d| d.max(0) as usize).collect();
    while out.last() == Some(&1) {
        out.pop();
    }
    out
}

/// Product of `dims`, `None` if it does not fit in `usize`
pub fn element_count(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Read the file header and leave the reader at the data start offset
pub fn read_file_header<R: Read + Seek>(
    reader: &mut RecordReader<R>,
    path: &Path,
    policy: &ErrorPolicy,
) -> Result<FileHeader> {
    let file_type = reader
        .read_fixed(FILE_TYPE_LEN, "file type")?
        .text(FILE_TYPE_LEN);
    if file_type != FILE_TYPE_TAG {
        policy.tolerate(BpchError::UnsupportedFileType {
            path: path.to_path_buf(),
            file_type: file_type.clone(),
        })?;
    }

    let title = reader.read_fixed(TITLE_LEN, "title")?.text(TITLE_LEN);
    let data_start = reader.position()?;
    let model = ModelRecord::read(reader)?;
    reader.seek_to(data_start)?;

    debug!(
        "Parsed header for {}: type='{}', title='{}', model='{}', data_start={}",
        path.display(),
        file_type,
        title,
        model.model_name,
        data_start
    );

    Ok(FileHeader {
        file_type,
        title,
        model,
        data_start,
    })
}
