//! Synthetic BPCH files and metadata tables for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TYPE_TAG: &str = "CTM bin 02";

/// One data block to write
#[derive(Debug, Clone)]
pub struct Block {
    pub model: String,
    pub resolution: [f32; 2],
    pub category: String,
    pub tracer: i32,
    pub unit: String,
    pub tau0: f64,
    pub tau1: f64,
    pub dims: [i32; 6],
    pub values: Vec<f32>,
}

impl Block {
    pub fn new(category: &str, tracer: i32, tau0: f64, dims: [i32; 3], values: Vec<f32>) -> Self {
        Self {
            model: "GEOS5".to_string(),
            resolution: [5.0, 4.0],
            category: category.to_string(),
            tracer,
            unit: "ppbv".to_string(),
            tau0,
            tau1: tau0 + 24.0,
            dims: [dims[0], dims[1], dims[2], 1, 1, 1],
            values,
        }
    }
}

fn frame(out: &mut Vec<u8>, payload: &[u8]) {
    let len = (payload.len() as i32).to_be_bytes();
    out.extend_from_slice(&len);
    out.extend_from_slice(payload);
    out.extend_from_slice(&len);
}

fn padded(text: &str, width: usize) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(width, b' ');
    bytes
}

/// Byte-level BPCH writer for fixtures
#[derive(Clone)]
pub struct BpchBuilder {
    bytes: Vec<u8>,
}

impl BpchBuilder {
    pub fn new(title: &str) -> Self {
        Self::with_file_type(TYPE_TAG, title)
    }

    pub fn with_file_type(file_type: &str, title: &str) -> Self {
        let mut bytes = Vec::new();
        frame(&mut bytes, &padded(file_type, 40));
        frame(&mut bytes, &padded(title, 80));
        Self { bytes }
    }

    pub fn block(mut self, block: &Block) -> Self {
        let mut model = padded(&block.model, 20);
        model.extend_from_slice(&block.resolution[0].to_be_bytes());
        model.extend_from_slice(&block.resolution[1].to_be_bytes());
        model.extend_from_slice(&1i32.to_be_bytes());
        model.extend_from_slice(&1i32.to_be_bytes());
        frame(&mut self.bytes, &model);

        let payload_len = (block.values.len() * 4) as i32;
        let mut header = padded(&block.category, 40);
        header.extend_from_slice(&block.tracer.to_be_bytes());
        header.extend(padded(&block.unit, 40));
        header.extend_from_slice(&block.tau0.to_be_bytes());
        header.extend_from_slice(&block.tau1.to_be_bytes());
        header.extend(padded("", 40));
        for dim in block.dims {
            header.extend_from_slice(&dim.to_be_bytes());
        }
        header.extend_from_slice(&(payload_len + 8).to_be_bytes());
        frame(&mut self.bytes, &header);

        let payload: Vec<u8> = block.values.iter().flat_map(|v| v.to_be_bytes()).collect();
        frame(&mut self.bytes, &payload);
        self
    }

    pub fn blocks<'a>(self, blocks: impl IntoIterator<Item = &'a Block>) -> Self {
        blocks.into_iter().fold(self, |builder, block| builder.block(block))
    }

    pub fn write(&self, path: &Path) {
        fs::write(path, &self.bytes).unwrap();
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// (name, full name, molecular weight, carbon, number, scale, unit)
pub type TracerRow<'a> = (&'a str, &'a str, f64, i32, i32, f64, &'a str);

pub fn tracerinfo(rows: &[TracerRow]) -> String {
    let mut out = String::from("# tracerinfo.dat\n#NAME    FULLNAME\n");
    for (name, full, molwt, carbon, number, scale, unit) in rows {
        out.push_str(&format!(
            "{:<8} {:<30}{:>10}{:>3}{:>9}{:>10} {}\n",
            name,
            full,
            format!("{:.3E}", molwt),
            carbon,
            number,
            format!("{:.3E}", scale),
            unit
        ));
    }
    out
}

pub fn diaginfo(rows: &[(i32, &str, &str)]) -> String {
    let mut out = String::from("# diaginfo.dat\n");
    for (offset, name, description) in rows {
        out.push_str(&format!("{:>8} {:<40} {}\n", offset, name, description));
    }
    out
}

/// Temp directory holding `ctm.bpch`, `tracerinfo.dat` and `diaginfo.dat`
pub struct Fixture {
    pub dir: TempDir,
    pub bpch: PathBuf,
}

impl Fixture {
    pub fn new(builder: &BpchBuilder, tracers: &[TracerRow], categories: &[(i32, &str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let bpch = dir.path().join("ctm.bpch");
        builder.write(&bpch);
        fs::write(dir.path().join("tracerinfo.dat"), tracerinfo(tracers)).unwrap();
        fs::write(dir.path().join("diaginfo.dat"), diaginfo(categories)).unwrap();
        Self { dir, bpch }
    }
}

pub fn standard_tracers() -> Vec<TracerRow<'static>> {
    vec![
        ("NOx", "NOx", 0.046, 1, 1, 2.0, "ppbv"),
        ("Ox", "Ozone", 0.048, 1, 2, 1.0, "ppbv"),
        ("CO", "Carbon monoxide", 0.028, 1, 4, 1.0, "ppbv"),
        ("PSURF", "Surface pressure", 0.0, 1, 501, 1.0, "hPa"),
    ]
}

pub fn standard_categories() -> Vec<(i32, &'static str, &'static str)> {
    vec![
        (0, "IJ-AVG-$", "Tracer concentration"),
        (500, "PEDGE-$", "Pressure at level edges"),
    ]
}
