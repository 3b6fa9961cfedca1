//! Structural scan (Pass 1).
//!
//! Walks every data block without decoding payloads and counts how many
//! time samples each (category, tracer) pair has. The materializer sizes
//! its arrays from these counts.

use crate::error::{BpchError, Result};
use crate::header::DataBlockHeader;
use crate::metadata::{CategoryMode, DiagnosticCategory, MetadataTables, TracerDefinition};
use crate::policy::{ErrorPolicy, Outcome};
use crate::record::RecordReader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use tracing::{debug, info};

/// Outcome of matching a block header against the metadata tables
#[derive(Debug)]
pub(crate) enum Resolution<'t> {
    Resolved {
        category: &'t DiagnosticCategory,
        tracer: &'t TracerDefinition,
    },
    MissingCategory,
    MissingTracer {
        category: &'t DiagnosticCategory,
        number: i32,
    },
}

/// Resolve a block's category and tracer
pub(crate) fn resolve_block<'t>(
    tables: &'t MetadataTables,
    mode: CategoryMode,
    block: &DataBlockHeader,
) -> Resolution<'t> {
    let Some(category) = tables.resolve_category(mode, &block.category) else {
        return Resolution::MissingCategory;
    };
    // a number past i32::MAX cannot be in any table
    let Some(number) = category.offset.checked_add(block.tracer) else {
        return Resolution::MissingTracer {
            category,
            number: block.tracer,
        };
    };
    match tables.tracer(number) {
        Some(tracer) => Resolution::Resolved { category, tracer },
        None => Resolution::MissingTracer { category, number },
    }
}

/// What Pass 1 learned about one (category, tracer) pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairSummary {
    pub category: String,
    pub tracer_number: i32,
    pub tracer_name: String,
    pub dims: Vec<usize>,
    pub unit: String,
    pub molecular_weight: f64,
    pub carbon: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
struct CategoryTally {
    blocks: usize,
    tracers: usize,
}

/// Result of the structural scan
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub mode: CategoryMode,
    pub data_start: u64,
    pub data_end: u64,
    pub blocks_seen: usize,
    pub blocks_skipped: usize,
    pairs: Vec<PairSummary>,
    pair_index: HashMap<(String, i32), usize>,
    tallies: Vec<(String, CategoryTally)>,
}

impl ScanSummary {
    fn new(mode: CategoryMode, data_start: u64, data_end: u64) -> Self {
        Self {
            mode,
            data_start,
            data_end,
            blocks_seen: 0,
            blocks_skipped: 0,
            pairs: Vec::new(),
            pair_index: HashMap::new(),
            tallies: Vec::new(),
        }
    }

    /// Pairs in first-occurrence order
    pub fn pairs(&self) -> &[PairSummary] {
        &self.pairs
    }

    pub fn pair(&self, category: &str, tracer_number: i32) -> Option<&PairSummary> {
        self.pair_index
            .get(&(category.to_string(), tracer_number))
            .map(|&idx| &self.pairs[idx])
    }

    /// Samples per category: raw block tally divided by the number of
    /// distinct tracers; non-finite results count as zero
    pub fn category_samples(&self, category: &str) -> usize {
        self.tallies
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, tally)| normalized_count(tally.blocks, tally.tracers))
            .unwrap_or(0)
    }

    /// Total number of blocks Pass 2 will write
    pub fn total_samples(&self) -> usize {
        self.pairs.iter().map(|p| p.count).sum()
    }

    fn tally_mut(&mut self, category: &str) -> &mut CategoryTally {
        let idx = match self.tallies.iter().position(|(name, _)| name == category) {
            Some(idx) => idx,
            None => {
                self.tallies
                    .push((category.to_string(), CategoryTally::default()));
                self.tallies.len() - 1
            }
        };
        &mut self.tallies[idx].1
    }

    fn record(
        &mut self,
        category: &DiagnosticCategory,
        tracer: &TracerDefinition,
        block: &DataBlockHeader,
    ) -> Result<()> {
        let dims = block.effective_dims();
        let key = (category.name.clone(), tracer.number);

        match self.pair_index.get(&key) {
            Some(&idx) => {
                let pair = &mut self.pairs[idx];
                if pair.dims != dims {
                    return Err(BpchError::DimensionMismatch {
                        category: category.name.clone(),
                        tracer: tracer.name.clone(),
                        expected: pair.dims.clone(),
                        found: dims,
                    });
                }
                pair.count += 1;
            }
            None => {
                debug!(
                    "New series {}/{} (number {}), dims {:?}",
                    category.name, tracer.name, tracer.number, dims
                );
                self.pair_index.insert(key, self.pairs.len());
                self.pairs.push(PairSummary {
                    category: category.name.clone(),
                    tracer_number: tracer.number,
                    tracer_name: tracer.name.clone(),
                    dims,
                    unit: if block.unit.is_empty() {
                        tracer.unit.clone()
                    } else {
                        block.unit.clone()
                    },
                    molecular_weight: tracer.molecular_weight,
                    carbon: tracer.carbon,
                    count: 1,
                });
                self.tally_mut(&category.name).tracers += 1;
            }
        }

        self.tally_mut(&category.name).blocks += 1;
        Ok(())
    }
}

fn normalized_count(blocks: usize, tracers: usize) -> usize {
    let samples = blocks as f64 / tracers as f64;
    if samples.is_finite() {
        samples as usize
    } else {
        0
    }
}

/// Run Pass 1 from `data_start` to the end of the file
pub fn scan<R: Read + Seek>(
    reader: &mut RecordReader<R>,
    data_start: u64,
    tables: &MetadataTables,
    mode: CategoryMode,
    policy: &ErrorPolicy,
) -> Result<ScanSummary> {
    reader.seek_to(data_start)?;
    let data_end = reader.end_offset()?;
    let mut summary = ScanSummary::new(mode, data_start, data_end);

    while reader.position()? < data_end {
        reader.skip_record("model record")?;
        let block = DataBlockHeader::read(reader)?;
        let payload_len = reader.skip_record("payload")?;
        check_payload_size(&block, payload_len)?;
        summary.blocks_seen += 1;

        let outcome = match resolve_block(tables, mode, &block) {
            Resolution::Resolved { category, tracer } => Outcome::Resolved((category, tracer)),
            Resolution::MissingCategory => policy.skip(BpchError::MissingCategory {
                category: block.category.clone(),
            })?,
            Resolution::MissingTracer { category, number } => {
                policy.skip(BpchError::MissingTracer {
                    category: category.name.clone(),
                    number,
                })?
            }
        };

        match outcome {
            Outcome::Resolved((category, tracer)) => summary.record(category, tracer, &block)?,
            Outcome::Skipped => summary.blocks_skipped += 1,
        }
    }

    check_uniform_sampling(&summary, policy)?;

    if policy.is_verbose() {
        info!(
            "Pass 1: {} blocks, {} skipped, {} series",
            summary.blocks_seen,
            summary.blocks_skipped,
            summary.pairs.len()
        );
    } else {
        debug!(
            "Pass 1: {} blocks, {} skipped, {} series",
            summary.blocks_seen,
            summary.blocks_skipped,
            summary.pairs.len()
        );
    }

    Ok(summary)
}

/// The payload record must hold exactly the values the declared dims describe
fn check_payload_size(block: &DataBlockHeader, payload_len: usize) -> Result<()> {
    let dims = block.effective_dims();
    let expected = block.element_count();
    let matches = expected
        .and_then(|count| count.checked_mul(size_of::<f32>()))
        .is_some_and(|bytes| bytes == payload_len);
    if matches {
        return Ok(());
    }
    Err(BpchError::PayloadSize {
        category: block.category.clone(),
        tracer: block.tracer.to_string(),
        dims,
        expected: expected.unwrap_or(usize::MAX),
        found: payload_len / size_of::<f32>(),
    })
}

/// Every tracer in a category must have the category's sample count
fn check_uniform_sampling(summary: &ScanSummary, policy: &ErrorPolicy) -> Result<()> {
    for pair in &summary.pairs {
        let expected = summary.category_samples(&pair.category);
        if pair.count != expected {
            policy.tolerate(BpchError::NonUniformSampling {
                category: pair.category.clone(),
                tracer: pair.tracer_name.clone(),
                expected,
                found: pair.count,
            })?;
        }
    }
    Ok(())
}
