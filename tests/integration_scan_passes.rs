//! Integration tests for the structural scan and the materializer
//!
//! These drive Pass 1 and Pass 2 directly over in-memory BPCH bytes.

mod common;

use bpch_reader::BpchError;
use bpch_reader::header::read_file_header;
use bpch_reader::materializer::materialize;
use bpch_reader::metadata::{
    CategoryMode, FileKind, MetadataTables, parse_category_table, parse_tracer_table,
};
use bpch_reader::policy::ErrorPolicy;
use bpch_reader::record::RecordReader;
use bpch_reader::sanitize::Sanitizer;
use bpch_reader::scanner::scan;
use common::{BpchBuilder, Block, diaginfo, standard_categories, standard_tracers, tracerinfo};
use std::io::Cursor;
use std::path::Path;

fn tables(categories: &[(i32, &str, &str)]) -> MetadataTables {
    let tracers = parse_tracer_table(&tracerinfo(&standard_tracers()), Path::new("t")).unwrap();
    let categories = parse_category_table(&diaginfo(categories), Path::new("d")).unwrap();
    MetadataTables::new(FileKind::Standard, tracers, categories)
}

fn open(builder: BpchBuilder) -> (RecordReader<Cursor<Vec<u8>>>, u64) {
    let mut reader = RecordReader::new(Cursor::new(builder.into_bytes()));
    let header = read_file_header(&mut reader, Path::new("mem.bpch"), &ErrorPolicy::strict(false))
        .unwrap();
    (reader, header.data_start)
}

/// Three tracers interleaved over four time steps
fn interleaved() -> BpchBuilder {
    let mut blocks = Vec::new();
    for step in 0..4 {
        let tau = step as f64 * 24.0;
        for tracer in [1, 2, 4] {
            blocks.push(Block::new(
                "IJ-AVG-$",
                tracer,
                tau,
                [3, 2, 1],
                vec![tracer as f32; 6],
            ));
        }
    }
    BpchBuilder::new("GEOS-CHEM diagnostics").blocks(&blocks)
}

#[test]
fn test_scan_counts_per_pair() {
    let tables = tables(&standard_categories());
    let policy = ErrorPolicy::strict(false);
    let (mut reader, data_start) = open(interleaved());

    let summary = scan(
        &mut reader,
        data_start,
        &tables,
        CategoryMode::Categorized,
        &policy,
    )
    .unwrap();

    assert_eq!(summary.blocks_seen, 12);
    assert_eq!(summary.blocks_skipped, 0);
    assert_eq!(summary.pairs().len(), 3);
    assert_eq!(summary.category_samples("IJ-AVG-$"), 4);
    assert_eq!(summary.category_samples("PEDGE-$"), 0);
    for pair in summary.pairs() {
        assert_eq!(pair.count, 4);
        assert_eq!(pair.dims, vec![3, 2]);
    }
    let order: Vec<i32> = summary.pairs().iter().map(|p| p.tracer_number).collect();
    assert_eq!(order, vec![1, 2, 4]);
}

#[test]
fn test_materialized_counts_match_scan() {
    let tables = tables(&standard_categories());
    let policy = ErrorPolicy::strict(false);
    let (mut reader, data_start) = open(interleaved());

    let summary = scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &policy)
        .unwrap();
    let mut sanitizer = Sanitizer::new(policy);
    let result = materialize(&mut reader, &summary, &tables, &mut sanitizer, &policy).unwrap();

    assert_eq!(result.blocks_written, 12);
    assert!(result.surface_pressure.is_none());
    for pair in summary.pairs() {
        let series = result
            .dataset
            .iter()
            .map(|(_, s)| s)
            .find(|s| s.tracer_number == pair.tracer_number)
            .unwrap();
        assert_eq!(series.sample_count(), pair.count);
        assert_eq!(series.filled(), pair.count);
        assert_eq!(series.data.shape(), &[3, 2, 4]);
    }

    let co = result.dataset.lookup("C_IJ_AVG", "T_CO").unwrap();
    assert!(co.data.iter().all(|&v| v == 4.0));
    let days: Vec<f64> = co.timestamps.iter().map(|t| t.0).collect();
    assert!(days.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_missing_category_table_falls_back_to_data() {
    let tables = tables(&[]);
    assert_eq!(tables.category_mode(), CategoryMode::Uncategorized);
    let policy = ErrorPolicy::strict(false);
    let (mut reader, data_start) = open(interleaved());

    let summary = scan(&mut reader, data_start, &tables, tables.category_mode(), &policy).unwrap();

    // 12 blocks over 3 distinct tracers
    assert_eq!(summary.category_samples("data"), 12 / 3);
    assert!(summary.pairs().iter().all(|p| p.category == "data"));

    let mut sanitizer = Sanitizer::new(policy);
    let result = materialize(&mut reader, &summary, &tables, &mut sanitizer, &policy).unwrap();
    let categories: Vec<&str> = result
        .dataset
        .categories()
        .iter()
        .map(|id| id.as_str())
        .collect();
    assert_eq!(categories, vec!["C_data"]);
    assert_eq!(result.dataset.len(), 3);
}

#[test]
fn test_non_uniform_sampling() {
    let builder = BpchBuilder::new("GEOS-CHEM diagnostics").blocks(&[
        Block::new("IJ-AVG-$", 1, 0.0, [2, 1, 1], vec![1.0, 1.0]),
        Block::new("IJ-AVG-$", 2, 0.0, [2, 1, 1], vec![2.0, 2.0]),
        Block::new("IJ-AVG-$", 1, 24.0, [2, 1, 1], vec![3.0, 3.0]),
    ]);
    let tables = tables(&standard_categories());

    let (mut reader, data_start) = open(builder.clone());
    let strict = ErrorPolicy::strict(false);
    assert!(matches!(
        scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &strict),
        Err(BpchError::NonUniformSampling { .. })
    ));

    let lenient = ErrorPolicy::lenient(false);
    let (mut reader, data_start) = open(builder);
    let summary =
        scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &lenient).unwrap();
    let mut sanitizer = Sanitizer::new(lenient);
    let result = materialize(&mut reader, &summary, &tables, &mut sanitizer, &lenient).unwrap();

    // each series is sized from its own block count
    let nox = result.dataset.lookup("C_IJ_AVG", "T_NOx").unwrap();
    let ox = result.dataset.lookup("C_IJ_AVG", "T_Ox").unwrap();
    assert_eq!(nox.data.shape(), &[2, 2]);
    assert_eq!(ox.data.shape(), &[2, 1]);
    assert!(nox.is_complete() && ox.is_complete());
}

#[test]
fn test_dimension_change_is_fatal() {
    let builder = BpchBuilder::new("GEOS-CHEM diagnostics").blocks(&[
        Block::new("IJ-AVG-$", 1, 0.0, [2, 1, 1], vec![1.0, 1.0]),
        Block::new("IJ-AVG-$", 1, 24.0, [3, 1, 1], vec![1.0, 1.0, 1.0]),
    ]);
    let tables = tables(&standard_categories());
    let policy = ErrorPolicy::lenient(false);
    let (mut reader, data_start) = open(builder);

    match scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &policy) {
        Err(BpchError::DimensionMismatch {
            expected, found, ..
        }) => {
            assert_eq!(expected, vec![2]);
            assert_eq!(found, vec![3]);
        }
        other => panic!("Expected DimensionMismatch error, got {other:?}"),
    }
}

#[test]
fn test_payload_size_mismatch_is_fatal() {
    let builder = BpchBuilder::new("GEOS-CHEM diagnostics").block(&Block::new(
        "IJ-AVG-$",
        1,
        0.0,
        [2, 2, 1],
        vec![1.0, 2.0, 3.0],
    ));
    let tables = tables(&standard_categories());
    let policy = ErrorPolicy::lenient(false);
    let (mut reader, data_start) = open(builder);

    // caught by the scan, before any array is allocated
    assert!(matches!(
        scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &policy),
        Err(BpchError::PayloadSize {
            expected: 4,
            found: 3,
            ..
        })
    ));
}

#[test]
fn test_oversized_dims_are_rejected_by_scan() {
    let mut block = Block::new("IJ-AVG-$", 1, 0.0, [1, 1, 1], vec![1.0]);
    block.dims = [100_000, 100_000, 100_000, 100_000, 1, 1];
    let builder = BpchBuilder::new("GEOS-CHEM diagnostics").block(&block);
    let tables = tables(&standard_categories());
    let policy = ErrorPolicy::lenient(false);
    let (mut reader, data_start) = open(builder);

    match scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &policy) {
        Err(BpchError::PayloadSize { dims, found, .. }) => {
            assert_eq!(dims, vec![100_000; 4]);
            assert_eq!(found, 1);
        }
        other => panic!("Expected PayloadSize error, got {other:?}"),
    }
}

#[test]
fn test_tracer_number_overflow_is_a_missing_tracer() {
    let builder = BpchBuilder::new("GEOS-CHEM diagnostics").blocks(&[
        Block::new("IJ-AVG-$", 1, 0.0, [1, 1, 1], vec![1.0]),
        Block::new("PEDGE-$", i32::MAX - 10, 0.0, [1, 1, 1], vec![2.0]),
    ]);
    let tables = tables(&standard_categories());

    let strict = ErrorPolicy::strict(false);
    let (mut reader, data_start) = open(builder.clone());
    match scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &strict) {
        Err(BpchError::MissingTracer { category, number }) => {
            assert_eq!(category, "PEDGE-$");
            assert_eq!(number, i32::MAX - 10);
        }
        other => panic!("Expected MissingTracer error, got {other:?}"),
    }

    let lenient = ErrorPolicy::lenient(false);
    let (mut reader, data_start) = open(builder);
    let summary =
        scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &lenient).unwrap();
    assert_eq!(summary.blocks_seen, 2);
    assert_eq!(summary.blocks_skipped, 1);

    let mut sanitizer = Sanitizer::new(lenient);
    let result = materialize(&mut reader, &summary, &tables, &mut sanitizer, &lenient).unwrap();
    assert_eq!(result.dataset.len(), 1);
    assert_eq!(result.blocks_written, 1);
}

/// Two table entries named `NOx` with different numbers share one series key
fn duplicate_name_tables() -> MetadataTables {
    let rows = [
        ("NOx", "NOx", 0.046, 1, 1, 1.0, "ppbv"),
        ("NOx", "NOx (second entry)", 0.046, 1, 3, 1.0, "ppbv"),
    ];
    let tracers = parse_tracer_table(&tracerinfo(&rows), Path::new("t")).unwrap();
    let categories =
        parse_category_table(&diaginfo(&standard_categories()), Path::new("d")).unwrap();
    MetadataTables::new(FileKind::Standard, tracers, categories)
}

#[test]
fn test_series_key_collision_strict_and_lenient() {
    let builder = BpchBuilder::new("GEOS-CHEM diagnostics").blocks(&[
        Block::new("IJ-AVG-$", 1, 0.0, [1, 1, 1], vec![1.0]),
        Block::new("IJ-AVG-$", 3, 0.0, [1, 1, 1], vec![3.0]),
    ]);
    let tables = duplicate_name_tables();

    let strict = ErrorPolicy::strict(false);
    let (mut reader, data_start) = open(builder.clone());
    let summary =
        scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &strict).unwrap();
    assert_eq!(summary.pairs().len(), 2);
    let mut sanitizer = Sanitizer::new(strict);
    assert!(matches!(
        materialize(&mut reader, &summary, &tables, &mut sanitizer, &strict),
        Err(BpchError::IdentifierCollision { .. })
    ));

    let lenient = ErrorPolicy::lenient(false);
    let (mut reader, data_start) = open(builder);
    let summary =
        scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &lenient).unwrap();
    let mut sanitizer = Sanitizer::new(lenient);
    let result = materialize(&mut reader, &summary, &tables, &mut sanitizer, &lenient).unwrap();

    // the first number keeps the key, the second block is dropped
    assert_eq!(result.dataset.len(), 1);
    assert_eq!(result.blocks_written, 1);
    let nox = result.dataset.lookup("C_IJ_AVG", "T_NOx").unwrap();
    assert_eq!(nox.tracer_number, 1);
    assert_eq!(nox.data.iter().copied().collect::<Vec<f32>>(), vec![1.0]);
}

#[test]
fn test_surface_pressure_is_tracked() {
    let builder = BpchBuilder::new("GEOS-CHEM diagnostics").blocks(&[
        Block::new("IJ-AVG-$", 1, 0.0, [1, 1, 1], vec![1.0]),
        Block::new("PEDGE-$", 1, 0.0, [1, 1, 1], vec![1000.0]),
    ]);
    let tables = tables(&standard_categories());
    let policy = ErrorPolicy::strict(false);
    let (mut reader, data_start) = open(builder);

    let summary = scan(&mut reader, data_start, &tables, CategoryMode::Categorized, &policy).unwrap();
    let mut sanitizer = Sanitizer::new(policy);
    let result = materialize(&mut reader, &summary, &tables, &mut sanitizer, &policy).unwrap();

    let key = result.surface_pressure.unwrap();
    assert_eq!(key.category.as_str(), "C_PEDGE");
    assert_eq!(key.tracer.as_str(), "T_PSURF");
    assert_eq!(result.dataset.get(&key).unwrap().category, "PEDGE-$");
}
