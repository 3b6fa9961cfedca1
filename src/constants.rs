//! Format constants, default file names and physical constants used
//! throughout the BPCH reader.

// =============================================================================
// File Format
// =============================================================================

/// File type tag written by GEOS-Chem into the first record
pub const FILE_TYPE_TAG: &str = "CTM bin 02";

/// Length of the file type record
pub const FILE_TYPE_LEN: usize = 40;

/// Length of the title record
pub const TITLE_LEN: usize = 80;

/// Per-block model record: a20, f32 x 2, i32, i32
pub const MODEL_RECORD_LEN: usize = 36;

/// Per-block header record: a40, i32, a40, f64, f64, a40, i32 x 6, i32
pub const BLOCK_HEADER_LEN: usize = 168;

/// Number of entries in the block dimension vector
pub const BLOCK_DIMS: usize = 6;

// =============================================================================
// Metadata Tables
// =============================================================================

/// Default tracer table file name, looked up next to the input file
pub const DEFAULT_TRACER_TABLE: &str = "tracerinfo.dat";

/// Default category table file name, looked up next to the input file
pub const DEFAULT_CATEGORY_TABLE: &str = "diaginfo.dat";

/// Sentinel path value meaning "use the default table next to the input"
pub const DEFAULT_PATH_SENTINEL: &str = "default";

/// Synthetic category used when the category table is empty
pub const UNCATEGORIZED_NAME: &str = "data";

/// Tracer name of the surface pressure field used for pressure levels
pub const SURFACE_PRESSURE_TRACER: &str = "PSURF";

/// Special file kinds recognised from the title line
pub mod file_kinds {
    /// Title fragment identifying a PSC state file
    pub const PSC_STATE_TITLE: &str = "psc state";

    /// Title fragments identifying a CSPEC checkpoint file
    pub const CSPEC_TITLE: &str = "cspec";
    pub const CHECKPOINT_TITLE: &str = "checkpoint";

    pub const PSC_CATEGORY: &str = "STATE-PSC";
    pub const PSC_TRACER: &str = "STATE_PSC";

    pub const CSPEC_CATEGORY: &str = "IJ-CHK-$";
    pub const CSPEC_TRACER: &str = "CSPEC";
}

// =============================================================================
// Time
// =============================================================================

/// Julian day number of 1985-01-01 00:00 UTC, the tau epoch
pub const EPOCH_DAY_NUMBER: f64 = 2_446_066.5;

pub const HOURS_PER_DAY: f64 = 24.0;

// =============================================================================
// Physical Constants
// =============================================================================

/// Earth radius in metres
pub const EARTH_RADIUS_M: f64 = 6.375e6;

/// Top-of-atmosphere pressure in hPa
pub const TOA_PRESSURE_HPA: f64 = 0.01;

/// Tolerance when comparing the top pressure level against the TOA
pub const TOA_TOLERANCE: f64 = 1e-6;
