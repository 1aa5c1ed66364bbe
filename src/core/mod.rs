//! Core reconciliation functionality
//!
//! This module contains the variant record parser, the position-based
//! stream aligner, the genotype classifier, and the merge driver.

mod align;
mod error;
pub mod io;
mod merge;
mod reconcile;
mod record;

pub use align::{AlignedPair, RecordStream, StreamAligner};
pub use error::{
    FlagError, ReconcileError, ReconcileResult, RecordParseError, RecordResult, Result,
};
pub use io::{detect_compression, open_variant_reader, CompressionFormat, DEFAULT_BUFFER_SIZE};
pub use merge::{flag_calls, MergeStats, IM_FORMAT_HEADER};
pub use reconcile::{
    normalize_source_gq, normalize_source_gt, reconcile, AllelePair, GenotypeCall, ImFlag,
};
pub use record::{
    sample_subfield, FormatIndex, VariantRecord, FIRST_SAMPLE_FIELD, FIXED_FIELDS, FORMAT_FIELD,
};
