//! Error types for imflag
//!
//! Defines all error types used throughout the library.

use thiserror::Error;

/// Main error type for a flagging run
///
/// Every variant is fatal: the merge never resynchronizes after a detected
/// inconsistency, because continuing past a misaligned join key would
/// desynchronize all subsequent output. Output already written to stdout
/// stays in place.
#[derive(Debug, Error)]
pub enum FlagError {
    /// The two streams could not be synchronized at some position
    #[error("Variants in VCF input files differ:\nFile 1:\n{unfiltered}\nFile 2:\n{imputed}")]
    Misalignment {
        /// Current unfiltered line, or an end-of-stream marker
        unfiltered: String,
        /// Current imputed line
        imputed: String,
    },

    /// Aligned records carry differing sample counts
    #[error("File1 and file2 have different number of samples at position: {chrom}:{pos} ({unfiltered} vs {imputed})")]
    SampleCount {
        chrom: String,
        pos: u64,
        unfiltered: usize,
        imputed: usize,
    },

    /// A data line could not be parsed into a variant record
    #[error("Invalid variant record in {file} at line {line}: {source}")]
    Record {
        file: &'static str,
        line: usize,
        #[source]
        source: RecordParseError,
    },

    /// A sample column has fewer values than its FORMAT index requires
    #[error("Sample {sample} at {chrom}:{pos} is missing the {key} value declared by FORMAT")]
    TruncatedSample {
        chrom: String,
        pos: u64,
        sample: usize,
        key: &'static str,
    },

    /// A sample's genotypes could not be reconciled
    #[error("Cannot reconcile sample {sample} at {chrom}:{pos}: {source}")]
    Reconcile {
        chrom: String,
        pos: u64,
        sample: usize,
        #[source]
        source: ReconcileError,
    },

    /// Header block ended without a column-header (#CHROM) line
    #[error("{file} has no column-header line before variant data")]
    MissingColumnHeader { file: &'static str },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while parsing one variant line
#[derive(Debug, Error)]
pub enum RecordParseError {
    /// Empty line
    #[error("empty line")]
    EmptyLine,

    /// Not enough tab-separated columns
    #[error("too few fields: expected at least {expected}, found {found}")]
    TooFewFields { expected: usize, found: usize },

    /// POS column is not a non-negative integer
    #[error("invalid POS value '{0}'")]
    InvalidPos(String),

    /// FORMAT column lacks a required key
    #[error("FORMAT column '{format}' is missing the {key} key")]
    MissingFormatKey { format: String, key: &'static str },
}

/// Errors that can occur while classifying one sample's genotypes
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Genotype is not a diploid call with single-character alleles
    #[error("unsupported genotype '{gt}': only diploid genotypes with single-digit alleles are supported")]
    UnsupportedGenotype { gt: String },

    /// GQ value is neither '.' nor an integer
    #[error("invalid GQ value '{value}'")]
    InvalidQuality { value: String },
}

/// Result type alias for flagging operations
pub type Result<T> = std::result::Result<T, FlagError>;

/// Result type alias for record parsing
pub type RecordResult<T> = std::result::Result<T, RecordParseError>;

/// Result type alias for genotype reconciliation
pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;
