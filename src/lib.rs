//! imflag - reconcile imputed VCF genotypes with their unfiltered originals
//!
//! Merges a post-imputation VCF with the unfiltered pre-imputation VCF it
//! was derived from, emitting the imputed genotypes annotated with a
//! per-sample `IM` flag (0-3) that classifies agreement between the
//! original sequencing call and the imputed call.
//!
//! # Features
//!
//! - Single pass, O(1) memory in the number of sites
//! - Transparent gzip/bzip2 input decompression
//! - Fail-fast on stream misalignment or sample-count mismatch
//!
//! # Example
//!
//! ```ignore
//! use imflag::core::{flag_calls, open_variant_reader};
//!
//! let unfiltered = open_variant_reader("unfiltered.vcf.gz".as_ref())?;
//! let imputed = open_variant_reader("imputed.vcf.gz".as_ref())?;
//!
//! let mut out = std::io::stdout().lock();
//! let stats = flag_calls(unfiltered, imputed, &mut out)?;
//! eprintln!("{} sites written", stats.sites);
//! ```

pub mod core;

// Re-export commonly used types
pub use self::core::{
    flag_calls, open_variant_reader, reconcile, AlignedPair, AllelePair, FlagError, GenotypeCall,
    ImFlag, MergeStats, Result, StreamAligner, VariantRecord,
};
