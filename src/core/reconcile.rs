//! Genotype reconciliation
//!
//! Compares one sample's pre-filter sequencing genotype against its imputed
//! genotype and classifies the relationship as an IM flag. The classifier is
//! a pure function of (source GT, source GQ, imputed GT), independent of the
//! stream alignment, and uses the generalized allele-pair comparison
//! uniformly for all genotypes.
//!
//! Allele pairs are order-normalized, so `0|1` and `1|0` compare equal.
//! Only diploid genotypes with single-character allele symbols (0-9 or `.`)
//! are supported; multi-allelic sites with two-digit allele indices are
//! rejected rather than silently misclassified.

use crate::core::error::{ReconcileError, ReconcileResult};
use std::fmt;

/// Missing allele symbol
const MISSING: u8 = b'.';

/// Agreement classification between a source call and its imputed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ImFlag {
    /// Imputed genotype matches the original call
    OriginalCall = 0,
    /// Original call was missing, or was completed without conflict
    Imputed = 1,
    /// Original heterozygous call disagrees with the imputed call
    HetDisagreement = 2,
    /// Original homozygous call shares no allele with the imputed call
    HomDisagreement = 3,
}

impl ImFlag {
    /// Numeric value written to the IM sub-field
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ImFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Order-normalized allele pair of a diploid genotype
///
/// Holds the two allele symbols in sorted order, making comparisons
/// insensitive to allele order and phasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllelePair(u8, u8);

impl AllelePair {
    /// Build the pair from a genotype string like `0/1`, `1|0` or `./.`
    ///
    /// Rejects anything that is not three characters with a `/` or `|`
    /// separator: haploid calls, and multi-allelic genotypes whose allele
    /// indices exceed one digit.
    pub fn from_gt(gt: &str) -> ReconcileResult<Self> {
        let bytes = gt.as_bytes();
        if bytes.len() != 3 || !(bytes[1] == b'/' || bytes[1] == b'|') {
            return Err(ReconcileError::UnsupportedGenotype { gt: gt.to_string() });
        }
        let (a, b) = if bytes[0] <= bytes[2] {
            (bytes[0], bytes[2])
        } else {
            (bytes[2], bytes[0])
        };
        Ok(Self(a, b))
    }

    /// Whether the two alleles differ
    pub fn is_het(self) -> bool {
        self.0 != self.1
    }

    /// Whether both alleles are the missing symbol
    pub fn is_missing(self) -> bool {
        self.0 == MISSING && self.1 == MISSING
    }

    /// Whether either allele equals the given symbol
    pub fn contains(self, allele: u8) -> bool {
        self.0 == allele || self.1 == allele
    }
}

/// Normalize a source genotype string
///
/// Phase bars become unphased separators, a bare missing token becomes
/// `./.`, and `1/0` is canonicalized to `0/1`. Other heterozygous orderings
/// are deliberately left as-is; the allele-pair comparison is order
/// insensitive anyway.
pub fn normalize_source_gt(gt: &str) -> String {
    let gt = if gt == "." { "./." } else { gt };
    let gt = gt.replace('|', "/");
    if gt == "1/0" {
        "0/1".to_string()
    } else {
        gt
    }
}

/// Normalize a source genotype quality: missing (`.`) becomes 0
pub fn normalize_source_gq(gq: &str) -> ReconcileResult<u32> {
    if gq == "." {
        return Ok(0);
    }
    gq.parse().map_err(|_| ReconcileError::InvalidQuality {
        value: gq.to_string(),
    })
}

/// One sample's reconciled genotype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenotypeCall {
    /// Normalized pre-filter genotype
    pub source_gt: String,
    /// Normalized pre-filter genotype quality
    pub source_gq: u32,
    /// Imputed genotype, kept in its original (typically phased) notation
    pub imputed_gt: String,
    /// Agreement classification
    pub flag: ImFlag,
}

/// Reconcile one sample's source call against its imputed call
///
/// Classification precedence:
/// 1. heterozygous source whose allele pair differs from the imputed pair
///    -> [`ImFlag::HetDisagreement`];
/// 2. non-missing homozygous source where neither imputed allele matches
///    -> [`ImFlag::HomDisagreement`];
/// 3. identical allele pairs -> [`ImFlag::OriginalCall`];
/// 4. everything else (missing or non-conflicting completion)
///    -> [`ImFlag::Imputed`].
///
/// The emitted genotype is always the imputed one; the flag records
/// provenance and agreement, not a selection decision.
pub fn reconcile(
    raw_source_gt: &str,
    raw_source_gq: &str,
    imputed_gt: &str,
) -> ReconcileResult<GenotypeCall> {
    let source_gt = normalize_source_gt(raw_source_gt);
    let source_gq = normalize_source_gq(raw_source_gq)?;

    let source = AllelePair::from_gt(&source_gt)?;
    let imputed = AllelePair::from_gt(imputed_gt)?;

    let flag = if source.is_het() && source != imputed {
        ImFlag::HetDisagreement
    } else if !source.is_het() && !source.is_missing() && !imputed.contains(source.0) {
        ImFlag::HomDisagreement
    } else if source == imputed {
        ImFlag::OriginalCall
    } else {
        ImFlag::Imputed
    };

    Ok(GenotypeCall {
        source_gt,
        source_gq,
        imputed_gt: imputed_gt.to_string(),
        flag,
    })
}
