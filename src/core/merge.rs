//! Merge pipeline
//!
//! Drives the full reconciliation: header passthrough with IM injection,
//! position alignment of the two streams, per-sample genotype
//! classification, and incremental output. One record pair lives in memory
//! at a time, keeping the footprint independent of the number of sites.

use crate::core::align::{AlignedPair, RecordStream, StreamAligner};
use crate::core::error::{FlagError, Result};
use crate::core::reconcile::{reconcile, ImFlag};
use crate::core::record::sample_subfield;
use std::io::{BufRead, Write};

/// Meta-header line declaring the IM per-sample annotation
pub const IM_FORMAT_HEADER: &str = "##FORMAT=<ID=IM,Number=1,Type=Integer,Description=\"Indicates whether GT was original call (0), imputed (1) or in disagreement with filtered heterozygous (2) or homozygous call (3).\">";

/// Diagnostic label for the unfiltered input
const UNFILTERED: &str = "file 1 (unfiltered)";

/// Diagnostic label for the imputed input
const IMPUTED: &str = "file 2 (imputed)";

/// Counters for one merge run
#[derive(Debug, Default, Clone)]
pub struct MergeStats {
    /// Aligned sites written to output
    pub sites: usize,
    /// Unfiltered sites absent from the imputed stream
    pub skipped: usize,
    /// Per-flag sample counts, indexed by IM value
    pub flags: [usize; 4],
}

impl MergeStats {
    /// Total samples classified with the given flag
    pub fn flagged(&self, flag: ImFlag) -> usize {
        self.flags[flag.as_u8() as usize]
    }
}

/// Copy the unfiltered header block to output, injecting the IM definition
///
/// Every `##` meta-header is copied verbatim; the IM FORMAT definition goes
/// immediately before the first pre-existing `##FORMAT` line. The single
/// column-header line is copied last. Returns the number of lines consumed.
fn copy_headers<R: BufRead, W: Write>(reader: &mut R, out: &mut W) -> Result<usize> {
    let mut injected = false;
    let mut lines = 0;
    let mut buf = String::with_capacity(256);

    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            return Err(FlagError::MissingColumnHeader { file: UNFILTERED });
        }
        lines += 1;
        let line = buf.trim_end_matches(|c| c == '\n' || c == '\r');

        if line.starts_with("##") {
            if !injected && line.starts_with("##FORMAT") {
                writeln!(out, "{}", IM_FORMAT_HEADER)?;
                injected = true;
            }
            writeln!(out, "{}", line)?;
        } else if line.starts_with('#') {
            // Column-header line ends the header block
            writeln!(out, "{}", line)?;
            return Ok(lines);
        } else {
            return Err(FlagError::MissingColumnHeader { file: UNFILTERED });
        }
    }
}

/// Advance the imputed stream past its header block, emitting nothing
///
/// Returns the number of lines consumed.
fn skip_headers<R: BufRead>(reader: &mut R) -> Result<usize> {
    let mut lines = 0;
    let mut buf = String::with_capacity(256);

    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            return Err(FlagError::MissingColumnHeader { file: IMPUTED });
        }
        lines += 1;
        let line = buf.trim_end_matches(|c| c == '\n' || c == '\r');

        if line.starts_with("##") {
            continue;
        } else if line.starts_with('#') {
            return Ok(lines);
        } else {
            return Err(FlagError::MissingColumnHeader { file: IMPUTED });
        }
    }
}

/// Write one annotated output line for an aligned pair
fn write_site<W: Write>(pair: &AlignedPair, out: &mut W, stats: &mut MergeStats) -> Result<()> {
    let unfiltered = &pair.unfiltered;
    let imputed = &pair.imputed;

    write!(
        out,
        "{}\t{}:IM",
        unfiltered.fixed_fields(),
        unfiltered.format_keys()
    )?;

    for (index, (source, target)) in unfiltered.samples().zip(imputed.samples()).enumerate() {
        let truncated = |key| FlagError::TruncatedSample {
            chrom: unfiltered.chrom().to_string(),
            pos: unfiltered.pos,
            sample: index,
            key,
        };

        let raw_gt = sample_subfield(source, unfiltered.format.gt).ok_or_else(|| truncated("GT"))?;
        let raw_gq = sample_subfield(source, pair.source_gq_index).ok_or_else(|| truncated("GQ"))?;
        let imputed_gt =
            sample_subfield(target, imputed.format.gt).ok_or_else(|| truncated("GT"))?;

        let call = reconcile(raw_gt, raw_gq, imputed_gt).map_err(|source| FlagError::Reconcile {
            chrom: unfiltered.chrom().to_string(),
            pos: unfiltered.pos,
            sample: index,
            source,
        })?;
        stats.flags[call.flag.as_u8() as usize] += 1;

        // Imputed GT, then the unfiltered non-GT values (GQ in normalized
        // form), then the flag
        write!(out, "\t{}", imputed_gt)?;
        for (sub_index, value) in source.split(':').enumerate().skip(1) {
            if sub_index == pair.source_gq_index {
                write!(out, ":{}", call.source_gq)?;
            } else {
                write!(out, ":{}", value)?;
            }
        }
        write!(out, ":{}", call.flag)?;
    }
    writeln!(out)?;

    Ok(())
}

/// Run the full reconciliation over two opened input streams
///
/// Output lines are written incrementally; on error, everything already
/// written stays in place (partial output is the accepted degraded
/// outcome).
pub fn flag_calls<U: BufRead, I: BufRead, W: Write>(
    mut unfiltered: U,
    mut imputed: I,
    out: &mut W,
) -> Result<MergeStats> {
    let unfiltered_header_lines = copy_headers(&mut unfiltered, out)?;
    let imputed_header_lines = skip_headers(&mut imputed)?;

    let mut aligner = StreamAligner::new(
        RecordStream::with_offset(unfiltered, UNFILTERED, unfiltered_header_lines),
        RecordStream::with_offset(imputed, IMPUTED, imputed_header_lines),
    );

    let mut stats = MergeStats::default();
    while let Some(pair) = aligner.next_pair()? {
        write_site(&pair, out, &mut stats)?;
        stats.sites += 1;
    }
    stats.skipped = aligner.skipped();

    log::debug!(
        "merge complete: {} sites written, {} skipped",
        stats.sites,
        stats.skipped
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const UNFILTERED_VCF: &str = "\
##fileformat=VCFv4.2\n\
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description=\"Genotype Quality\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n\
chr1\t100\t.\tA\tG\t50\tPASS\tDP=30\tGT:GQ\t0/1:30\t0/0:40\n\
chr1\t150\t.\tC\tT\t10\tLowQual\tDP=5\tGT:GQ\t0/1:5\t0/1:4\n\
chr1\t200\t.\tG\tA\t60\tPASS\tDP=28\tGT:GQ\t./.:.\t1/1:55\n";

    const IMPUTED_VCF: &str = "\
##fileformat=VCFv4.2\n\
##source=imputation\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n\
chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t1|1\t0|1\n\
chr1\t200\t.\tG\tA\t.\t.\t.\tGT\t0|0\t1|1\n";

    fn run(unfiltered: &str, imputed: &str) -> (Result<MergeStats>, String) {
        let mut out = Vec::new();
        let result = flag_calls(
            Cursor::new(unfiltered.as_bytes().to_vec()),
            Cursor::new(imputed.as_bytes().to_vec()),
            &mut out,
        );
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_header_passthrough_with_im_injection() {
        let (result, output) = run(UNFILTERED_VCF, IMPUTED_VCF);
        result.unwrap();

        let headers: Vec<&str> = output.lines().filter(|l| l.starts_with('#')).collect();
        assert_eq!(
            headers,
            vec![
                "##fileformat=VCFv4.2",
                "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">",
                IM_FORMAT_HEADER,
                "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">",
                "##FORMAT=<ID=GQ,Number=1,Type=Integer,Description=\"Genotype Quality\">",
                "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2",
            ]
        );
        // Nothing from the imputed header survives
        assert!(!output.contains("##source=imputation"));
    }

    #[test]
    fn test_data_lines() {
        let (result, output) = run(UNFILTERED_VCF, IMPUTED_VCF);
        let stats = result.unwrap();

        let data: Vec<&str> = output.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(
            data,
            vec![
                // S1: het 0/1 vs 1|1 -> flag 2; S2: hom-ref 0/0 vs 0|1 -> flag 1
                "chr1\t100\t.\tA\tG\t50\tPASS\tDP=30\tGT:GQ:IM\t1|1:30:2\t0|1:40:1",
                // Site 150 was filtered before imputation
                // S1: missing source -> flag 1 with GQ normalized; S2: exact agreement -> flag 0
                "chr1\t200\t.\tG\tA\t60\tPASS\tDP=28\tGT:GQ:IM\t0|0:0:1\t1|1:55:0",
            ]
        );

        assert_eq!(stats.sites, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.flags, [1, 2, 1, 0]);
        assert_eq!(stats.flagged(ImFlag::HetDisagreement), 1);
    }

    #[test]
    fn test_no_injection_without_format_header() {
        let unfiltered = "\
##fileformat=VCFv4.2\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
chr1\t100\t.\tA\tG\t.\tPASS\t.\tGT:GQ\t0/1:30\n";
        let imputed = "\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0|1\n";

        let (result, output) = run(unfiltered, imputed);
        result.unwrap();
        assert!(!output.contains("ID=IM"));
    }

    #[test]
    fn test_misalignment_leaves_partial_output() {
        let unfiltered = "\
##fileformat=VCFv4.2\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
chr1\t100\t.\tA\tG\t.\tPASS\t.\tGT:GQ\t0/1:30\n\
chr1\t200\t.\tC\tT\t.\tPASS\t.\tGT:GQ\t1/1:40\n";
        let imputed = "\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0|1\n\
chr1\t150\t.\tC\tT\t.\t.\t.\tGT\t1|1\n";

        let (result, output) = run(unfiltered, imputed);
        assert!(matches!(result, Err(FlagError::Misalignment { .. })));

        // The pair at 100 was already written and stays in place
        let data: Vec<&str> = output.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(data, vec!["chr1\t100\t.\tA\tG\t.\tPASS\t.\tGT:GQ:IM\t0|1:30:0"]);
    }

    #[test]
    fn test_missing_column_header_is_fatal() {
        let unfiltered = "##fileformat=VCFv4.2\nchr1\t100\t.\tA\tG\t.\t.\t.\tGT:GQ\t0/1:30\n";
        let imputed = "#CHROM\tPOS\nchr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0|1\n";

        let (result, _) = run(unfiltered, imputed);
        assert!(matches!(
            result,
            Err(FlagError::MissingColumnHeader { .. })
        ));
    }

    #[test]
    fn test_extra_format_values_carried_from_unfiltered() {
        let unfiltered = "\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
chr1\t100\t.\tA\tG\t.\tPASS\t.\tGT:AD:DP:GQ:PL\t0/1:12,8:20:30:50,0,20\n";
        let imputed = "\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
chr1\t100\t.\tA\tG\t.\t.\t.\tGT:DS\t1|1:1.9\n";

        let (result, output) = run(unfiltered, imputed);
        result.unwrap();

        let data: Vec<&str> = output.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(
            data,
            vec!["chr1\t100\t.\tA\tG\t.\tPASS\t.\tGT:AD:DP:GQ:PL:IM\t1|1:12,8:20:30:50,0,20:2"]
        );
    }

    #[test]
    fn test_truncated_sample_is_fatal() {
        let unfiltered = "\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
chr1\t100\t.\tA\tG\t.\tPASS\t.\tGT:GQ\t0/1\n";
        let imputed = "\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0|1\n";

        let (result, _) = run(unfiltered, imputed);
        assert!(matches!(
            result,
            Err(FlagError::TruncatedSample { key: "GQ", .. })
        ));
    }
}
