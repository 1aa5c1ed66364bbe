//! Synchronized stream alignment
//!
//! Pairs records from the unfiltered and imputed streams by genomic
//! position. Both inputs are position-ascending-sorted; the unfiltered
//! cursor only ever moves forward, discarding sites that were removed by
//! pre-imputation quality filtering. Any position the cursor cannot reach
//! is a fatal misalignment.

use crate::core::error::{FlagError, RecordParseError, Result};
use crate::core::record::VariantRecord;
use std::io::BufRead;

/// Pull-based producer of variant records from one input stream
///
/// Header lines must already have been consumed; `header_lines` keeps the
/// reported line numbers aligned with the original file.
pub struct RecordStream<R: BufRead> {
    reader: R,
    file: &'static str,
    line_no: usize,
}

impl<R: BufRead> RecordStream<R> {
    /// Wrap a reader positioned at the first data line
    pub fn new(reader: R, file: &'static str) -> Self {
        Self::with_offset(reader, file, 0)
    }

    /// Wrap a reader, accounting for already-consumed header lines
    pub fn with_offset(reader: R, file: &'static str, header_lines: usize) -> Self {
        Self {
            reader,
            file,
            line_no: header_lines,
        }
    }

    /// Input label used in diagnostics
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Line number of the most recently returned record
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Read and parse the next data line, skipping blank lines
    pub fn next_record(&mut self) -> Result<Option<VariantRecord>> {
        loop {
            let mut line = String::with_capacity(256);
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }

            return VariantRecord::parse(line).map(Some).map_err(|source| {
                FlagError::Record {
                    file: self.file,
                    line: self.line_no,
                    source,
                }
            });
        }
    }
}

/// One position-aligned pair of records
#[derive(Debug, Clone)]
pub struct AlignedPair {
    /// Record from the unfiltered (pre-filter) stream
    pub unfiltered: VariantRecord,
    /// Record from the imputed stream
    pub imputed: VariantRecord,
    /// GQ position within the unfiltered record's FORMAT column
    pub source_gq_index: usize,
}

/// Aligns the unfiltered and imputed record streams position by position
pub struct StreamAligner<U: BufRead, I: BufRead> {
    unfiltered: RecordStream<U>,
    imputed: RecordStream<I>,
    skipped: usize,
}

impl<U: BufRead, I: BufRead> StreamAligner<U, I> {
    pub fn new(unfiltered: RecordStream<U>, imputed: RecordStream<I>) -> Self {
        Self {
            unfiltered,
            imputed,
            skipped: 0,
        }
    }

    /// Number of unfiltered sites discarded so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Produce the next aligned pair, or `None` at imputed end-of-stream
    ///
    /// An exhausted imputed stream ends alignment cleanly. An unfiltered
    /// stream that runs out, or overshoots, before reaching the current
    /// imputed position is a fatal [`FlagError::Misalignment`].
    pub fn next_pair(&mut self) -> Result<Option<AlignedPair>> {
        let imputed = match self.imputed.next_record()? {
            Some(record) => record,
            None => return Ok(None),
        };

        let mut unfiltered = match self.unfiltered.next_record()? {
            Some(record) => record,
            None => {
                return Err(FlagError::Misalignment {
                    unfiltered: "<end of stream>".to_string(),
                    imputed: imputed.line().to_string(),
                })
            }
        };

        // Skip sites removed by pre-imputation filtering
        while unfiltered.pos < imputed.pos {
            log::debug!(
                "skipping filtered site {}:{}",
                unfiltered.chrom(),
                unfiltered.pos
            );
            self.skipped += 1;
            unfiltered = match self.unfiltered.next_record()? {
                Some(record) => record,
                None => {
                    return Err(FlagError::Misalignment {
                        unfiltered: "<end of stream>".to_string(),
                        imputed: imputed.line().to_string(),
                    })
                }
            };
        }

        if unfiltered.pos != imputed.pos {
            return Err(FlagError::Misalignment {
                unfiltered: unfiltered.line().to_string(),
                imputed: imputed.line().to_string(),
            });
        }

        if unfiltered.sample_count() != imputed.sample_count() {
            return Err(FlagError::SampleCount {
                chrom: unfiltered.chrom().to_string(),
                pos: unfiltered.pos,
                unfiltered: unfiltered.sample_count(),
                imputed: imputed.sample_count(),
            });
        }

        // GQ is only required on the unfiltered side; imputation output
        // typically carries a bare GT FORMAT.
        let source_gq_index = match unfiltered.format.gq {
            Some(index) => index,
            None => {
                return Err(FlagError::Record {
                    file: self.unfiltered.file(),
                    line: self.unfiltered.line_no(),
                    source: RecordParseError::MissingFormatKey {
                        format: unfiltered.format_keys().to_string(),
                        key: "GQ",
                    },
                })
            }
        };

        Ok(Some(AlignedPair {
            unfiltered,
            imputed,
            source_gq_index,
        }))
    }
}
