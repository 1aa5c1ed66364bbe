//! Variant record parsing
//!
//! Parses one tab-separated VCF data line into a [`VariantRecord`] with
//! lazily accessible fields. The FORMAT key list is resolved once per line
//! into a [`FormatIndex`], centralizing the invariant that GT and GQ
//! positions may vary per record and per file.

use crate::core::error::{RecordParseError, RecordResult};
use memchr::memchr;

/// Number of fixed annotation columns (CHROM..INFO)
pub const FIXED_FIELDS: usize = 8;

/// Index of the FORMAT column
pub const FORMAT_FIELD: usize = 8;

/// Index of the first sample column
pub const FIRST_SAMPLE_FIELD: usize = 9;

/// Positions of the GT and GQ keys within one record's FORMAT column
///
/// GT is mandatory; GQ is absent from typical imputation-engine output
/// (e.g. a bare `GT` FORMAT) and only required on the unfiltered side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatIndex {
    /// Position of the GT key
    pub gt: usize,
    /// Position of the GQ key, if declared
    pub gq: Option<usize>,
}

impl FormatIndex {
    /// Resolve key positions from a colon-separated FORMAT string
    pub fn parse(format: &str) -> RecordResult<Self> {
        let gt = format
            .split(':')
            .position(|key| key == "GT")
            .ok_or_else(|| RecordParseError::MissingFormatKey {
                format: format.to_string(),
                key: "GT",
            })?;
        let gq = format.split(':').position(|key| key == "GQ");
        Ok(Self { gt, gq })
    }
}

/// One parsed variant data line
///
/// Owns the line text and the tab-separated field boundaries; all field
/// accessors return slices into the original line. Only POS and the FORMAT
/// key positions are parsed eagerly.
#[derive(Debug, Clone)]
pub struct VariantRecord {
    line: String,
    field_bounds: Vec<(usize, usize)>,
    /// Genomic position (column 2), the join key between the two streams
    pub pos: u64,
    /// GT/GQ positions within this record's FORMAT column
    pub format: FormatIndex,
}

impl VariantRecord {
    /// Parse a data line into a record
    ///
    /// Requires the 8 fixed columns, a FORMAT column containing GT, and at
    /// least one sample column.
    pub fn parse(line: String) -> RecordResult<Self> {
        if line.is_empty() {
            return Err(RecordParseError::EmptyLine);
        }

        // Find field boundaries using memchr for tab characters
        let bytes = line.as_bytes();
        let mut field_bounds = Vec::with_capacity(10);
        let mut start_pos = 0;
        let mut pos = 0;

        while pos < bytes.len() {
            if let Some(tab_pos) = memchr(b'\t', &bytes[pos..]) {
                let end_pos = pos + tab_pos;
                field_bounds.push((start_pos, end_pos));
                start_pos = end_pos + 1;
                pos = start_pos;
            } else {
                // Last field
                field_bounds.push((start_pos, bytes.len()));
                break;
            }
        }

        if field_bounds.len() < FIRST_SAMPLE_FIELD + 1 {
            return Err(RecordParseError::TooFewFields {
                expected: FIRST_SAMPLE_FIELD + 1,
                found: field_bounds.len(),
            });
        }

        let pos_str = &line[field_bounds[1].0..field_bounds[1].1];
        let pos: u64 = pos_str
            .parse()
            .map_err(|_| RecordParseError::InvalidPos(pos_str.to_string()))?;

        let format_str = &line[field_bounds[FORMAT_FIELD].0..field_bounds[FORMAT_FIELD].1];
        let format = FormatIndex::parse(format_str)?;

        Ok(Self {
            line,
            field_bounds,
            pos,
            format,
        })
    }

    /// Get field as string slice
    pub fn field(&self, index: usize) -> Option<&str> {
        self.field_bounds
            .get(index)
            .map(|&(start, end)| &self.line[start..end])
    }

    /// Get the number of fields
    pub fn field_count(&self) -> usize {
        self.field_bounds.len()
    }

    /// Chromosome name (column 1)
    pub fn chrom(&self) -> &str {
        &self.line[self.field_bounds[0].0..self.field_bounds[0].1]
    }

    /// The 8 fixed annotation columns as one contiguous tab-separated slice
    pub fn fixed_fields(&self) -> &str {
        &self.line[self.field_bounds[0].0..self.field_bounds[FIXED_FIELDS - 1].1]
    }

    /// Raw FORMAT column text
    pub fn format_keys(&self) -> &str {
        &self.line[self.field_bounds[FORMAT_FIELD].0..self.field_bounds[FORMAT_FIELD].1]
    }

    /// Number of sample columns
    pub fn sample_count(&self) -> usize {
        self.field_bounds.len() - FIRST_SAMPLE_FIELD
    }

    /// Iterate over the sample columns
    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.field_bounds[FIRST_SAMPLE_FIELD..]
            .iter()
            .map(move |&(start, end)| &self.line[start..end])
    }

    /// Original line text
    pub fn line(&self) -> &str {
        &self.line
    }
}

/// Extract one colon-separated sub-field of a sample column
pub fn sample_subfield(sample: &str, index: usize) -> Option<&str> {
    sample.split(':').nth(index)
}
