//! Sparse bedgraph-style text adapter for the dense path.
//!
//! Records carry `(chrom, from, to, value)` in configurable columns. The
//! value is replicated over every base of `[from, to)`; the stretch between
//! the previous record's end and the next record's start is filled with NaN
//! so each record lands at its exact global coordinates.

use std::io::BufRead;

use crate::adapters::parse::{parse_u64_fast, split_fields};
use crate::assembly::Assembly;
use crate::error::{AggregateError, Result};
use crate::pyramid::{DenseSink, PyramidBuilder};

/// Optional transform applied to parsed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    #[default]
    None,
    /// Un-log values stored as log2: `x -> 2^x`.
    Exp2,
}

/// Column layout and value handling for a bedgraph stream.
#[derive(Debug, Clone)]
pub struct BedGraphConfig {
    /// 0-based column indices.
    pub chrom_col: usize,
    pub from_col: usize,
    pub to_col: usize,
    pub value_col: usize,
    pub has_header: bool,
    /// A literal string that stands for NaN in the value column.
    pub nan_value: Option<String>,
    pub transform: Transform,
    /// Restrict to records on a single chromosome.
    pub chromosome: Option<String>,
}

impl Default for BedGraphConfig {
    fn default() -> Self {
        BedGraphConfig {
            chrom_col: 0,
            from_col: 1,
            to_col: 2,
            value_col: 3,
            has_header: false,
            nan_value: None,
            transform: Transform::None,
            chromosome: None,
        }
    }
}

/// Stream bedgraph records into the pyramid builder. Returns the highest
/// position covered by any record, relative to the start of the output
/// arrays.
pub fn run_bedgraph<R: BufRead, S: DenseSink>(
    reader: R,
    config: &BedGraphConfig,
    assembly: &Assembly,
    builder: &mut PyramidBuilder<S>,
) -> Result<i64> {
    // Restricted runs write from the start of each dataset, so positions
    // are taken relative to the chromosome's cumulative offset.
    let origin = match &config.chromosome {
        Some(chrom) => assembly.cum(chrom)?,
        None => 0,
    };
    let mut curr_genome_pos: i64 = 0;
    let mut max_position: i64 = 0;
    let mut first_record = true;

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if first_record && config.has_header {
            first_record = false;
            continue;
        }
        let probe_header = first_record;
        first_record = false;

        let mut fields: Vec<&str> = Vec::new();
        split_fields(trimmed, None, &mut fields);
        let chrom = *fields.get(config.chrom_col).ok_or_else(|| {
            malformed(line_no, format!("missing chromosome column: {}", trimmed))
        })?;
        let from = coord_field(&fields, config.from_col, line_no, probe_header, trimmed)?;
        let to = coord_field(&fields, config.to_col, line_no, probe_header, trimmed)?;
        if to < from {
            return Err(malformed(line_no, format!("end before start: {}", trimmed)));
        }

        if let Some(only) = &config.chromosome {
            if chrom != only {
                continue;
            }
        }

        let raw_value = *fields
            .get(config.value_col)
            .ok_or_else(|| malformed(line_no, format!("missing value column: {}", trimmed)))?;

        let start_genome_pos = assembly.global(chrom, from)? - origin;
        if start_genome_pos < curr_genome_pos {
            return Err(malformed(
                line_no,
                format!(
                    "records must arrive in increasing genome order \
                     (position {} after {})",
                    start_genome_pos, curr_genome_pos
                ),
            ));
        }
        if start_genome_pos > curr_genome_pos {
            builder.push_run(f32::NAN, true, (start_genome_pos - curr_genome_pos) as u64)?;
            curr_genome_pos = start_genome_pos;
        }

        let is_nan = config.nan_value.as_deref() == Some(raw_value);
        let value = if is_nan {
            f32::NAN
        } else {
            let v: f64 = raw_value
                .parse()
                .map_err(|_| malformed(line_no, format!("invalid value '{}'", raw_value)))?;
            match config.transform {
                Transform::Exp2 => 2f64.powf(v) as f32,
                Transform::None => v as f32,
            }
        };

        let span = to - from;
        builder.push_run(value, is_nan, span)?;
        curr_genome_pos += span as i64;
        max_position = start_genome_pos + span as i64;
    }

    Ok(max_position)
}

fn coord_field(
    fields: &[&str],
    col: usize,
    line_no: usize,
    probe_header: bool,
    line: &str,
) -> Result<u64> {
    let raw = fields
        .get(col)
        .ok_or_else(|| malformed(line_no, format!("missing position column: {}", line)))?;
    parse_u64_fast(raw).ok_or_else(|| {
        if probe_header {
            malformed(
                line_no,
                format!(
                    "couldn't parse position '{}'; if the file has a header \
                     line, pass --has-header. Line: {}",
                    raw, line
                ),
            )
        } else {
            malformed(line_no, format!("invalid position '{}'", raw))
        }
    })
}

fn malformed(line: usize, message: String) -> AggregateError {
    AggregateError::MalformedRecord { line, message }
}
