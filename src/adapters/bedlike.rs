//! Ranked interval and interval-pair readers for the sparse path.

use std::io::BufRead;

use rand::rngs::SmallRng;
use rand::Rng;

use crate::adapters::parse::{parse_u64_fast, split_fields};
use crate::assembly::Assembly;
use crate::entry::{new_uid, ImportanceRule, IntervalEntry, PairEntry};
use crate::error::{AggregateError, Result};

/// Reader configuration for 1-D interval records
/// (`chrom, start, end, ...fields`).
#[derive(Debug, Clone)]
pub struct IntervalReaderConfig {
    pub importance: ImportanceRule,
    pub has_header: bool,
    /// Keep only records on this chromosome.
    pub chromosome: Option<String>,
    /// Split on this character instead of any whitespace.
    pub delimiter: Option<char>,
    /// A constant added to every coordinate at ingest.
    pub offset: i64,
}

impl Default for IntervalReaderConfig {
    fn default() -> Self {
        IntervalReaderConfig {
            importance: ImportanceRule::Span,
            has_header: false,
            chromosome: None,
            delimiter: None,
            offset: 0,
        }
    }
}

/// Read every record into a ranked [`IntervalEntry`].
pub fn read_intervals<R: BufRead>(
    reader: R,
    config: &IntervalReaderConfig,
    assembly: &Assembly,
    rng: &mut SmallRng,
) -> Result<Vec<IntervalEntry>> {
    let mut entries = Vec::new();
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
        split_fields(trimmed, config.delimiter, &mut fields);
        if fields.len() < 3 {
            return Err(malformed(
                line_no,
                format!("expected at least 3 fields, got {}", fields.len()),
            ));
        }

        let chrom = fields[0];
        let start = coord(fields[1], line_no, probe_header, trimmed)?;
        let end = coord(fields[2], line_no, probe_header, trimmed)?;
        if end < start {
            return Err(malformed(
                line_no,
                format!("start ({}) > end ({})", start, end),
            ));
        }

        let importance = derive_importance(
            &config.importance,
            (end - start) as f64,
            &fields,
            line_no,
            rng,
        )?;

        let global_start = assembly.global(chrom, start)? + config.offset;
        let global_end = assembly.global(chrom, end)? + config.offset;

        if let Some(only) = &config.chromosome {
            if chrom != only {
                continue;
            }
        }

        entries.push(IntervalEntry {
            uid: new_uid(rng),
            start: global_start,
            end: global_end,
            chrom_offset: global_start - start as i64,
            importance,
            fields: fields.join("\t"),
        });
    }

    Ok(entries)
}

/// Reader configuration for paired records carrying two
/// `(chrom, from, to)` triples.
#[derive(Debug, Clone)]
pub struct PairReaderConfig {
    /// 0-based column indices.
    pub chr1_col: usize,
    pub from1_col: usize,
    pub to1_col: usize,
    pub chr2_col: usize,
    pub from2_col: usize,
    pub to2_col: usize,
    pub importance: ImportanceRule,
    pub has_header: bool,
}

impl Default for PairReaderConfig {
    fn default() -> Self {
        PairReaderConfig {
            chr1_col: 0,
            from1_col: 1,
            to1_col: 2,
            chr2_col: 3,
            from2_col: 4,
            to2_col: 5,
            importance: ImportanceRule::Random,
            has_header: false,
        }
    }
}

/// Read every record into a ranked [`PairEntry`].
pub fn read_pairs<R: BufRead>(
    reader: R,
    config: &PairReaderConfig,
    assembly: &Assembly,
    rng: &mut SmallRng,
) -> Result<Vec<PairEntry>> {
    let mut entries = Vec::new();
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

        let chr1 = field(&fields, config.chr1_col, line_no, trimmed)?;
        let from1 = coord(
            field(&fields, config.from1_col, line_no, trimmed)?,
            line_no,
            probe_header,
            trimmed,
        )?;
        let to1 = coord(
            field(&fields, config.to1_col, line_no, trimmed)?,
            line_no,
            probe_header,
            trimmed,
        )?;
        let chr2 = field(&fields, config.chr2_col, line_no, trimmed)?;
        let from2 = coord(
            field(&fields, config.from2_col, line_no, trimmed)?,
            line_no,
            probe_header,
            trimmed,
        )?;
        let to2 = coord(
            field(&fields, config.to2_col, line_no, trimmed)?,
            line_no,
            probe_header,
            trimmed,
        )?;

        let xs = [assembly.global(chr1, from1)?, assembly.global(chr1, to1)?];
        let ys = [assembly.global(chr2, from2)?, assembly.global(chr2, to2)?];

        let default_importance = (xs[1] - xs[0]).max(ys[1] - ys[0]) as f64;
        let importance =
            derive_importance(&config.importance, default_importance, &fields, line_no, rng)?;

        entries.push(PairEntry {
            uid: new_uid(rng),
            xs,
            ys,
            chrom_offset: xs[0] - from1 as i64,
            importance,
            fields: trimmed.to_string(),
        });
    }

    Ok(entries)
}

fn derive_importance(
    rule: &ImportanceRule,
    span: f64,
    fields: &[&str],
    line_no: usize,
    rng: &mut SmallRng,
) -> Result<f64> {
    match rule {
        ImportanceRule::Span => Ok(span),
        ImportanceRule::Random => Ok(rng.gen::<f64>()),
        ImportanceRule::Column(col) => {
            let raw = fields.get(*col).ok_or_else(|| {
                malformed(line_no, format!("missing importance column {}", col + 1))
            })?;
            raw.parse().map_err(|_| {
                malformed(line_no, format!("invalid importance value '{}'", raw))
            })
        }
    }
}

fn field<'a>(fields: &[&'a str], col: usize, line_no: usize, line: &str) -> Result<&'a str> {
    fields
        .get(col)
        .copied()
        .ok_or_else(|| malformed(line_no, format!("missing column {}: {}", col + 1, line)))
}

fn coord(raw: &str, line_no: usize, probe_header: bool, line: &str) -> Result<u64> {
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
