//! Dense signal adapter.
//!
//! Walks chromosomes in assembly order, pulling windows of values from a
//! [`SignalSource`] and pushing them into the pyramid. Chromosomes the
//! source does not know produce all-NaN windows of their declared length.
//! There is no padding between chromosomes: global position is the
//! cumulative prefix exactly.

use std::path::Path;

use bigtools::{BBIRead, BigWigRead};

use crate::assembly::Assembly;
use crate::error::{AggregateError, Result};
use crate::pyramid::{DenseSink, PyramidBuilder};

/// An indexed per-base signal over named chromosomes.
pub trait SignalSource {
    /// Whether the source carries any data for `chrom`.
    fn has_chrom(&self, chrom: &str) -> bool;

    /// Per-base values over `[start, end)` of `chrom`. Uncovered bases are
    /// NaN; positions beyond the source's own extent are NaN-padded.
    fn values(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<f32>>;
}

/// A [`SignalSource`] backed by a bigWig file.
///
/// The chromosome table is cached at open; each window request reopens the
/// underlying reader.
pub struct BigWigSource {
    path: String,
    chroms: Vec<(String, u64)>,
}

impl BigWigSource {
    pub fn open(path: &Path) -> Result<Self> {
        let path = path
            .to_str()
            .ok_or_else(|| AggregateError::Unsupported("non-utf8 path".to_string()))?
            .to_string();
        let reader = BigWigRead::open_file(&path)
            .map_err(|e| AggregateError::Unsupported(format!("opening bigWig: {}", e)))?;
        let chroms = reader
            .chroms()
            .iter()
            .map(|c| (c.name.clone(), c.length as u64))
            .collect();
        Ok(BigWigSource { path, chroms })
    }

    fn file_length(&self, chrom: &str) -> Option<u64> {
        self.chroms
            .iter()
            .find(|(name, _)| name == chrom)
            .map(|&(_, len)| len)
    }
}

impl SignalSource for BigWigSource {
    fn has_chrom(&self, chrom: &str) -> bool {
        self.chroms.iter().any(|(name, _)| name == chrom)
    }

    fn values(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<f32>> {
        if end <= start {
            return Ok(Vec::new());
        }
        // The declared assembly length may exceed the file's; the overhang
        // is NaN.
        let file_len = self.file_length(chrom).unwrap_or(0);
        let covered_end = end.min(file_len);
        let mut values = if start < covered_end {
            let mut reader = BigWigRead::open_file(&self.path)
                .map_err(|e| AggregateError::Unsupported(format!("opening bigWig: {}", e)))?;
            reader
                .values(chrom, start as u32, covered_end as u32)
                .map_err(|e| AggregateError::Unsupported(format!("reading bigWig: {}", e)))?
        } else {
            Vec::new()
        };
        values.resize((end - start) as usize, f32::NAN);
        Ok(values)
    }
}

/// An in-memory [`SignalSource`], handy in tests and for synthetic tracks.
#[derive(Debug, Clone, Default)]
pub struct MemorySignal {
    tracks: Vec<(String, Vec<f32>)>,
}

impl MemorySignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chrom: impl Into<String>, values: Vec<f32>) {
        self.tracks.push((chrom.into(), values));
    }
}

impl SignalSource for MemorySignal {
    fn has_chrom(&self, chrom: &str) -> bool {
        self.tracks.iter().any(|(name, _)| name == chrom)
    }

    fn values(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<f32>> {
        let track = self
            .tracks
            .iter()
            .find(|(name, _)| name == chrom)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[]);
        let mut out = Vec::with_capacity((end - start) as usize);
        for pos in start..end {
            out.push(track.get(pos as usize).copied().unwrap_or(f32::NAN));
        }
        Ok(out)
    }
}

/// Stream a signal source through the pyramid builder chromosome by
/// chromosome. Returns the accumulated `max_position` (the summed lengths
/// of the chromosomes walked).
pub fn run_signal<T: SignalSource, S: DenseSink>(
    source: &mut T,
    assembly: &Assembly,
    chromosome: Option<&str>,
    builder: &mut PyramidBuilder<S>,
) -> Result<i64> {
    let chroms: Vec<String> = match chromosome {
        Some(c) => {
            if !assembly.has_chrom(c) {
                return Err(AggregateError::UnknownChromosome(c.to_string()));
            }
            vec![c.to_string()]
        }
        None => assembly.chrom_names().to_vec(),
    };

    let window = builder.chunk_size() as u64;
    let mut max_position: i64 = 0;

    for chrom in &chroms {
        let chrom_size = assembly.size(chrom)?;
        max_position += chrom_size as i64;
        let present = source.has_chrom(chrom);
        log::debug!("chrom {} length {} present {}", chrom, chrom_size, present);

        let mut counter = 0u64;
        while counter < chrom_size {
            let remaining = window.min(chrom_size - counter);
            if present {
                let values = source.values(chrom, counter, counter + remaining)?;
                let nan_flags: Vec<f32> = values
                    .iter()
                    .map(|v| if v.is_nan() { 1.0 } else { 0.0 })
                    .collect();
                builder.push(&values, &nan_flags)?;
            } else {
                builder.push_run(f32::NAN, true, remaining)?;
            }
            counter += remaining;
        }
    }

    Ok(max_position)
}
