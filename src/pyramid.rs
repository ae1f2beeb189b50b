//! Streaming pyramid builder for dense tracks.
//!
//! Values arrive in global coordinate order and cascade through a family of
//! zoom levels spaced `zoom_step` apart: each retained level buffers pending
//! values, writes them out in chunks, and feeds the bucketed sum of every
//! chunk to the next coarser retained level. A parallel pyramid carries
//! per-bucket NaN counts.

use crate::error::{AggregateError, Result};
use crate::geometry::TileGeometry;

/// Where the builder writes finished chunks. Writes for a given level are
/// strictly sequential, so implementations only ever append.
pub trait DenseSink {
    /// Append values to the data array of the given retained level.
    fn write_values(&mut self, level: usize, values: &[f32]) -> Result<()>;

    /// Append values to the NaN-count array of the given retained level.
    fn write_nan_values(&mut self, level: usize, values: &[f32]) -> Result<()>;
}

/// Bucketed summation: element `k` of the result is the sum of
/// `values[k*bucket .. (k+1)*bucket]`, with NaN contributing zero.
pub fn aggregate(values: &[f32], bucket: usize) -> Vec<f32> {
    values
        .chunks(bucket)
        .map(|c| c.iter().filter(|v| !v.is_nan()).sum())
        .collect()
}

/// The zoom values of the retained pyramid levels: `0, s, 2s, ...` for as
/// long as the genome at that zoom is still wider than one tile.
pub fn retained_levels(geometry: &TileGeometry, zoom_step: u32) -> Vec<u32> {
    let mut levels = Vec::new();
    let mut z = 0u32;
    while z < 64 && (geometry.tile_size() as u128) << z < geometry.total_length() as u128 {
        levels.push(z);
        z += zoom_step;
    }
    if levels.is_empty() {
        // a genome no wider than one tile still gets its base level
        levels.push(0);
    }
    levels
}

/// An in-memory sink that keeps every level as a plain vector. Used by the
/// tests and by callers that want the arrays without a container file.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub values: Vec<Vec<f32>>,
    pub nan_values: Vec<Vec<f32>>,
}

impl MemorySink {
    pub fn new(levels: usize) -> Self {
        MemorySink {
            values: vec![Vec::new(); levels],
            nan_values: vec![Vec::new(); levels],
        }
    }
}

impl DenseSink for MemorySink {
    fn write_values(&mut self, level: usize, values: &[f32]) -> Result<()> {
        self.values[level].extend_from_slice(values);
        Ok(())
    }

    fn write_nan_values(&mut self, level: usize, values: &[f32]) -> Result<()> {
        self.nan_values[level].extend_from_slice(values);
        Ok(())
    }
}

/// Streaming buffer/flush/aggregate machinery across the retained levels.
pub struct PyramidBuilder<S: DenseSink> {
    sink: S,
    zoom_step: u32,
    chunk_size: usize,
    /// Zoom value of each retained level, `levels[i] = i * zoom_step`.
    level_zooms: Vec<u32>,
    buffers: Vec<Vec<f32>>,
    nan_buffers: Vec<Vec<f32>>,
    /// Write cursor per retained level.
    positions: Vec<u64>,
}

impl<S: DenseSink> PyramidBuilder<S> {
    /// Create a builder over `sink`.
    ///
    /// The chunk size is `tile_size * 2^chunk_shift` and must be a multiple
    /// of `2^zoom_step` so aggregation buckets never straddle a chunk
    /// boundary.
    pub fn new(sink: S, geometry: &TileGeometry, zoom_step: u32, chunk_shift: u32) -> Result<Self> {
        if zoom_step == 0 || zoom_step > 31 {
            return Err(AggregateError::InvalidGeometry(format!(
                "zoom step must be in 1..=31, got {}",
                zoom_step
            )));
        }
        if chunk_shift > 40 {
            return Err(AggregateError::InvalidGeometry(format!(
                "chunk shift {} is out of range",
                chunk_shift
            )));
        }
        let chunk = (geometry.tile_size() as u128) << chunk_shift;
        if chunk == 0 || chunk > (1 << 30) {
            return Err(AggregateError::InvalidGeometry(format!(
                "chunk size {} is out of range",
                chunk
            )));
        }
        let chunk_size = chunk as usize;
        if chunk_size % (1usize << zoom_step) != 0 {
            return Err(AggregateError::InvalidGeometry(format!(
                "chunk size {} is not a multiple of 2^{}",
                chunk_size, zoom_step
            )));
        }

        let level_zooms = retained_levels(geometry, zoom_step);
        let n = level_zooms.len();
        Ok(PyramidBuilder {
            sink,
            zoom_step,
            chunk_size,
            level_zooms,
            buffers: vec![Vec::new(); n],
            nan_buffers: vec![Vec::new(); n],
            positions: vec![0; n],
        })
    }

    /// The number of values buffered before a chunk is flushed.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Zoom values of the retained levels.
    pub fn level_zooms(&self) -> &[u32] {
        &self.level_zooms
    }

    /// Write cursors per retained level.
    pub fn positions(&self) -> &[u64] {
        &self.positions
    }

    /// Append values (with their NaN flags, 1.0 or 0.0) to the base level
    /// and cascade any full chunks up the pyramid.
    pub fn push(&mut self, values: &[f32], nan_flags: &[f32]) -> Result<()> {
        debug_assert_eq!(values.len(), nan_flags.len());
        for (v, n) in values
            .chunks(self.chunk_size)
            .zip(nan_flags.chunks(self.chunk_size))
        {
            self.buffers[0].extend_from_slice(v);
            self.nan_buffers[0].extend_from_slice(n);
            self.cascade()?;
        }
        Ok(())
    }

    /// Append `count` copies of a single value without materializing the
    /// run. Used for record fills and whole-chromosome NaN stretches.
    pub fn push_run(&mut self, value: f32, is_nan: bool, mut count: u64) -> Result<()> {
        let flag = if is_nan { 1.0 } else { 0.0 };
        while count > 0 {
            let take = count.min(self.chunk_size as u64) as usize;
            self.buffers[0].extend(std::iter::repeat(value).take(take));
            self.nan_buffers[0].extend(std::iter::repeat(flag).take(take));
            self.cascade()?;
            count -= take as u64;
        }
        Ok(())
    }

    /// Flush full chunks level by level, feeding each chunk's bucketed sums
    /// to the next retained level.
    fn cascade(&mut self) -> Result<()> {
        for level in 0..self.level_zooms.len() {
            while self.buffers[level].len() >= self.chunk_size {
                self.flush_chunk(level, self.chunk_size)?;
            }
        }
        Ok(())
    }

    fn flush_chunk(&mut self, level: usize, len: usize) -> Result<()> {
        let rest = self.buffers[level].split_off(len);
        let chunk = std::mem::replace(&mut self.buffers[level], rest);
        let nan_rest = self.nan_buffers[level].split_off(len);
        let nan_chunk = std::mem::replace(&mut self.nan_buffers[level], nan_rest);

        self.sink.write_values(level, &chunk)?;
        self.sink.write_nan_values(level, &nan_chunk)?;
        self.positions[level] += chunk.len() as u64;

        if level + 1 < self.level_zooms.len() {
            let bucket = 1usize << self.zoom_step;
            self.buffers[level + 1].extend(aggregate(&chunk, bucket));
            self.nan_buffers[level + 1].extend(aggregate(&nan_chunk, bucket));
        }
        Ok(())
    }

    /// Drain every buffer regardless of size, cascading partial chunks, and
    /// hand the sink back.
    pub fn finish(mut self) -> Result<S> {
        for level in 0..self.level_zooms.len() {
            let len = self.buffers[level].len();
            if len > 0 {
                self.flush_chunk(level, len)?;
            }
        }
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_finite(values: &[f32]) -> f64 {
        values
            .iter()
            .filter(|v| !v.is_nan())
            .map(|&v| v as f64)
            .sum()
    }

    #[test]
    fn test_aggregate_buckets() {
        let agg = aggregate(&[1.0, 2.0, 3.0, 4.0, 5.0], 2);
        assert_eq!(agg, vec![3.0, 7.0, 5.0]);
    }

    #[test]
    fn test_aggregate_nan_as_zero() {
        let agg = aggregate(&[1.0, f32::NAN, f32::NAN, f32::NAN], 2);
        assert_eq!(agg, vec![1.0, 0.0]);
    }

    #[test]
    fn test_retained_levels() {
        // tile_size 16, total 16 * 2^9 => max_zoom 9; levels 0, 4, 8
        let g = TileGeometry::new(16 << 9, 16).unwrap();
        assert_eq!(retained_levels(&g, 4), vec![0, 4, 8]);
        // single-tile genome keeps the base level only
        let g = TileGeometry::new(10, 16).unwrap();
        assert_eq!(retained_levels(&g, 4), vec![0]);
    }

    #[test]
    fn test_level_lengths_after_finish() {
        let total = 10_000i64;
        let g = TileGeometry::new(total, 16).unwrap();
        let levels = retained_levels(&g, 4);
        let mut builder = PyramidBuilder::new(MemorySink::new(levels.len()), &g, 4, 5).unwrap();

        let values: Vec<f32> = (0..total).map(|i| (i % 7) as f32).collect();
        let nan_flags = vec![0.0f32; values.len()];
        builder.push(&values, &nan_flags).unwrap();
        let sink = builder.finish().unwrap();

        for (i, &z) in levels.iter().enumerate() {
            let stride = 1u64 << z;
            let expect = (total as u64 + stride - 1) / stride;
            assert_eq!(sink.values[i].len() as u64, expect, "level {}", i);
            assert_eq!(sink.nan_values[i].len() as u64, expect);
        }
    }

    #[test]
    fn test_sum_conservation_across_levels() {
        let total = 40_000i64;
        let g = TileGeometry::new(total, 16).unwrap();
        let levels = retained_levels(&g, 4);
        let mut builder = PyramidBuilder::new(MemorySink::new(levels.len()), &g, 4, 6).unwrap();

        // mix in NaN runs to exercise the count pyramid
        let mut values = Vec::new();
        let mut nans = Vec::new();
        for i in 0..total {
            if i % 11 == 0 {
                values.push(f32::NAN);
                nans.push(1.0);
            } else {
                values.push((i % 5) as f32);
                nans.push(0.0);
            }
        }
        builder.push(&values, &nans).unwrap();
        let sink = builder.finish().unwrap();

        let base_sum = sum_finite(&sink.values[0]);
        let base_nan = sum_finite(&sink.nan_values[0]);
        for i in 1..levels.len() {
            assert!((sum_finite(&sink.values[i]) - base_sum).abs() < 1e-3);
            assert!((sum_finite(&sink.nan_values[i]) - base_nan).abs() < 1e-6);
        }
    }

    #[test]
    fn test_push_run_equivalent_to_push() {
        let g = TileGeometry::new(5_000, 16).unwrap();
        let levels = retained_levels(&g, 4);

        let mut a = PyramidBuilder::new(MemorySink::new(levels.len()), &g, 4, 4).unwrap();
        let mut b = PyramidBuilder::new(MemorySink::new(levels.len()), &g, 4, 4).unwrap();

        let run = vec![2.5f32; 3000];
        let zeros = vec![0.0f32; 3000];
        a.push(&run, &zeros).unwrap();
        b.push_run(2.5, false, 3000).unwrap();

        let a = a.finish().unwrap();
        let b = b.finish().unwrap();
        assert_eq!(a.values, b.values);
        assert_eq!(a.nan_values, b.nan_values);
    }

    #[test]
    fn test_chunk_must_divide_by_zoom_step() {
        // tile_size 10 * 2^1 = 20, not a multiple of 2^4
        let g = TileGeometry::new(1000, 10).unwrap();
        let res = PyramidBuilder::new(MemorySink::new(1), &g, 4, 1);
        assert!(matches!(res, Err(AggregateError::InvalidGeometry(_))));
    }
}
