//! Sparse aggregation of ranked 1-D intervals.

use std::io::BufRead;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::adapters::bedlike::{read_intervals, IntervalReaderConfig};
use crate::assembly::Assembly;
use crate::commands::{tileset_info, SparseSummary};
use crate::error::Result;
use crate::geometry::TileGeometry;
use crate::placer::place_intervals;
use crate::store::IntervalDb;

/// Aggregate ranked intervals into a zoom-leveled database.
#[derive(Debug, Clone)]
pub struct BedfileCommand {
    pub reader_config: IntervalReaderConfig,
    pub max_per_tile: usize,
    pub tile_size: i64,
}

impl Default for BedfileCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl BedfileCommand {
    pub fn new() -> Self {
        BedfileCommand {
            reader_config: IntervalReaderConfig::default(),
            max_per_tile: 100,
            tile_size: 1024,
        }
    }

    /// Run the pipeline: records -> placement -> database at `output`.
    pub fn run<R: BufRead>(
        &self,
        reader: R,
        assembly: &Assembly,
        output: &Path,
    ) -> Result<SparseSummary> {
        let mut rng = SmallRng::from_entropy();
        let entries = read_intervals(reader, &self.reader_config, assembly, &mut rng)?;
        log::info!("read {} interval records", entries.len());

        let geometry = TileGeometry::new(assembly.total_length(), self.tile_size)?;
        let placement = place_intervals(entries, &geometry, self.max_per_tile);

        let info = tileset_info(assembly, &geometry);
        let mut db = IntervalDb::create_linear(output, &info)?;
        let placed = db.insert_intervals(&placement.placed)?;

        Ok(SparseSummary {
            placed,
            dropped: placement.dropped,
        })
    }
}
