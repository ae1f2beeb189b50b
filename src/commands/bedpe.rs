//! Sparse aggregation of ranked interval pairs.

use std::io::BufRead;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::adapters::bedlike::{read_pairs, PairReaderConfig};
use crate::assembly::Assembly;
use crate::commands::{tileset_info, SparseSummary};
use crate::error::Result;
use crate::geometry::TileGeometry;
use crate::placer::place_pairs;
use crate::store::IntervalDb;

/// Aggregate ranked interval pairs into a zoom-leveled database.
#[derive(Debug, Clone)]
pub struct BedpeCommand {
    pub reader_config: PairReaderConfig,
    pub max_per_tile: u32,
    pub tile_size: i64,
}

impl Default for BedpeCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl BedpeCommand {
    pub fn new() -> Self {
        BedpeCommand {
            reader_config: PairReaderConfig::default(),
            max_per_tile: 100,
            tile_size: 1024,
        }
    }

    /// Run the pipeline: records -> coarsest-fit placement -> database.
    ///
    /// The summary carries the number of entries culled because no zoom
    /// level had room for them.
    pub fn run<R: BufRead>(
        &self,
        reader: R,
        assembly: &Assembly,
        output: &Path,
    ) -> Result<SparseSummary> {
        let mut rng = SmallRng::from_entropy();
        let entries = read_pairs(reader, &self.reader_config, assembly, &mut rng)?;
        log::info!("read {} interval-pair records", entries.len());

        let geometry = TileGeometry::new(assembly.total_length(), self.tile_size)?;
        let placement = place_pairs(entries, &geometry, self.max_per_tile);
        if placement.dropped > 0 {
            log::warn!(
                "{} entries did not fit at any zoom level and were dropped",
                placement.dropped
            );
        }

        let info = tileset_info(assembly, &geometry);
        let mut db = IntervalDb::create_paired(output, &info)?;
        let placed = db.insert_pairs(&placement.placed)?;

        Ok(SparseSummary {
            placed,
            dropped: placement.dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ImportanceRule;
    use tempfile::tempdir;

    fn toy_assembly() -> Assembly {
        Assembly::from_lengths(
            "toy",
            vec![("chr1".to_string(), 4000), ("chr2".to_string(), 2000)],
        )
    }

    #[test]
    fn test_bedpe_pipeline() {
        let assembly = toy_assembly();
        let dir = tempdir().unwrap();
        let output = dir.path().join("contacts.multires.db");

        let content = "\
chr1\t0\t100\tchr2\t0\t100\t9\n\
chr1\t0\t100\tchr2\t0\t100\t5\n\
chr1\t2000\t2100\tchr2\t1000\t1100\t7\n";
        let cmd = BedpeCommand {
            reader_config: PairReaderConfig {
                importance: ImportanceRule::Column(6),
                ..Default::default()
            },
            max_per_tile: 2,
            tile_size: 16,
        };
        let summary = cmd.run(content.as_bytes(), &assembly, &output).unwrap();
        assert_eq!(summary.placed, 3);
        assert_eq!(summary.dropped, 0);

        let db = IntervalDb::open(&output).unwrap();
        let info = db.tileset_info().unwrap();
        let rows = db
            .pairs_in_box(
                info.max_zoom,
                (0, info.max_width as i64),
                (0, info.max_width as i64),
            )
            .unwrap();
        assert_eq!(rows.len(), 3);
        // ys live in chr2's global range
        assert!(rows.iter().all(|r| r.from_y >= 4000));
    }

    #[test]
    fn test_overflow_reported_as_dropped() {
        let assembly = toy_assembly();
        let dir = tempdir().unwrap();
        let output = dir.path().join("contacts.multires.db");

        // identical footprints; capacity is one per zoom with cap 1
        let record = "chr1\t0\t10\tchr1\t0\t10";
        let n = 40;
        let content = vec![record; n].join("\n");
        let cmd = BedpeCommand {
            reader_config: PairReaderConfig {
                importance: ImportanceRule::Span,
                ..Default::default()
            },
            max_per_tile: 1,
            tile_size: 16,
        };
        let summary = cmd.run(content.as_bytes(), &assembly, &output).unwrap();

        let geometry = TileGeometry::new(assembly.total_length(), 16).unwrap();
        let capacity = geometry.max_zoom() as usize + 1;
        assert_eq!(summary.placed, capacity);
        assert_eq!(summary.dropped, n - capacity);
    }
}
