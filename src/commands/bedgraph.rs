//! Dense aggregation of sparse bedgraph text.

use std::io::BufRead;
use std::path::Path;

use crate::adapters::bedgraph::{run_bedgraph, BedGraphConfig};
use crate::assembly::Assembly;
use crate::commands::track_attributes;
use crate::error::{AggregateError, Result};
use crate::geometry::TileGeometry;
use crate::pyramid::{retained_levels, PyramidBuilder};
use crate::store::HitileWriter;

/// How bucketed values combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Sum,
    Average,
}

/// Aggregate interval-value text records into a dense pyramid container.
#[derive(Debug, Clone)]
pub struct BedgraphCommand {
    pub config: BedGraphConfig,
    pub method: Method,
    pub tile_size: i64,
    /// Chunk size as a power-of-two multiplier of the tile size.
    pub chunk_shift: u32,
    pub zoom_step: u32,
}

impl Default for BedgraphCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl BedgraphCommand {
    pub fn new() -> Self {
        BedgraphCommand {
            config: BedGraphConfig::default(),
            method: Method::Sum,
            tile_size: 1024,
            chunk_shift: 14,
            zoom_step: 8,
        }
    }

    /// Run the pipeline: text records -> pyramid -> container at `output`.
    pub fn run<R: BufRead>(&self, reader: R, assembly: &Assembly, output: &Path) -> Result<()> {
        if self.method == Method::Average {
            return Err(AggregateError::Unsupported(
                "--method average is not implemented; only sum is supported".to_string(),
            ));
        }

        let geometry = TileGeometry::new(assembly.total_length(), self.tile_size)?;
        let levels = retained_levels(&geometry, self.zoom_step);

        // Restricted runs cover only that chromosome's global range; the
        // values still land at the start of each dataset.
        let (min_pos, max_pos) = match &self.config.chromosome {
            Some(chrom) => {
                let cum = assembly.cum(chrom)?;
                (cum, cum + assembly.size(chrom)? as i64)
            }
            None => (0, assembly.total_length()),
        };

        let attrs = track_attributes(assembly, &geometry, self.zoom_step, min_pos, max_pos);

        let writer = HitileWriter::create(output, attrs, &levels)?;
        let mut builder = PyramidBuilder::new(writer, &geometry, self.zoom_step, self.chunk_shift)?;

        let max_position = run_bedgraph(reader, &self.config, assembly, &mut builder)?;

        let mut writer = builder.finish()?;
        writer.set_max_position(max_position);
        writer.finish()?;

        log::info!(
            "wrote dense pyramid ({} levels) to {}",
            levels.len(),
            output.display()
        );
        Ok(())
    }
}
