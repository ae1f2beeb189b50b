//! Dense aggregation of an indexed binary signal source.

use std::path::Path;

use crate::adapters::signal::{run_signal, SignalSource};
use crate::assembly::Assembly;
use crate::commands::track_attributes;
use crate::error::Result;
use crate::geometry::TileGeometry;
use crate::pyramid::{retained_levels, PyramidBuilder};
use crate::store::HitileWriter;

/// Aggregate a per-base signal into a dense pyramid container.
#[derive(Debug, Clone)]
pub struct BigwigCommand {
    pub tile_size: i64,
    /// Chunk size as a power-of-two multiplier of the tile size.
    pub chunk_shift: u32,
    pub zoom_step: u32,
    /// Only extract values for a single chromosome.
    pub chromosome: Option<String>,
}

impl Default for BigwigCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl BigwigCommand {
    pub fn new() -> Self {
        BigwigCommand {
            tile_size: 1024,
            chunk_shift: 14,
            zoom_step: 8,
            chromosome: None,
        }
    }

    /// Run the pipeline: signal source -> pyramid -> container at `output`.
    pub fn run<T: SignalSource>(
        &self,
        source: &mut T,
        assembly: &Assembly,
        output: &Path,
    ) -> Result<()> {
        let geometry = TileGeometry::new(assembly.total_length(), self.tile_size)?;
        let levels = retained_levels(&geometry, self.zoom_step);

        // Restricted runs cover only that chromosome's global range; the
        // values still land at the start of each dataset.
        let (min_pos, max_pos) = match &self.chromosome {
            Some(chrom) => {
                let cum = assembly.cum(chrom)?;
                (cum, cum + assembly.size(chrom)? as i64)
            }
            None => (0, assembly.total_length()),
        };

        let attrs = track_attributes(assembly, &geometry, self.zoom_step, min_pos, max_pos);
        let writer = HitileWriter::create(output, attrs, &levels)?;
        let mut builder = PyramidBuilder::new(writer, &geometry, self.zoom_step, self.chunk_shift)?;

        let max_position =
            run_signal(source, assembly, self.chromosome.as_deref(), &mut builder)?;

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
