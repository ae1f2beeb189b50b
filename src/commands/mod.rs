//! Aggregation pipeline commands.

pub mod bedfile;
pub mod bedgraph;
pub mod bedpe;
pub mod bigwig;

pub use bedfile::BedfileCommand;
pub use bedgraph::{BedgraphCommand, Method};
pub use bedpe::BedpeCommand;
pub use bigwig::BigwigCommand;

use crate::assembly::Assembly;
use crate::geometry::TileGeometry;
use crate::store::{TilesetInfo, TrackAttributes};

/// Counts reported by the sparse pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseSummary {
    pub placed: usize,
    /// Entries no zoom level had room for.
    pub dropped: usize,
}

/// Root attributes for a dense container.
pub(crate) fn track_attributes(
    assembly: &Assembly,
    geometry: &TileGeometry,
    zoom_step: u32,
    min_pos: i64,
    max_pos: i64,
) -> TrackAttributes {
    TrackAttributes {
        assembly: assembly.name().to_string(),
        zoom_step,
        max_length: assembly.total_length(),
        tile_size: geometry.tile_size(),
        max_zoom: geometry.max_zoom(),
        max_width: geometry.max_width(),
        min_pos,
        max_pos,
        max_position: 0,
        chrom_names: assembly.chrom_names().to_vec(),
        chrom_sizes: assembly.chrom_sizes().to_vec(),
        chrom_order: assembly.chrom_names().to_vec(),
    }
}

/// Metadata row for a sparse database.
pub(crate) fn tileset_info(assembly: &Assembly, geometry: &TileGeometry) -> TilesetInfo {
    TilesetInfo {
        zoom_step: 1,
        max_length: assembly.total_length(),
        assembly: assembly.name().to_string(),
        chrom_names: assembly.chrom_names().to_vec(),
        chrom_sizes: assembly.chrom_sizes().to_vec(),
        tile_size: geometry.tile_size(),
        max_zoom: geometry.max_zoom(),
        max_width: geometry.max_width(),
    }
}
