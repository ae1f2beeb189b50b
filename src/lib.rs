// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]

//! Multi-resolution aggregation of genomic interval and signal data.
//!
//! Converts per-base or per-interval inputs over a reference assembly into
//! tiled, zoom-leveled artifacts for progressive retrieval:
//!
//! - **Dense path**: a per-base signal (bigWig or bedgraph text) becomes a
//!   pyramid of geometrically downsampled arrays in a binary container.
//! - **Sparse path**: ranked intervals or interval pairs are assigned zoom
//!   levels under a per-tile cap and stored in an indexed database.
//!
//! # Example
//!
//! ```rust,no_run
//! use multires_genomics::assembly::Assembly;
//! use multires_genomics::commands::BedfileCommand;
//! use std::io::BufReader;
//!
//! let assembly = Assembly::from_chromsizes_file("hg19", "hg19.chrom.sizes").unwrap();
//! let input = BufReader::new(std::fs::File::open("genes.bed").unwrap());
//! let summary = BedfileCommand::new()
//!     .run(input, &assembly, "genes.multires".as_ref())
//!     .unwrap();
//! println!("placed {} intervals", summary.placed);
//! ```

pub mod adapters;
pub mod assembly;
pub mod commands;
pub mod entry;
pub mod error;
pub mod geometry;
pub mod placer;
pub mod pyramid;
pub mod store;

// Re-export commonly used types
pub use assembly::{Assembly, AssemblyProvider, BuiltinAssemblies};
pub use error::{AggregateError, Result};
pub use geometry::TileGeometry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::assembly::{Assembly, AssemblyProvider, BuiltinAssemblies};
    pub use crate::commands::{
        BedfileCommand, BedgraphCommand, BedpeCommand, BigwigCommand, SparseSummary,
    };
    pub use crate::entry::{ImportanceRule, IntervalEntry, PairEntry};
    pub use crate::error::{AggregateError, Result};
    pub use crate::geometry::TileGeometry;
    pub use crate::store::{HitileReader, IntervalDb};
}
