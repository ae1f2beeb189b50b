//! Importance-ranked placement of sparse entries onto the zoom hierarchy.

pub mod linear;
pub mod pairs;

pub use linear::{place_intervals, LinearPlacement, PlacedInterval};
pub use pairs::{place_pairs, PairPlacement, PlacedPair};
