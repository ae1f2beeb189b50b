//! Coarsest-fit assignment of ranked rectangles over the 2-D tile grid.
//!
//! Entries are visited in descending importance. Each one lands at the
//! coarsest zoom where every tile its rectangle overlaps still has room;
//! a tile is saturated once it holds `K` entries. Entries that fit nowhere
//! are culled, and the cull count is reported to the caller.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use crate::entry::PairEntry;
use crate::geometry::TileGeometry;

/// A rectangle with its assigned zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPair {
    pub entry: PairEntry,
    pub zoom: u32,
}

/// The outcome of a 2-D placement run.
#[derive(Debug, Default)]
pub struct PairPlacement {
    pub placed: Vec<PlacedPair>,
    /// Entries that no zoom level had room for.
    pub dropped: usize,
}

/// Assign each rectangle to the coarsest zoom at which no overlapping tile
/// is saturated. Ties in importance fall back to ingestion order.
pub fn place_pairs(
    mut entries: Vec<PairEntry>,
    geometry: &TileGeometry,
    max_per_tile: u32,
) -> PairPlacement {
    entries.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(Ordering::Equal)
    });

    // Occupancy cells allocate lazily on first increment.
    let mut occupancy: FxHashMap<(u32, i64, i64), u32> = FxHashMap::default();
    let mut placed = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;

    'entries: for entry in entries {
        for zoom in 0..=geometry.max_zoom() {
            let w = geometry.tile_width(zoom) as i64;
            let x0 = entry.xs[0].div_euclid(w);
            let x1 = entry.xs[1].div_euclid(w);
            let y0 = entry.ys[0].div_euclid(w);
            let y1 = entry.ys[1].div_euclid(w);

            let saturated = (x0..=x1).any(|i| {
                (y0..=y1).any(|j| {
                    occupancy
                        .get(&(zoom, i, j))
                        .map_or(false, |&c| c >= max_per_tile)
                })
            });
            if saturated {
                continue;
            }

            for i in x0..=x1 {
                for j in y0..=y1 {
                    *occupancy.entry((zoom, i, j)).or_insert(0) += 1;
                }
            }
            placed.push(PlacedPair { entry, zoom });
            continue 'entries;
        }
        dropped += 1;
    }

    PairPlacement { placed, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(xs: [i64; 2], ys: [i64; 2], importance: f64) -> PairEntry {
        PairEntry {
            uid: format!("{:?}{:?}@{}", xs, ys, importance),
            xs,
            ys,
            chrom_offset: 0,
            importance,
            fields: String::new(),
        }
    }

    fn geometry() -> TileGeometry {
        // max_zoom 4, max_width 1024
        TileGeometry::new(1000, 64).unwrap()
    }

    #[test]
    fn test_equal_footprints_overflow_one_zoom_down() {
        let g = geometry();
        let entries = vec![
            rect([0, 50], [0, 50], 3.0),
            rect([0, 50], [0, 50], 2.0),
            rect([0, 50], [0, 50], 1.0),
        ];
        let result = place_pairs(entries, &g, 2);
        assert_eq!(result.dropped, 0);
        let zooms: Vec<(f64, u32)> = result
            .placed
            .iter()
            .map(|p| (p.entry.importance, p.zoom))
            .collect();
        assert_eq!(zooms, vec![(3.0, 0), (2.0, 0), (1.0, 1)]);
    }

    #[test]
    fn test_importance_monotonicity() {
        let g = geometry();
        let entries: Vec<_> = (0..10)
            .map(|i| rect([0, 64], [0, 64], (10 - i) as f64))
            .collect();
        let result = place_pairs(entries, &g, 3);
        for a in &result.placed {
            for b in &result.placed {
                if a.entry.importance > b.entry.importance {
                    assert!(a.zoom <= b.zoom);
                }
            }
        }
    }

    #[test]
    fn test_tile_cap_never_exceeded() {
        let g = geometry();
        let entries: Vec<_> = (0..40)
            .map(|i| rect([0, 30], [0, 30], (i % 7) as f64))
            .collect();
        let cap = 3;
        let result = place_pairs(entries, &g, cap);

        let mut counts: FxHashMap<(u32, i64, i64), u32> = FxHashMap::default();
        for p in &result.placed {
            let w = g.tile_width(p.zoom) as i64;
            for i in p.entry.xs[0].div_euclid(w)..=p.entry.xs[1].div_euclid(w) {
                for j in p.entry.ys[0].div_euclid(w)..=p.entry.ys[1].div_euclid(w) {
                    *counts.entry((p.zoom, i, j)).or_insert(0) += 1;
                }
            }
        }
        for (&cell, &c) in &counts {
            assert!(c <= cap, "cell {:?} holds {}", cell, c);
        }
    }

    #[test]
    fn test_unplaceable_entries_are_counted() {
        let g = geometry();
        // every zoom has the same single overlapped tile for this rect, so
        // (max_zoom + 1) * cap entries fit and the rest are culled
        let n = 20;
        let entries: Vec<_> = (0..n).map(|i| rect([0, 10], [0, 10], i as f64)).collect();
        let result = place_pairs(entries, &g, 1);
        let capacity = (g.max_zoom() as usize + 1) * 1;
        assert_eq!(result.placed.len(), capacity);
        assert_eq!(result.dropped, n - capacity);
    }

    #[test]
    fn test_disjoint_rectangles_all_coarse() {
        let g = geometry();
        // rectangles in distinct zoom-4 tiles but one shared zoom-0 tile
        let entries = vec![
            rect([0, 10], [0, 10], 2.0),
            rect([200, 210], [200, 210], 1.0),
        ];
        let result = place_pairs(entries, &g, 2);
        assert!(result.placed.iter().all(|p| p.zoom == 0));
    }
}
