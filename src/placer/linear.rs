//! Per-zoom top-K selection over ranked 1-D intervals.
//!
//! Walking from the coarsest zoom down, every tile keeps the `K` most
//! important intervals that overlap it and are still unplaced; the rest stay
//! in the running for finer zooms. An interval overlaps tile `t` of width
//! `w` when `start < (t+1)*w` and `end > t*w` (half-open from the left).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::entry::IntervalEntry;
use crate::geometry::TileGeometry;

/// An interval with its assigned zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedInterval {
    pub entry: IntervalEntry,
    pub zoom: u32,
}

/// The outcome of a placement run.
#[derive(Debug, Default)]
pub struct LinearPlacement {
    pub placed: Vec<PlacedInterval>,
    /// Intervals that no tile had room for at any zoom level.
    pub dropped: usize,
}

/// Assign each interval to exactly one zoom level, keeping at most
/// `max_per_tile` per tile at the zoom it is emitted. Ties in importance
/// fall back to ingestion order.
pub fn place_intervals(
    entries: Vec<IntervalEntry>,
    geometry: &TileGeometry,
    max_per_tile: usize,
) -> LinearPlacement {
    // Stable sort of indices keeps ingestion order among equal importances.
    let mut remaining: Vec<usize> = (0..entries.len()).collect();
    remaining.sort_by(|&a, &b| {
        entries[b]
            .importance
            .partial_cmp(&entries[a].importance)
            .unwrap_or(Ordering::Equal)
    });

    let mut assigned: Vec<Option<u32>> = vec![None; entries.len()];

    for zoom in 0..=geometry.max_zoom() {
        if remaining.is_empty() {
            break;
        }
        let w = geometry.tile_width(zoom) as i64;

        // Bucket the still-unplaced entries by every tile they overlap.
        // Iterating `remaining` in importance order keeps each candidate
        // list sorted, so the first K unplaced entries are the top K.
        let mut by_tile: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for &idx in &remaining {
            let e = &entries[idx];
            let first = e.start.div_euclid(w);
            let last = (e.end - 1).div_euclid(w);
            let mut t = first;
            while t <= last {
                by_tile.entry(t).or_default().push(idx);
                t += 1;
            }
        }

        for (_tile, candidates) in by_tile {
            let mut picked = 0;
            for idx in candidates {
                if picked == max_per_tile {
                    break;
                }
                if assigned[idx].is_none() {
                    assigned[idx] = Some(zoom);
                    picked += 1;
                }
            }
        }

        remaining.retain(|&idx| assigned[idx].is_none());
    }

    let dropped = remaining.len();
    let placed = entries
        .into_iter()
        .zip(assigned)
        .filter_map(|(entry, zoom)| zoom.map(|zoom| PlacedInterval { entry, zoom }))
        .collect();

    LinearPlacement { placed, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: i64, end: i64, importance: f64) -> IntervalEntry {
        IntervalEntry {
            uid: format!("u{}-{}", start, end),
            start,
            end,
            chrom_offset: 0,
            importance,
            fields: String::new(),
        }
    }

    fn geometry() -> TileGeometry {
        // max_zoom 4, max_width 1024, tile widths 1024, 512, ..., 64
        TileGeometry::new(1000, 64).unwrap()
    }

    #[test]
    fn test_everything_fits_at_zoom_zero() {
        let g = geometry();
        let entries = vec![entry(0, 10, 3.0), entry(100, 200, 2.0)];
        let result = place_intervals(entries, &g, 10);
        assert_eq!(result.dropped, 0);
        assert!(result.placed.iter().all(|p| p.zoom == 0));
    }

    #[test]
    fn test_overflow_moves_to_finer_zoom() {
        let g = geometry();
        // three intervals in the same region, cap 2 per tile
        let mut entries = vec![entry(0, 50, 3.0), entry(0, 50, 2.0), entry(0, 50, 1.0)];
        for (i, e) in entries.iter_mut().enumerate() {
            e.uid = format!("e{}", i);
        }
        let result = place_intervals(entries, &g, 2);
        assert_eq!(result.dropped, 0);
        let zoom_of = |uid: &str| {
            result
                .placed
                .iter()
                .find(|p| p.entry.uid == uid)
                .unwrap()
                .zoom
        };
        // the two most important stay coarse, the least overflows finer
        assert_eq!(zoom_of("e0"), 0);
        assert_eq!(zoom_of("e1"), 0);
        assert_eq!(zoom_of("e2"), 1);
    }

    #[test]
    fn test_more_important_never_deeper() {
        let g = geometry();
        let entries: Vec<_> = (0..20)
            .map(|i| entry(0, 64, (20 - i) as f64))
            .collect();
        let result = place_intervals(entries, &g, 3);
        for a in &result.placed {
            for b in &result.placed {
                if a.entry.importance > b.entry.importance {
                    assert!(a.zoom <= b.zoom);
                }
            }
        }
    }

    #[test]
    fn test_tile_cap_holds_per_zoom() {
        let g = geometry();
        // intervals confined to single tiles at every zoom
        let entries: Vec<_> = (0..30).map(|i| entry(i % 3, i % 3 + 1, i as f64)).collect();
        let cap = 4;
        let result = place_intervals(entries, &g, cap);

        for zoom in 0..=g.max_zoom() {
            let w = g.tile_width(zoom) as i64;
            let mut counts = std::collections::HashMap::new();
            for p in result.placed.iter().filter(|p| p.zoom == zoom) {
                let first = p.entry.start.div_euclid(w);
                let last = (p.entry.end - 1).div_euclid(w);
                for t in first..=last {
                    *counts.entry(t).or_insert(0usize) += 1;
                }
            }
            for (&t, &c) in &counts {
                assert!(c <= cap, "zoom {} tile {} holds {}", zoom, t, c);
            }
        }
    }

    #[test]
    fn test_ties_keep_ingestion_order() {
        let g = geometry();
        let mut entries = vec![entry(0, 8, 1.0), entry(8, 16, 1.0), entry(16, 24, 1.0)];
        entries[0].uid = "first".into();
        entries[1].uid = "second".into();
        entries[2].uid = "third".into();
        let result = place_intervals(entries, &g, 2);
        // cap 2 at the zoom-0 tile: the first two by ingestion order stay
        let at_zero: Vec<_> = result
            .placed
            .iter()
            .filter(|p| p.zoom == 0)
            .map(|p| p.entry.uid.as_str())
            .collect();
        assert_eq!(at_zero, vec!["first", "second"]);
    }

    #[test]
    fn test_boundary_feature_belongs_to_left_open_tile() {
        let g = geometry();
        // at max zoom (tile width 64), [64, 128) belongs to tile 1 only
        let entries = vec![entry(64, 128, 1.0)];
        let result = place_intervals(entries, &g, 1);
        assert_eq!(result.placed.len(), 1);
        let p = &result.placed[0];
        let w = g.tile_width(g.max_zoom()) as i64;
        assert_eq!(p.entry.start.div_euclid(w), 1);
        assert_eq!((p.entry.end - 1).div_euclid(w), 1);
    }
}
