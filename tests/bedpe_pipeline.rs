//! End-to-end tests for the bedpe pipeline: coarsest-fit placement into the
//! paired database, cap enforcement, and cull reporting.

use multires_genomics::assembly::Assembly;
use multires_genomics::commands::BedpeCommand;
use multires_genomics::entry::ImportanceRule;
use multires_genomics::geometry::TileGeometry;
use multires_genomics::store::IntervalDb;
use rustc_hash::FxHashMap;
use tempfile::tempdir;

fn toy_assembly() -> Assembly {
    Assembly::from_lengths(
        "toy",
        vec![("chr1".to_string(), 4_000), ("chr2".to_string(), 4_000)],
    )
}

fn command(max_per_tile: u32) -> BedpeCommand {
    let mut cmd = BedpeCommand::new();
    cmd.reader_config.importance = ImportanceRule::Column(6);
    cmd.max_per_tile = max_per_tile;
    cmd.tile_size = 16;
    cmd
}

#[test]
fn test_equal_footprints_spill_to_the_next_zoom() {
    let assembly = toy_assembly();
    let dir = tempdir().unwrap();
    let output = dir.path().join("contacts.multires.db");

    // three identical rectangles, descending importance 3, 2, 1
    let content = "\
chr1\t0\t100\tchr2\t0\t100\t3\n\
chr1\t0\t100\tchr2\t0\t100\t2\n\
chr1\t0\t100\tchr2\t0\t100\t1\n";
    let summary = command(2)
        .run(content.as_bytes(), &assembly, &output)
        .unwrap();
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

    let zoom_of = |imp: f64| {
        rows.iter()
            .find(|r| r.importance == imp)
            .map(|r| r.zoom_level)
            .unwrap()
    };
    assert_eq!(zoom_of(3.0), 0);
    assert_eq!(zoom_of(2.0), 0);
    assert_eq!(zoom_of(1.0), 1);
}

#[test]
fn test_stored_zooms_respect_the_tile_cap() {
    let assembly = toy_assembly();
    let dir = tempdir().unwrap();
    let output = dir.path().join("contacts.multires.db");

    // clusters of rectangles around a handful of spots
    let mut lines = Vec::new();
    for i in 0..30 {
        let x = (i % 3) * 1_000;
        let y = (i % 2) * 2_000;
        lines.push(format!(
            "chr1\t{}\t{}\tchr2\t{}\t{}\t{}",
            x,
            x + 200,
            y,
            y + 200,
            30 - i
        ));
    }
    let content = lines.join("\n");
    let cap = 2;
    command(cap)
        .run(content.as_bytes(), &assembly, &output)
        .unwrap();

    let db = IntervalDb::open(&output).unwrap();
    let info = db.tileset_info().unwrap();
    let rows = db
        .pairs_in_box(
            info.max_zoom,
            (0, info.max_width as i64),
            (0, info.max_width as i64),
        )
        .unwrap();

    let geometry = TileGeometry::new(info.max_length, info.tile_size as i64).unwrap();
    let mut counts: FxHashMap<(u32, i64, i64), u32> = FxHashMap::default();
    for row in &rows {
        let w = geometry.tile_width(row.zoom_level) as i64;
        for i in row.from_x.div_euclid(w)..=row.to_x.div_euclid(w) {
            for j in row.from_y.div_euclid(w)..=row.to_y.div_euclid(w) {
                *counts.entry((row.zoom_level, i, j)).or_insert(0) += 1;
            }
        }
    }
    for (&cell, &count) in &counts {
        assert!(count <= cap, "cell {:?} holds {} entries", cell, count);
    }
}

#[test]
fn test_more_important_entries_stay_coarser() {
    let assembly = toy_assembly();
    let dir = tempdir().unwrap();
    let output = dir.path().join("contacts.multires.db");

    let mut lines = Vec::new();
    for i in 0..12 {
        lines.push(format!("chr1\t0\t500\tchr2\t0\t500\t{}", 12 - i));
    }
    command(3)
        .run(lines.join("\n").as_bytes(), &assembly, &output)
        .unwrap();

    let db = IntervalDb::open(&output).unwrap();
    let info = db.tileset_info().unwrap();
    let rows = db
        .pairs_in_box(
            info.max_zoom,
            (0, info.max_width as i64),
            (0, info.max_width as i64),
        )
        .unwrap();

    for a in &rows {
        for b in &rows {
            if a.importance > b.importance {
                assert!(a.zoom_level <= b.zoom_level);
            }
        }
    }
}

#[test]
fn test_cull_count_is_reported() {
    let assembly = toy_assembly();
    let dir = tempdir().unwrap();
    let output = dir.path().join("contacts.multires.db");

    // identical tiny footprints with cap 1: one entry fits per zoom level
    let n = 50;
    let content = vec!["chr1\t0\t10\tchr1\t0\t10\t1"; n].join("\n");
    let summary = command(1)
        .run(content.as_bytes(), &assembly, &output)
        .unwrap();

    let geometry = TileGeometry::new(assembly.total_length(), 16).unwrap();
    let capacity = geometry.max_zoom() as usize + 1;
    assert_eq!(summary.placed, capacity);
    assert_eq!(summary.dropped, n - capacity);

    let db = IntervalDb::open(&output).unwrap();
    let info = db.tileset_info().unwrap();
    let rows = db
        .pairs_in_box(info.max_zoom, (0, 100), (0, 100))
        .unwrap();
    assert_eq!(rows.len(), capacity);
}
