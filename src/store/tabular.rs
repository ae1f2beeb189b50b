//! Tabular output store: a SQLite file holding placed entries, an R-tree
//! spatial index over their footprints, and a `tileset_info` metadata table.

use std::fs;
use std::io;
use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::placer::{PlacedInterval, PlacedPair};

/// Geometry and assembly metadata carried alongside the placed entries.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetInfo {
    pub zoom_step: u32,
    pub max_length: i64,
    pub assembly: String,
    pub chrom_names: Vec<String>,
    pub chrom_sizes: Vec<u64>,
    pub tile_size: u64,
    pub max_zoom: u32,
    pub max_width: u64,
}

/// A stored 1-D interval row.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRow {
    pub id: i64,
    pub zoom_level: u32,
    pub importance: f64,
    pub start: i64,
    pub end: i64,
    pub chrom_offset: i64,
    pub uid: String,
    pub fields: String,
}

/// A stored 2-D interval-pair row.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedRow {
    pub id: i64,
    pub zoom_level: u32,
    pub importance: f64,
    pub from_x: i64,
    pub to_x: i64,
    pub from_y: i64,
    pub to_y: i64,
    pub chrom_offset: i64,
    pub uid: String,
    pub fields: String,
}

/// A relational store for placed sparse entries.
pub struct IntervalDb {
    conn: Connection,
}

impl IntervalDb {
    /// Create a 1-D store at `path`, replacing any existing file.
    pub fn create_linear<P: AsRef<Path>>(path: P, info: &TilesetInfo) -> Result<Self> {
        let conn = create_connection(path.as_ref())?;
        conn.execute_batch(
            "
            CREATE TABLE intervals
            (
                id INT PRIMARY KEY,
                zoomLevel INT,
                importance REAL,
                startPos INT,
                endPos INT,
                chrOffset INT,
                uid TEXT,
                fields TEXT
            );
            CREATE VIRTUAL TABLE position_index USING rtree(
                id,
                rStartPos, rEndPos
            );
            ",
        )?;
        store_tileset_info(&conn, info)?;
        Ok(IntervalDb { conn })
    }

    /// Create a 2-D store at `path`, replacing any existing file.
    pub fn create_paired<P: AsRef<Path>>(path: P, info: &TilesetInfo) -> Result<Self> {
        let conn = create_connection(path.as_ref())?;
        conn.execute_batch(
            "
            CREATE TABLE intervals
            (
                id INT PRIMARY KEY,
                zoomLevel INT,
                importance REAL,
                fromX INT,
                toX INT,
                fromY INT,
                toY INT,
                chrOffset INT,
                uid TEXT,
                fields TEXT
            );
            CREATE VIRTUAL TABLE position_index USING rtree(
                id,
                rFromX, rToX,
                rFromY, rToY
            );
            ",
        )?;
        store_tileset_info(&conn, info)?;
        Ok(IntervalDb { conn })
    }

    /// Open an existing store read-only for queries.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(IntervalDb {
            conn: Connection::open(path)?,
        })
    }

    /// Insert placed 1-D intervals, row and index together, in a single
    /// transaction. Returns the number of rows written.
    pub fn insert_intervals(&mut self, placed: &[PlacedInterval]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut rows = tx.prepare("INSERT INTO intervals VALUES (?1,?2,?3,?4,?5,?6,?7,?8)")?;
            let mut index = tx.prepare("INSERT INTO position_index VALUES (?1,?2,?3)")?;
            for (i, p) in placed.iter().enumerate() {
                let id = i as i64 + 1;
                rows.execute(params![
                    id,
                    p.zoom,
                    p.entry.importance,
                    p.entry.start,
                    p.entry.end,
                    p.entry.chrom_offset,
                    p.entry.uid,
                    p.entry.fields,
                ])?;
                index.execute(params![id, p.entry.start as f64, p.entry.end as f64])?;
            }
        }
        tx.commit()?;
        Ok(placed.len())
    }

    /// Insert placed interval pairs. Returns the number of rows written.
    pub fn insert_pairs(&mut self, placed: &[PlacedPair]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut rows =
                tx.prepare("INSERT INTO intervals VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)")?;
            let mut index = tx.prepare("INSERT INTO position_index VALUES (?1,?2,?3,?4,?5)")?;
            for (i, p) in placed.iter().enumerate() {
                let id = i as i64 + 1;
                rows.execute(params![
                    id,
                    p.zoom,
                    p.entry.importance,
                    p.entry.xs[0],
                    p.entry.xs[1],
                    p.entry.ys[0],
                    p.entry.ys[1],
                    p.entry.chrom_offset,
                    p.entry.uid,
                    p.entry.fields,
                ])?;
                index.execute(params![
                    id,
                    p.entry.xs[0] as f64,
                    p.entry.xs[1] as f64,
                    p.entry.ys[0] as f64,
                    p.entry.ys[1] as f64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(placed.len())
    }

    /// All 1-D rows at zoom ≤ `max_zoom_level` whose footprint intersects
    /// `[start, end)`. The R-tree narrows the scan; the exact interval
    /// columns decide membership.
    pub fn intervals_in_range(
        &self,
        max_zoom_level: u32,
        start: i64,
        end: i64,
    ) -> Result<Vec<LinearRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT intervals.id, zoomLevel, importance, startPos, endPos, chrOffset, uid, fields
             FROM intervals, position_index
             WHERE intervals.id = position_index.id
               AND zoomLevel <= ?1
               AND rStartPos <= ?3 AND rEndPos >= ?2
               AND startPos < ?3 AND endPos > ?2",
        )?;
        let rows = stmt.query_map(params![max_zoom_level, start, end], |row| {
            Ok(LinearRow {
                id: row.get(0)?,
                zoom_level: row.get(1)?,
                importance: row.get(2)?,
                start: row.get(3)?,
                end: row.get(4)?,
                chrom_offset: row.get(5)?,
                uid: row.get(6)?,
                fields: row.get(7)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// All 2-D rows at zoom ≤ `max_zoom_level` whose footprint intersects
    /// the query box.
    pub fn pairs_in_box(
        &self,
        max_zoom_level: u32,
        x: (i64, i64),
        y: (i64, i64),
    ) -> Result<Vec<PairedRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT intervals.id, zoomLevel, importance, fromX, toX, fromY, toY,
                    chrOffset, uid, fields
             FROM intervals, position_index
             WHERE intervals.id = position_index.id
               AND zoomLevel <= ?1
               AND rFromX <= ?3 AND rToX >= ?2
               AND rFromY <= ?5 AND rToY >= ?4
               AND fromX < ?3 AND toX > ?2
               AND fromY < ?5 AND toY > ?4",
        )?;
        let rows = stmt.query_map(params![max_zoom_level, x.0, x.1, y.0, y.1], |row| {
            Ok(PairedRow {
                id: row.get(0)?,
                zoom_level: row.get(1)?,
                importance: row.get(2)?,
                from_x: row.get(3)?,
                to_x: row.get(4)?,
                from_y: row.get(5)?,
                to_y: row.get(6)?,
                chrom_offset: row.get(7)?,
                uid: row.get(8)?,
                fields: row.get(9)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Read the stored metadata back.
    pub fn tileset_info(&self) -> Result<TilesetInfo> {
        let mut stmt = self.conn.prepare(
            "SELECT zoom_step, max_length, assembly, chrom_names, chrom_sizes,
                    tile_size, max_zoom, max_width
             FROM tileset_info",
        )?;
        let info = stmt.query_row([], |row| {
            let names: String = row.get(3)?;
            let sizes: String = row.get(4)?;
            Ok(TilesetInfo {
                zoom_step: row.get(0)?,
                max_length: row.get(1)?,
                assembly: row.get(2)?,
                chrom_names: names.split('\t').map(str::to_string).collect(),
                chrom_sizes: sizes
                    .split('\t')
                    .filter_map(|s| s.parse().ok())
                    .collect(),
                tile_size: row.get::<_, f64>(5)? as u64,
                max_zoom: row.get(6)?,
                max_width: row.get::<_, f64>(7)? as u64,
            })
        })?;
        Ok(info)
    }
}

fn create_connection(path: &Path) -> Result<Connection> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(Connection::open(path)?)
}

fn store_tileset_info(conn: &Connection, info: &TilesetInfo) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE tileset_info
        (
            zoom_step INT,
            max_length INT,
            assembly TEXT,
            chrom_names TEXT,
            chrom_sizes TEXT,
            tile_size REAL,
            max_zoom INT,
            max_width REAL
        );
        ",
    )?;
    let sizes: Vec<String> = info.chrom_sizes.iter().map(|s| s.to_string()).collect();
    conn.execute(
        "INSERT INTO tileset_info VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            info.zoom_step,
            info.max_length,
            info.assembly,
            info.chrom_names.join("\t"),
            sizes.join("\t"),
            info.tile_size as f64,
            info.max_zoom,
            info.max_width as f64,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{IntervalEntry, PairEntry};
    use tempfile::tempdir;

    fn info() -> TilesetInfo {
        TilesetInfo {
            zoom_step: 1,
            max_length: 10_000,
            assembly: "toy".to_string(),
            chrom_names: vec!["chr1".to_string(), "chr2".to_string()],
            chrom_sizes: vec![6_000, 4_000],
            tile_size: 1024,
            max_zoom: 4,
            max_width: 16_384,
        }
    }

    fn placed(start: i64, end: i64, zoom: u32) -> PlacedInterval {
        PlacedInterval {
            entry: IntervalEntry {
                uid: format!("u{}", start),
                start,
                end,
                chrom_offset: 0,
                importance: (end - start) as f64,
                fields: format!("chr1\t{}\t{}", start, end),
            },
            zoom,
        }
    }

    #[test]
    fn test_tileset_info_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("track.multires.db");
        IntervalDb::create_linear(&path, &info()).unwrap();

        let db = IntervalDb::open(&path).unwrap();
        let stored = db.tileset_info().unwrap();
        assert_eq!(stored, info());
    }

    #[test]
    fn test_linear_insert_and_query() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("track.multires.db");
        let mut db = IntervalDb::create_linear(&path, &info()).unwrap();

        db.insert_intervals(&[
            placed(100, 200, 0),
            placed(5_000, 5_500, 0),
            placed(150, 160, 2),
        ])
        .unwrap();

        // zoom cap filters out the deeper row
        let rows = db.intervals_in_range(1, 0, 1_000).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].start, 100);

        // a wider box at a deeper cap sees everything
        let rows = db.intervals_in_range(4, 0, 10_000).unwrap();
        assert_eq!(rows.len(), 3);

        // footprint intersection is half-open
        let rows = db.intervals_in_range(4, 200, 300).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_paired_insert_and_query() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pairs.multires.db");
        let mut db = IntervalDb::create_paired(&path, &info()).unwrap();

        let pair = PlacedPair {
            entry: PairEntry {
                uid: "p1".to_string(),
                xs: [100, 200],
                ys: [4_000, 4_500],
                chrom_offset: 0,
                importance: 500.0,
                fields: "chr1\t100\t200\tchr2\t0\t500".to_string(),
            },
            zoom: 0,
        };
        db.insert_pairs(&[pair]).unwrap();

        let rows = db.pairs_in_box(0, (0, 1_000), (4_000, 5_000)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].uid, "p1");

        let rows = db.pairs_in_box(0, (0, 1_000), (0, 1_000)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_existing_file_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("track.multires.db");
        std::fs::write(&path, b"not a database").unwrap();

        let mut db = IntervalDb::create_linear(&path, &info()).unwrap();
        db.insert_intervals(&[placed(0, 10, 0)]).unwrap();
        assert_eq!(db.intervals_in_range(0, 0, 100).unwrap().len(), 1);
    }
}
