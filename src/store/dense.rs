//! Binary container for the dense pyramid.
//!
//! Layout: magic and version, an attribute block describing the track and
//! its assembly, a directory of named arrays, then one gzip-compressed
//! little-endian `f32` payload per array (`values_z` and `nan_values_z` for
//! each retained zoom `z`). While the pyramid streams, each array grows in
//! a compressed spill file; `finish` assembles the final container.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Result;
use crate::pyramid::DenseSink;

const MAGIC: &[u8; 4] = b"MRES";
const VERSION: u32 = 1;

/// The scalar and per-chromosome metadata stored at the container root.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackAttributes {
    pub assembly: String,
    pub zoom_step: u32,
    pub max_length: i64,
    pub tile_size: u64,
    pub max_zoom: u32,
    pub max_width: u64,
    /// First global position covered by the values (nonzero for
    /// single-chromosome runs).
    pub min_pos: i64,
    /// One past the last global position covered.
    pub max_pos: i64,
    /// Highest global position actually written by the input.
    pub max_position: i64,
    pub chrom_names: Vec<String>,
    pub chrom_sizes: Vec<u64>,
    pub chrom_order: Vec<String>,
}

struct Spill {
    encoder: GzEncoder<BufWriter<File>>,
    elems: u64,
}

impl Spill {
    fn new() -> Result<Self> {
        let file = tempfile::tempfile()?;
        Ok(Spill {
            encoder: GzEncoder::new(BufWriter::new(file), Compression::default()),
            elems: 0,
        })
    }

    fn append(&mut self, values: &[f32]) -> Result<()> {
        for &v in values {
            self.encoder.write_f32::<LittleEndian>(v)?;
        }
        self.elems += values.len() as u64;
        Ok(())
    }

    fn into_file(self) -> Result<(File, u64)> {
        let writer = self.encoder.finish()?;
        let mut file = writer.into_inner().map_err(|e| e.into_error())?;
        let len = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;
        Ok((file, len))
    }
}

struct LevelSpill {
    zoom: u32,
    values: Spill,
    nan_values: Spill,
}

/// Streaming writer for the dense container. Implements [`DenseSink`] so a
/// pyramid builder can own it directly.
pub struct HitileWriter {
    path: PathBuf,
    attrs: TrackAttributes,
    levels: Vec<LevelSpill>,
}

impl HitileWriter {
    /// Create a writer for `path`, truncating anything already there.
    /// `level_zooms` are the retained zoom values, base level first.
    pub fn create<P: AsRef<Path>>(
        path: P,
        attrs: TrackAttributes,
        level_zooms: &[u32],
    ) -> Result<Self> {
        // anything already at the output path is truncated now
        File::create(path.as_ref())?;

        let mut levels = Vec::with_capacity(level_zooms.len());
        for &zoom in level_zooms {
            levels.push(LevelSpill {
                zoom,
                values: Spill::new()?,
                nan_values: Spill::new()?,
            });
        }
        Ok(HitileWriter {
            path: path.as_ref().to_path_buf(),
            attrs,
            levels,
        })
    }

    /// Record the highest global position covered by the input.
    pub fn set_max_position(&mut self, max_position: i64) {
        self.attrs.max_position = max_position;
    }

    /// Assemble the final container from the spilled arrays.
    pub fn finish(self) -> Result<()> {
        struct Finished {
            name: String,
            zoom: u32,
            elems: u64,
            compressed_len: u64,
            file: File,
        }

        let mut arrays = Vec::with_capacity(self.levels.len() * 2);
        for level in self.levels {
            let zoom = level.zoom;
            let elems = level.values.elems;
            let (file, compressed_len) = level.values.into_file()?;
            arrays.push(Finished {
                name: format!("values_{}", zoom),
                zoom,
                elems,
                compressed_len,
                file,
            });
            let elems = level.nan_values.elems;
            let (file, compressed_len) = level.nan_values.into_file()?;
            arrays.push(Finished {
                name: format!("nan_values_{}", zoom),
                zoom,
                elems,
                compressed_len,
                file,
            });
        }

        let mut out = BufWriter::new(File::create(&self.path)?);
        out.write_all(MAGIC)?;
        out.write_u32::<LittleEndian>(VERSION)?;
        write_attrs(&mut out, &self.attrs)?;

        out.write_u32::<LittleEndian>(arrays.len() as u32)?;
        for a in &arrays {
            write_string(&mut out, &a.name)?;
            out.write_u32::<LittleEndian>(a.zoom)?;
            out.write_u64::<LittleEndian>(a.elems)?;
            out.write_u64::<LittleEndian>(a.compressed_len)?;
        }
        for a in arrays.iter_mut() {
            io::copy(&mut a.file, &mut out)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl DenseSink for HitileWriter {
    fn write_values(&mut self, level: usize, values: &[f32]) -> Result<()> {
        self.levels[level].values.append(values)
    }

    fn write_nan_values(&mut self, level: usize, values: &[f32]) -> Result<()> {
        self.levels[level].nan_values.append(values)
    }
}

#[derive(Debug, Clone)]
struct ArrayEntry {
    name: String,
    elems: u64,
    compressed_len: u64,
    offset: u64,
}

/// Reader for the dense container.
pub struct HitileReader {
    path: PathBuf,
    attrs: TrackAttributes,
    arrays: Vec<ArrayEntry>,
}

impl HitileReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "not a multires dense container",
            )
            .into());
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported container version {}", version),
            )
            .into());
        }

        let attrs = read_attrs(&mut reader)?;

        let count = reader.read_u32::<LittleEndian>()? as usize;
        let mut arrays = Vec::with_capacity(count);
        for _ in 0..count {
            let name = read_string(&mut reader)?;
            let _zoom = reader.read_u32::<LittleEndian>()?;
            let elems = reader.read_u64::<LittleEndian>()?;
            let compressed_len = reader.read_u64::<LittleEndian>()?;
            arrays.push(ArrayEntry {
                name,
                elems,
                compressed_len,
                offset: 0,
            });
        }

        let mut offset = reader.stream_position()?;
        for a in &mut arrays {
            a.offset = offset;
            offset += a.compressed_len;
        }

        Ok(HitileReader {
            path: path.as_ref().to_path_buf(),
            attrs,
            arrays,
        })
    }

    pub fn attributes(&self) -> &TrackAttributes {
        &self.attrs
    }

    pub fn array_names(&self) -> Vec<&str> {
        self.arrays.iter().map(|a| a.name.as_str()).collect()
    }

    /// Decompress a named array into memory.
    pub fn read_array(&self, name: &str) -> Result<Vec<f32>> {
        let entry = self
            .arrays
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no array named {}", name))
            })?;

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(entry.offset))?;
        let limited = file.take(entry.compressed_len);
        let mut decoder = GzDecoder::new(BufReader::new(limited));

        let mut values = Vec::with_capacity(entry.elems as usize);
        for _ in 0..entry.elems {
            values.push(decoder.read_f32::<LittleEndian>()?);
        }
        Ok(values)
    }

    /// The data array at a retained zoom.
    pub fn values(&self, zoom: u32) -> Result<Vec<f32>> {
        self.read_array(&format!("values_{}", zoom))
    }

    /// The NaN-count array at a retained zoom.
    pub fn nan_values(&self, zoom: u32) -> Result<Vec<f32>> {
        self.read_array(&format!("nan_values_{}", zoom))
    }
}

fn write_string<W: Write>(w: &mut W, s: &str) -> Result<()> {
    w.write_u32::<LittleEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid utf-8 string").into())
}

fn write_string_list<W: Write>(w: &mut W, items: &[String]) -> Result<()> {
    w.write_u32::<LittleEndian>(items.len() as u32)?;
    for s in items {
        write_string(w, s)?;
    }
    Ok(())
}

fn read_string_list<R: Read>(r: &mut R) -> Result<Vec<String>> {
    let count = r.read_u32::<LittleEndian>()? as usize;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read_string(r)?);
    }
    Ok(items)
}

fn write_attrs<W: Write>(w: &mut W, attrs: &TrackAttributes) -> Result<()> {
    write_string(w, &attrs.assembly)?;
    w.write_u32::<LittleEndian>(attrs.zoom_step)?;
    w.write_i64::<LittleEndian>(attrs.max_length)?;
    w.write_u64::<LittleEndian>(attrs.tile_size)?;
    w.write_u32::<LittleEndian>(attrs.max_zoom)?;
    w.write_u64::<LittleEndian>(attrs.max_width)?;
    w.write_i64::<LittleEndian>(attrs.min_pos)?;
    w.write_i64::<LittleEndian>(attrs.max_pos)?;
    w.write_i64::<LittleEndian>(attrs.max_position)?;
    write_string_list(w, &attrs.chrom_names)?;
    w.write_u32::<LittleEndian>(attrs.chrom_sizes.len() as u32)?;
    for &size in &attrs.chrom_sizes {
        w.write_u64::<LittleEndian>(size)?;
    }
    write_string_list(w, &attrs.chrom_order)?;
    Ok(())
}

fn read_attrs<R: Read>(r: &mut R) -> Result<TrackAttributes> {
    let assembly = read_string(r)?;
    let zoom_step = r.read_u32::<LittleEndian>()?;
    let max_length = r.read_i64::<LittleEndian>()?;
    let tile_size = r.read_u64::<LittleEndian>()?;
    let max_zoom = r.read_u32::<LittleEndian>()?;
    let max_width = r.read_u64::<LittleEndian>()?;
    let min_pos = r.read_i64::<LittleEndian>()?;
    let max_pos = r.read_i64::<LittleEndian>()?;
    let max_position = r.read_i64::<LittleEndian>()?;
    let chrom_names = read_string_list(r)?;
    let size_count = r.read_u32::<LittleEndian>()? as usize;
    let mut chrom_sizes = Vec::with_capacity(size_count);
    for _ in 0..size_count {
        chrom_sizes.push(r.read_u64::<LittleEndian>()?);
    }
    let chrom_order = read_string_list(r)?;
    Ok(TrackAttributes {
        assembly,
        zoom_step,
        max_length,
        tile_size,
        max_zoom,
        max_width,
        min_pos,
        max_pos,
        max_position,
        chrom_names,
        chrom_sizes,
        chrom_order,
    })
}
