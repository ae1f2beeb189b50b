//! Assembly and coordinate model.
//!
//! An assembly is an ordered list of chromosomes with lengths, loaded from a
//! chromosome-sizes file (tab-delimited: chrom\tsize) or resolved from a
//! built-in catalog. Per-chromosome coordinates map onto the concatenated
//! linear genome via cumulative prefix offsets.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{AggregateError, Result};

/// An ordered reference assembly with chromosome sizes and cumulative
/// offsets into the linear genome.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    name: String,
    /// Chromosome order (preserves input order)
    order: Vec<String>,
    /// Map of chromosome name to index in `order`
    index: HashMap<String, usize>,
    /// Chromosome lengths, parallel to `order`
    sizes: Vec<u64>,
    /// Prefix sums: `offsets[i]` is the global position of `order[i]` base 0;
    /// `offsets[len()]` is the total length
    offsets: Vec<i64>,
}

impl Assembly {
    /// Build an assembly from (name, length) pairs in order.
    ///
    /// Duplicate names keep their first position in the order; the length
    /// of the last occurrence wins.
    pub fn from_lengths<I, S>(name: &str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut asm = Assembly {
            name: name.to_string(),
            ..Default::default()
        };
        for (chrom, size) in pairs {
            asm.insert(chrom.into(), size);
        }
        asm.rebuild_offsets();
        asm
    }

    /// Load an assembly from a chromosome-sizes file.
    /// Format: tab-delimited with chrom\tsize per line.
    pub fn from_chromsizes_file<P: AsRef<Path>>(name: &str, path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut asm = Assembly {
            name: name.to_string(),
            ..Default::default()
        };

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split('\t');
            let chrom = fields.next().unwrap_or("");
            let size_field = fields.next().ok_or_else(|| AggregateError::MalformedRecord {
                line: line_num + 1,
                message: "chromsizes file requires two columns: chrom and size".to_string(),
            })?;
            let size: u64 = size_field
                .trim()
                .parse()
                .map_err(|_| AggregateError::MalformedRecord {
                    line: line_num + 1,
                    message: format!("invalid chromosome size: {}", size_field),
                })?;

            asm.insert(chrom.to_string(), size);
        }

        asm.rebuild_offsets();
        Ok(asm)
    }

    fn insert(&mut self, chrom: String, size: u64) {
        match self.index.get(&chrom) {
            Some(&i) => self.sizes[i] = size,
            None => {
                self.index.insert(chrom.clone(), self.order.len());
                self.order.push(chrom);
                self.sizes.push(size);
            }
        }
    }

    fn rebuild_offsets(&mut self) {
        self.offsets.clear();
        self.offsets.push(0);
        let mut acc: i64 = 0;
        for &size in &self.sizes {
            acc += size as i64;
            self.offsets.push(acc);
        }
    }

    /// The assembly name (e.g. `hg19`).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chromosome names in assembly order.
    pub fn chrom_names(&self) -> &[String] {
        &self.order
    }

    /// Chromosome sizes in assembly order.
    pub fn chrom_sizes(&self) -> &[u64] {
        &self.sizes
    }

    /// Check if a chromosome exists.
    #[inline]
    pub fn has_chrom(&self, chrom: &str) -> bool {
        self.index.contains_key(chrom)
    }

    /// The size of a chromosome.
    pub fn size(&self, chrom: &str) -> Result<u64> {
        self.index
            .get(chrom)
            .map(|&i| self.sizes[i])
            .ok_or_else(|| AggregateError::UnknownChromosome(chrom.to_string()))
    }

    /// The cumulative offset of a chromosome: the global position of its
    /// first base.
    pub fn cum(&self, chrom: &str) -> Result<i64> {
        self.index
            .get(chrom)
            .map(|&i| self.offsets[i])
            .ok_or_else(|| AggregateError::UnknownChromosome(chrom.to_string()))
    }

    /// Map a per-chromosome position onto the linear genome.
    ///
    /// Fails with `UnknownChromosome` if the name is not present and with
    /// `CoordinateOutOfRange` if `pos` exceeds the declared length.
    pub fn global(&self, chrom: &str, pos: u64) -> Result<i64> {
        let &i = self
            .index
            .get(chrom)
            .ok_or_else(|| AggregateError::UnknownChromosome(chrom.to_string()))?;
        if pos > self.sizes[i] {
            return Err(AggregateError::CoordinateOutOfRange {
                chrom: chrom.to_string(),
                pos,
                size: self.sizes[i],
            });
        }
        Ok(self.offsets[i] + pos as i64)
    }

    /// Invert a global position back to `(chrom, pos)`.
    ///
    /// Returns `None` for positions outside `[0, total_length)`.
    pub fn locate(&self, global: i64) -> Option<(&str, u64)> {
        if global < 0 || global >= self.total_length() {
            return None;
        }
        // offsets is sorted; find the last offset <= global
        let i = match self.offsets.binary_search(&global) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        // Skip zero-length chromosomes sharing the offset
        let mut i = i.min(self.order.len() - 1);
        while self.sizes[i] == 0 && i + 1 < self.order.len() {
            i += 1;
        }
        Some((&self.order[i], (global - self.offsets[i]) as u64))
    }

    /// Total length of the concatenated genome.
    #[inline]
    pub fn total_length(&self) -> i64 {
        *self.offsets.last().unwrap_or(&0)
    }

    /// Number of chromosomes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A source of resolved assemblies, injected into the pipelines so the core
/// never reaches into an external catalog itself.
pub trait AssemblyProvider {
    /// Resolve a named assembly, or fail with `UnknownAssembly`.
    fn assembly(&self, name: &str) -> Result<Assembly>;
}

/// The assemblies this crate knows without a chromosome-sizes file.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinAssemblies;

impl AssemblyProvider for BuiltinAssemblies {
    fn assembly(&self, name: &str) -> Result<Assembly> {
        match name {
            "hg19" => Ok(Assembly::from_lengths(
                "hg19",
                HG19.iter().map(|&(c, s)| (c, s)),
            )),
            other => Err(AggregateError::UnknownAssembly(other.to_string())),
        }
    }
}

/// Canonical hg19 chromosome lengths, in the conventional order.
const HG19: &[(&str, u64)] = &[
    ("chr1", 249_250_621),
    ("chr2", 243_199_373),
    ("chr3", 198_022_430),
    ("chr4", 191_154_276),
    ("chr5", 180_915_260),
    ("chr6", 171_115_067),
    ("chr7", 159_138_663),
    ("chr8", 146_364_022),
    ("chr9", 141_213_431),
    ("chr10", 135_534_747),
    ("chr11", 135_006_516),
    ("chr12", 133_851_895),
    ("chr13", 115_169_878),
    ("chr14", 107_349_540),
    ("chr15", 102_531_392),
    ("chr16", 90_354_753),
    ("chr17", 81_195_210),
    ("chr18", 78_077_248),
    ("chr19", 59_128_983),
    ("chr20", 63_025_520),
    ("chr21", 48_129_895),
    ("chr22", 51_304_566),
    ("chrX", 155_270_560),
    ("chrY", 59_373_566),
    ("chrM", 16_571),
];
