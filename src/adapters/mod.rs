//! Input adapters: dense signal, sparse bedgraph text, ranked intervals and
//! interval pairs.

pub mod bedgraph;
pub mod bedlike;
pub mod parse;
pub mod signal;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::Result;

/// Open a text input for line-by-line reading. `-` reads stdin; a `.gz`
/// suffix transparently decompresses.
pub fn open_text_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path)?;
    if path.extension().map_or(false, |e| e == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
