//! Utilities related to bioinformatics file formats.

pub mod delimited;
pub mod fasta;
pub mod fastq;
pub mod uc;

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use flate2::read::MultiGzDecoder;

/// Opens `src` for buffered reading, transparently decompressing it if the
/// file name ends in `.gz`.
pub fn open_maybe_gzipped<P>(src: P) -> anyhow::Result<Box<dyn BufRead>>
where
    P: AsRef<Path>,
{
    let path = src.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    match path.extension().and_then(|x| x.to_str()) {
        Some("gz") => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}
