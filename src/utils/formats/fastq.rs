//! Utilities related to opening and manipulating FASTQ files.

use std::fs::File;
use std::io::BufRead;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use noodles::fastq;

/// Attempts to open a FASTQ file (optionally gzipped) from a given source.
pub fn open<P>(src: P) -> anyhow::Result<fastq::Reader<Box<dyn BufRead>>>
where
    P: AsRef<Path>,
{
    super::open_maybe_gzipped(src).map(fastq::Reader::new)
}

/// Attempts to create a FASTQ writer at the given destination.
pub fn writer<P>(dst: P) -> anyhow::Result<fastq::Writer<BufWriter<File>>>
where
    P: AsRef<Path>,
{
    let path = dst.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(fastq::Writer::new(BufWriter::new(file)))
}

/// Counts the records in a FASTQ file.
pub fn count<P>(src: P) -> anyhow::Result<usize>
where
    P: AsRef<Path>,
{
    let path = src.as_ref();
    let mut reader = open(path)?;
    let mut n = 0;

    for result in reader.records() {
        result.with_context(|| format!("reading FASTQ record from {}", path.display()))?;
        n += 1;
    }

    Ok(n)
}
