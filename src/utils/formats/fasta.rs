//! Utilities related to opening and manipulating FASTA files.

use std::fs::File;
use std::io::BufRead;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use noodles::fasta;

/// Attempts to open a FASTA file (optionally gzipped) from a given source.
pub fn open<P>(src: P) -> anyhow::Result<fasta::Reader<Box<dyn BufRead>>>
where
    P: AsRef<Path>,
{
    super::open_maybe_gzipped(src).map(fasta::Reader::new)
}

/// Attempts to create a FASTA writer at the given destination.
pub fn writer<P>(dst: P) -> anyhow::Result<fasta::Writer<BufWriter<File>>>
where
    P: AsRef<Path>,
{
    let path = dst.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(fasta::Writer::new(BufWriter::new(file)))
}

/// Reads every record of a FASTA file into memory.
pub fn read_all<P>(src: P) -> anyhow::Result<Vec<fasta::Record>>
where
    P: AsRef<Path>,
{
    let path = src.as_ref();
    let mut reader = open(path)?;
    let mut records = Vec::new();

    for result in reader.records() {
        records.push(result.with_context(|| format!("reading FASTA record from {}", path.display()))?);
    }

    Ok(records)
}

/// Counts the records in a FASTA file.
pub fn count<P>(src: P) -> anyhow::Result<usize>
where
    P: AsRef<Path>,
{
    let path = src.as_ref();
    let mut reader = open(path)?;
    let mut n = 0;

    for result in reader.records() {
        result.with_context(|| format!("reading FASTA record from {}", path.display()))?;
        n += 1;
    }

    Ok(n)
}

/// Gets the identifiers of every record in a FASTA file, in file order.
pub fn names<P>(src: P) -> anyhow::Result<Vec<String>>
where
    P: AsRef<Path>,
{
    Ok(read_all(src)?
        .iter()
        .map(|record| record.name().to_string())
        .collect())
}

/// Builds a new record with the same name and sequence as `record` but with
/// `description` as its description.
pub fn with_description(record: &fasta::Record, description: &str) -> fasta::Record {
    let definition =
        fasta::record::Definition::new(record.name(), Some(description.to_string()));
    fasta::Record::new(definition, record.sequence().clone())
}

/// Builds a new record from a name and raw sequence.
pub fn record<N>(name: N, sequence: &[u8]) -> fasta::Record
where
    N: Into<String>,
{
    let definition = fasta::record::Definition::new(name, None);
    fasta::Record::new(definition, fasta::record::Sequence::from(sequence.to_vec()))
}
