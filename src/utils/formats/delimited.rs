//! Utilities related to delimited text tables.

use std::io::BufRead;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use anyhow::Context;

/// Delimiters that are recognised when sniffing a table, in order of
/// preference when counts tie.
const CANDIDATES: [u8; 3] = [b'\t', b',', b';'];

/// Guesses the field delimiter of a table from its first line. The most
/// frequent candidate wins; tab is used when no candidate occurs.
pub fn sniff_delimiter(first_line: &str) -> u8 {
    let mut best = b'\t';
    let mut best_count = 0;

    for candidate in CANDIDATES {
        let n = first_line.bytes().filter(|b| *b == candidate).count();
        if n > best_count {
            best = candidate;
            best_count = n;
        }
    }

    best
}

/// Opens the table at `src`, sniffing its delimiter from the first line, and
/// returns a streaming CSV reader over the whole file. Ragged rows are
/// tolerated and the first row is not treated specially.
pub fn open<P>(src: P) -> anyhow::Result<(u8, csv::Reader<Box<dyn Read>>)>
where
    P: AsRef<Path>,
{
    let path = src.as_ref();
    let mut reader = super::open_maybe_gzipped(path)?;

    let mut first_line = String::new();
    reader
        .read_line(&mut first_line)
        .with_context(|| format!("reading {}", path.display()))?;
    let delimiter = sniff_delimiter(first_line.trim_end_matches(['\r', '\n']));

    let stream: Box<dyn Read> = Box::new(Cursor::new(first_line.into_bytes()).chain(reader));
    let reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(stream);

    Ok((delimiter, reader))
}

/// Builds a writer that joins fields with `delimiter` and never quotes them.
pub fn writer<W>(w: W, delimiter: u8) -> csv::Writer<W>
where
    W: Write,
{
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(w)
}
