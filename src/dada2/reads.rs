//! Read preparation ahead of denoising: padding removal, length statistics
//! and splitting a demultiplexed FASTQ file into one file per sample.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use noodles::fastq;
use tracing::debug;
use tracing::warn;

use crate::utils::display;
use crate::utils::formats::fastq as fastq_utils;

/// Marker preceding the sample name in a read label.
const BARCODE_LABEL: &str = "barcodelabel=";

/// Per-sample files kept open at once while splitting.
const MAX_OPEN_SAMPLES: usize = 256;

/// Removes trailing `N` bases, and the matching quality scores, from every
/// read of `src`. Returns the number of reads written to `dst`.
pub fn strip_padding<P, Q>(src: P, dst: Q) -> anyhow::Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let src = src.as_ref();
    let mut reader = fastq_utils::open(src)?;
    let mut writer = fastq_utils::writer(dst)?;
    let mut n = 0;

    for result in reader.records() {
        let record = result.with_context(|| format!("reading {}", src.display()))?;
        let sequence = record.sequence();
        let keep = sequence
            .iter()
            .rposition(|b| !b.eq_ignore_ascii_case(&b'N'))
            .map(|i| i + 1)
            .unwrap_or(0);

        writer.write_record(&truncated(&record, keep))?;
        n += 1;
    }

    Ok(n)
}

/// Copies `record` keeping only its first `len` bases and quality scores.
fn truncated(record: &fastq::Record, len: usize) -> fastq::Record {
    let sequence = record.sequence();
    let quality = record.quality_scores();

    fastq::Record::new(
        record.name().to_vec(),
        sequence[..len.min(sequence.len())].to_vec(),
        quality[..len.min(quality.len())].to_vec(),
    )
}

/// Summary statistics of read lengths.
#[derive(Debug, PartialEq)]
pub struct LengthStats {
    /// Mean read length.
    pub mean: f64,

    /// Shortest read.
    pub min: usize,

    /// Longest read.
    pub max: usize,

    /// 5th percentile read length, so that 95% of reads are at least this long.
    pub p5: usize,
}

impl LengthStats {
    /// Computes the statistics of `lengths`, or `None` if there are none.
    pub fn from_lengths(mut lengths: Vec<usize>) -> Option<Self> {
        if lengths.is_empty() {
            return None;
        }

        lengths.sort_unstable();

        let n = lengths.len();
        let mean = lengths.iter().sum::<usize>() as f64 / n as f64;

        Some(LengthStats {
            mean,
            min: lengths[0],
            max: lengths[n - 1],
            p5: percentile(&lengths, 5.0) as usize,
        })
    }

    /// Reads the statistics from a FASTQ file.
    pub fn from_fastq<P>(src: P) -> anyhow::Result<Option<Self>>
    where
        P: AsRef<Path>,
    {
        let src = src.as_ref();
        let mut reader = fastq_utils::open(src)?;
        let mut lengths = Vec::new();

        for result in reader.records() {
            let record = result.with_context(|| format!("reading {}", src.display()))?;
            lengths.push(record.sequence().len());
        }

        Ok(Self::from_lengths(lengths))
    }

    /// The length reads are truncated to: `requested`, unless the mean read
    /// is shorter, in which case the 5th percentile.
    pub fn truncation_length(&self, requested: usize) -> usize {
        match self.mean < requested as f64 {
            true => self.p5,
            false => requested,
        }
    }
}

/// Percentile of sorted values with linear interpolation between the two
/// closest ranks.
fn percentile(sorted: &[usize], pct: f64) -> f64 {
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}

/// Extracts the sample name from a read label such as
/// `read1;barcodelabel=Sample1;`.
pub fn sample_name(label: &str) -> Option<String> {
    label
        .split_once(BARCODE_LABEL)
        .map(|(_, sample)| sample.replace(';', ""))
        .filter(|sample| !sample.is_empty())
}

/// Counts from splitting reads by sample.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Reads written.
    pub written: usize,

    /// Reads shorter than the truncation length.
    pub too_short: usize,

    /// Reads without a barcode label.
    pub unlabelled: usize,

    /// Distinct samples seen.
    pub samples: usize,
}

/// Splits `src` into `<dir>/<sample>.fastq` files, truncating every read to
/// `length` and dropping shorter ones. `dir` is recreated empty.
pub fn split_by_sample<P, Q>(src: P, dir: Q, length: usize) -> anyhow::Result<SplitSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    split_with_open_limit(src.as_ref(), dir.as_ref(), length, MAX_OPEN_SAMPLES)
}

fn split_with_open_limit(
    src: &Path,
    dir: &Path,
    length: usize,
    max_open: usize,
) -> anyhow::Result<SplitSummary> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("removing {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut writers: HashMap<String, BufWriter<File>> = HashMap::new();
    let mut samples = HashSet::new();
    let mut summary = SplitSummary::default();
    let mut reader = fastq_utils::open(src)?;

    for result in reader.records() {
        let record = result.with_context(|| format!("reading {}", src.display()))?;

        let label = String::from_utf8_lossy(record.name());
        let sample = match sample_name(&label) {
            Some(s) => s,
            None => {
                debug!("No barcodelabel in read {}", label);
                summary.unlabelled += 1;
                continue;
            }
        };

        if record.sequence().len() < length {
            summary.too_short += 1;
            continue;
        }

        if !writers.contains_key(&sample) {
            if writers.len() >= max_open {
                close_all(&mut writers)?;
            }
            writers.insert(sample.clone(), open_sample(dir, &sample)?);
        }

        if let Some(writer) = writers.get_mut(&sample) {
            fastq::Writer::new(writer).write_record(&truncated(&record, length))?;
            summary.written += 1;
        }
        samples.insert(sample);
    }

    close_all(&mut writers)?;
    summary.samples = samples.len();

    if summary.unlabelled > 0 {
        warn!(
            "{} reads had no barcodelabel and were skipped",
            display::count(summary.unlabelled)
        );
    }

    Ok(summary)
}

/// Opens `<dir>/<sample>.fastq` for appending, so a sample whose file was
/// closed earlier picks up where it left off.
fn open_sample(dir: &Path, sample: &str) -> anyhow::Result<BufWriter<File>> {
    let path = dir.join(format!("{}.fastq", sample));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn close_all(writers: &mut HashMap<String, BufWriter<File>>) -> anyhow::Result<()> {
    for (sample, mut writer) in writers.drain() {
        writer
            .flush()
            .with_context(|| format!("writing reads of sample {}", sample))?;
    }
    Ok(())
}
