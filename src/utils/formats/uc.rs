//! Utilities related to the USEARCH cluster format (UC) written by
//! `vsearch --uc`.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// One tab-separated record of a UC file.
#[derive(Debug, Deserialize)]
pub struct UcRecord {
    /// Record type: `H` (hit), `N` (no hit), `S` (centroid) or `C` (cluster).
    pub kind: String,

    /// Cluster number.
    pub cluster: String,

    /// Sequence length or cluster size.
    pub size: String,

    /// Percent identity to the target, or `*`.
    pub identity: String,

    /// Strand, or `*`.
    pub strand: String,

    /// Unused column.
    pub unused_one: String,

    /// Unused column.
    pub unused_two: String,

    /// Compressed alignment, or `*`.
    pub alignment: String,

    /// Query label.
    pub query: String,

    /// Target label, or `*`.
    pub target: String,
}

impl UcRecord {
    /// Whether the record reports an alignment of the query to a target.
    pub fn is_hit(&self) -> bool {
        self.kind == "H" && self.target != "*"
    }
}

/// Streams the records of a UC file. Each item fails with the offending line
/// number if it cannot be parsed.
pub fn records<P>(src: P) -> anyhow::Result<impl Iterator<Item = anyhow::Result<UcRecord>>>
where
    P: AsRef<Path>,
{
    let path = src.as_ref().to_path_buf();
    let reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .from_path(&path)
        .with_context(|| format!("opening UC file {}", path.display()))?;

    Ok(reader
        .into_deserialize::<UcRecord>()
        .enumerate()
        .map(move |(i, result)| {
            result.with_context(|| format!("parsing line {} of {}", i + 1, path.display()))
        }))
}

/// Counts the hit records of a UC file.
pub fn count_hits<P>(src: P) -> anyhow::Result<usize>
where
    P: AsRef<Path>,
{
    let mut n = 0;

    for result in records(src)? {
        if result?.is_hit() {
            n += 1;
        }
    }

    Ok(n)
}
