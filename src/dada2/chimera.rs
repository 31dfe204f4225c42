//! Optional reference-based chimera filtering of inferred sequences.

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use tracing::info;
use tracing::warn;

use crate::utils::formats::fasta;
use crate::utils::pathbuf::absolute;
use crate::utils::sort::natural_cmp;
use crate::utils::tools;

/// Reference names that resolve to a preinstalled database.
const PRESETS: [&str; 4] = ["ITS", "16S", "LSU", "COI"];

/// Resolves `--uchime_ref` to a database file. Presets resolve to
/// `<db_dir>/<preset>.extracted.fa`; anything else is taken as a path.
/// Returns `None`, with a warning, when the database does not exist.
pub fn resolve_reference(uchime_ref: &str, db_dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    if PRESETS.contains(&uchime_ref) {
        let db = db_dir.join(format!("{}.extracted.fa", uchime_ref));
        if !db.is_file() {
            warn!(
                "Database {} not properly configured, run `amptk install` to setup DB, \
                skipping chimera filtering",
                db.display()
            );
            return Ok(None);
        }
        return Ok(Some(db));
    }

    let path = Path::new(uchime_ref);
    if !path.is_file() {
        warn!(
            "{} is not a valid file, skipping reference chimera filtering",
            uchime_ref
        );
        return Ok(None);
    }

    Ok(Some(absolute(path)?))
}

/// Runs `vsearch --uchime_ref` on `input` against `db`, writing the
/// non-chimeric sequences to `out`. Returns `None`, with a warning, if the
/// tool produced nothing.
pub fn filter(input: &Path, db: &Path, out: &Path) -> anyhow::Result<Option<usize>> {
    let vsearch = tools::require("vsearch")?;
    tools::run_producing(
        Command::new(vsearch)
            .args(["--mindiv", "1.0", "--uchime_ref"])
            .arg(input)
            .arg("--db")
            .arg(db)
            .arg("--nonchimeras")
            .arg(out),
        out,
    )?;

    if !tools::output_exists(out) {
        warn!("Reference chimera filtering produced no output, skipping it");
        return Ok(None);
    }

    let n = fasta::count(out)?;
    info!("Reference chimera filtering kept {} sequences", n);
    Ok(Some(n))
}

/// Runs the reference filter selected by `uchime_ref` and returns the file
/// holding the surviving sequences: `out` when the stage ran, `input` when it
/// was skipped.
pub fn filter_or_skip(
    uchime_ref: &str,
    db_dir: &Path,
    input: &Path,
    out: &Path,
) -> anyhow::Result<PathBuf> {
    let db = match resolve_reference(uchime_ref, db_dir)? {
        Some(db) => db,
        None => return Ok(input.to_path_buf()),
    };

    info!("Chimera Filtering (VSEARCH) using {} DB", uchime_ref);
    match filter(input, &db, out)? {
        Some(_) => Ok(out.to_path_buf()),
        None => Ok(input.to_path_buf()),
    }
}

/// Copies the records of `src` to `dst` in natural order of their names.
pub fn write_sorted<P, Q>(src: P, dst: Q) -> anyhow::Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let src = src.as_ref();
    let mut records = fasta::read_all(src)?;
    records.sort_by(|a, b| natural_cmp(a.name(), b.name()));

    let dst = dst.as_ref();
    let mut writer = fasta::writer(dst)?;
    for record in &records {
        writer
            .write_record(record)
            .with_context(|| format!("writing {}", dst.display()))?;
    }

    Ok(records.len())
}
