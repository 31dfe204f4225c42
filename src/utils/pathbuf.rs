//! Extensions to and utilities concerning [`PathBuf`]s.
//!
//! # Overview
//!
//! Every file written by an `amptk` run is named `<basename><suffix>`, for
//! example `sample.taxonomy.txt` or `sample.iSeqs.fa`. [`PathBuf::set_extension`]
//! is not suitable for this because basenames often contain dots of their own.
//!
//! ```
//! use std::path::PathBuf;
//! // Trait must be in scope to use it.
//! use amptk::utils::pathbuf::WithSuffix;
//!
//! assert_eq!(
//!     PathBuf::from("run.v2").with_suffix(".taxonomy.txt"),
//!     PathBuf::from("run.v2.taxonomy.txt"))
//! ```

use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;

/// A trait that is intended to add a [`with_suffix`][WithSuffix::with_suffix]
/// method to paths used as output basenames.
pub trait WithSuffix {
    /// Returns a new path with `suffix` appended verbatim to the final
    /// component.
    fn with_suffix<S>(&self, suffix: S) -> PathBuf
    where
        S: AsRef<OsStr>;
}

impl WithSuffix for Path {
    fn with_suffix<S>(&self, suffix: S) -> PathBuf
    where
        S: AsRef<OsStr>,
    {
        let mut s = self.as_os_str().to_os_string();
        s.push(suffix);
        PathBuf::from(s)
    }
}

impl WithSuffix for PathBuf {
    fn with_suffix<S>(&self, suffix: S) -> PathBuf
    where
        S: AsRef<OsStr>,
    {
        self.as_path().with_suffix(suffix)
    }
}

/// Derives an output basename from an OTU FASTA file name: everything before
/// `.filtered.otus.fa` if present, otherwise everything before the first
/// `.fa`.
pub fn basename_from_fasta(fasta: &Path) -> PathBuf {
    let s = fasta.to_string_lossy();

    let base = match s.find(".filtered.otus.fa") {
        Some(i) => &s[..i],
        None => match s.find(".fa") {
            Some(i) => &s[..i],
            None => &s[..],
        },
    };

    PathBuf::from(base)
}

/// Makes `path` absolute against the current directory without touching the
/// file system.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    match path.is_absolute() {
        true => Ok(path.to_path_buf()),
        false => Ok(std::env::current_dir()?.join(path)),
    }
}
