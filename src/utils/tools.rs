//! Utilities for locating and invoking external programs.
//!
//! External tools are treated as blocking batch jobs. Their only reliable
//! success signal is whether they produced a non-empty output file, so
//! [`run`] does not fail on a non-zero exit status: it logs the status and
//! leaves the decision to the caller, which checks [`output_exists`].

use std::ffi::OsStr;
use std::fs;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;

use anyhow::bail;
use anyhow::Context;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use itertools::Itertools;
use tracing::debug;
use tracing::warn;

/// Locates `program` on the `PATH` (or verifies it, if it is a path).
pub fn require<P>(program: P) -> anyhow::Result<PathBuf>
where
    P: AsRef<OsStr>,
{
    let program = program.as_ref();
    match which::which(program) {
        Ok(path) => {
            debug!("Found {} at {}", program.to_string_lossy(), path.display());
            Ok(path)
        }
        Err(_) => bail!("{} not found in your PATH, exiting.", program.to_string_lossy()),
    }
}

/// Returns whether `program` can be found on the `PATH`.
pub fn is_installed<P>(program: P) -> bool
where
    P: AsRef<OsStr>,
{
    which::which(program).is_ok()
}

/// Renders a command as a single shell-like line for logging.
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy())
        .join(" ")
}

/// Runs `cmd` to completion, capturing its output into the debug log.
///
/// Only a failure to start the program is an error.
pub fn run(cmd: &mut Command) -> anyhow::Result<()> {
    let line = command_line(cmd);
    debug!("{}", line);

    let spinner = spinner(cmd.get_program());
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to start: {}", line));
    spinner.finish_and_clear();
    let output = output?;

    for l in String::from_utf8_lossy(&output.stdout).lines() {
        debug!("{}", l);
    }
    for l in String::from_utf8_lossy(&output.stderr).lines() {
        debug!("{}", l);
    }

    if !output.status.success() {
        warn!(
            "{} exited with {}",
            cmd.get_program().to_string_lossy(),
            output.status
        );
    }

    Ok(())
}

/// Removes any previous `out` and then runs `cmd`, so that [`output_exists`]
/// afterwards only reflects what this invocation wrote.
pub fn run_producing<P>(cmd: &mut Command, out: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    remove_file(out);
    run(cmd)
}

/// Runs `cmd` to completion, sending both stdout and stderr to `log`.
pub fn run_logged_to<P>(cmd: &mut Command, log: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let log = log.as_ref();
    let line = command_line(cmd);
    debug!("{}", line);

    let stdout = File::create(log)
        .with_context(|| format!("creating log file: {}", log.display()))?;
    let stderr = stdout.try_clone()?;

    let spinner = spinner(cmd.get_program());
    let status = cmd
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .status()
        .with_context(|| format!("failed to start: {}", line));
    spinner.finish_and_clear();
    let status = status?;

    if !status.success() {
        warn!(
            "{} exited with {}, see {}",
            cmd.get_program().to_string_lossy(),
            status,
            log.display()
        );
    }

    Ok(())
}

/// Returns whether `path` exists and is non-empty.
pub fn output_exists<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Removes a file if it exists. Failures are logged rather than returned.
pub fn remove_file<P>(path: P)
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_file() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

fn spinner(program: &OsStr) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.cyan.bold} {spinner:.green} [{elapsed_precise}] {msg}"),
    );
    pb.set_prefix("Running");
    pb.set_message(program.to_string_lossy().to_string());
    pb.enable_steady_tick(100);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let mut cmd = Command::new("vsearch");
        cmd.args(["--usearch_global", "otus.fa", "--id", "0.97"]);
        assert_eq!(command_line(&cmd), "vsearch --usearch_global otus.fa --id 0.97");
    }

    #[test]
    fn test_output_exists() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.txt");
        let full = dir.path().join("full.txt");
        fs::write(&empty, "").unwrap();
        fs::write(&full, "OTU1\t*\t0.0\n").unwrap();

        assert!(!output_exists(&empty));
        assert!(output_exists(&full));
        assert!(!output_exists(dir.path().join("missing.txt")));
        assert!(!output_exists(dir.path()));
    }

    #[test]
    fn test_require_missing_program() {
        assert!(require("amptk-definitely-not-a-real-program").is_err());
        assert!(!is_installed("amptk-definitely-not-a-real-program"));
    }

    #[test]
    fn test_remove_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.tmp");
        fs::write(&path, "x").unwrap();
        remove_file(&path);
        assert!(!path.exists());
        remove_file(&path);
    }

    #[test]
    fn test_stale_output_is_cleared_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run.utax.txt");
        fs::write(&out, "OTU1\tk:Fungi(1.0)\n").unwrap();

        let mut cmd = Command::new("amptk-definitely-not-a-real-program");
        cmd.arg("-utaxout").arg(&out);

        assert!(run_producing(&mut cmd, &out).is_err());
        assert!(!output_exists(&out));
    }
}
