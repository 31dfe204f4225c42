//! Running the DADA2 R pipeline and reading back what it inferred.

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::bail;
use anyhow::Context;
use clap::ValueEnum;

use crate::utils::formats::fasta;

/// Prefix of inferred sequence identifiers.
pub const ISEQ_PREFIX: &str = "iSeq_";

/// Sequencing platforms the R pipeline has error models for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Platform {
    /// Ion Torrent.
    Ion,

    /// Illumina.
    Illumina,

    /// Roche 454.
    #[value(name = "454")]
    Roche454,
}

impl Platform {
    fn as_str(&self) -> &'static str {
        match self {
            Platform::Ion => "ion",
            Platform::Illumina => "illumina",
            Platform::Roche454 => "454",
        }
    }
}

/// Builds the `Rscript` invocation of the DADA2 pipeline script.
pub fn rscript_command(
    script: &Path,
    folder: &Path,
    csv: &Path,
    platform: Platform,
    pool: bool,
    cpus: usize,
) -> Command {
    let pool = match pool {
        true => "TRUE",
        false => "FALSE",
    };

    let mut cmd = Command::new("Rscript");
    cmd.arg("--vanilla")
        .arg(script)
        .arg(folder)
        .arg(csv)
        .arg(platform.as_str())
        .arg(pool)
        .arg(cpus.to_string());
    cmd
}

/// Writes the sequences of a DADA2 sequence table CSV as FASTA records named
/// `iSeq_1` to `iSeq_N`. The header row is skipped and quotes are removed.
pub fn csv_to_fasta<P, Q>(src: P, dst: Q) -> anyhow::Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let src = src.as_ref();
    let contents =
        fs::read_to_string(src).with_context(|| format!("reading {}", src.display()))?;
    let mut writer = fasta::writer(dst)?;
    let mut n = 0;

    for line in contents.lines().skip(1) {
        let line = line.replace('"', "");
        let sequence = line.split(',').next().unwrap_or_default().trim();
        if sequence.is_empty() {
            continue;
        }

        n += 1;
        let record = fasta::record(format!("{}{}", ISEQ_PREFIX, n), sequence.as_bytes());
        writer.write_record(&record)?;
    }

    Ok(n)
}

/// Facts reported in the R pipeline's log.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RscriptLog {
    /// De novo chimeras (bimeras) removed.
    pub chimeras: usize,

    /// Inferred sequences before chimera removal.
    pub total: usize,

    /// The DADA2 package version.
    pub dada2_version: Option<String>,

    /// The R version.
    pub r_version: Option<String>,
}

impl RscriptLog {
    /// Inferred sequences that are not chimeras.
    pub fn valid(&self) -> usize {
        self.total.saturating_sub(self.chimeras)
    }

    /// Parses the R log. A line such as
    /// `Identified 12 bimeras out of 345 input sequences.` is required; the
    /// version lines are optional.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let mut counts = None;
        let mut log = RscriptLog::default();

        for line in contents.lines() {
            if line.starts_with("Identified ") {
                let tokens: Vec<&str> = line.split(' ').collect();
                if tokens.len() < 6 {
                    bail!("unexpected chimera summary line: {}", line);
                }

                let chimeras = tokens[1]
                    .parse::<usize>()
                    .with_context(|| format!("invalid chimera count in: {}", line))?;
                let total = tokens[5]
                    .parse::<usize>()
                    .with_context(|| format!("invalid sequence count in: {}", line))?;
                counts = Some((chimeras, total));
            } else if line.starts_with("[1] \"dada2") {
                log.dada2_version = last_token(line);
            } else if line.starts_with("[1] \"R ") {
                log.r_version = last_token(line);
            }
        }

        match counts {
            Some((chimeras, total)) => {
                log.chimeras = chimeras;
                log.total = total;
                Ok(log)
            }
            None => bail!("no chimera summary (\"Identified ...\") found in the DADA2 log"),
        }
    }

    /// Reads and parses the R log at `src`.
    pub fn read<P>(src: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let src = src.as_ref();
        let contents =
            fs::read_to_string(src).with_context(|| format!("reading {}", src.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing {}", src.display()))
    }
}

fn last_token(line: &str) -> Option<String> {
    line.split(' ')
        .last()
        .map(|t| t.replace('"', "").trim().to_string())
        .filter(|t| !t.is_empty())
}
