//! Functionality relating to the `amptk dada2` subcommand itself.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use anyhow::bail;
use anyhow::Context;
use clap::Args;
use prettytable::row;
use prettytable::Table;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::chimera;
use super::clusters;
use super::denoise;
use super::denoise::Platform;
use super::denoise::RscriptLog;
use super::reads;
use super::reads::LengthStats;
use crate::utils::args::default_cpus;
use crate::utils::args::percent_in_range;
use crate::utils::display;
use crate::utils::display::FileSize;
use crate::utils::display::PercentageFormat;
use crate::utils::formats::fasta;
use crate::utils::formats::fastq;
use crate::utils::formats::uc;
use crate::utils::pathbuf::absolute;
use crate::utils::pathbuf::WithSuffix;
use crate::utils::tools;

/// Identity used when mapping reads back onto iSeqs and OTUs.
const READ_MAPPING_IDENTITY: &str = "0.97";

//========================//
// Command line arguments //
//========================//

/// Clap arguments for the `amptk dada2` subcommand.
#[derive(Args, Debug)]
pub struct Dada2Args {
    /// Demultiplexed FASTQ file.
    #[arg(short = 'i', long, value_name = "PATH")]
    pub fastq: PathBuf,

    /// Output basename.
    #[arg(short = 'o', long, value_name = "PATH", default_value = "dada2")]
    pub out: PathBuf,

    /// Length to truncate reads to.
    #[arg(short = 'l', long, value_name = "USIZE")]
    pub length: usize,

    /// Maximum expected errors when quality filtering.
    #[arg(short = 'e', long, value_name = "F64", default_value = "1.0")]
    pub maxee: f64,

    /// Percent identity used to cluster iSeqs into biological OTUs.
    #[arg(short = 'p', long = "pct_otu", value_name = "F64", default_value = "97")]
    #[arg(value_parser = percent_in_range)]
    pub pct_otu: f64,

    /// Sequencing platform.
    #[arg(long, value_enum, default_value = "ion")]
    pub platform: Platform,

    /// Reference chimera filtering: ITS, 16S, LSU, COI or a FASTA file.
    #[arg(long = "uchime_ref", value_name = "DB")]
    pub uchime_ref: Option<String>,

    /// Pool all samples together for denoising.
    #[arg(long)]
    pub pool: bool,

    /// Keep intermediate files.
    #[arg(long)]
    pub debug: bool,

    /// Directory holding the preinstalled databases.
    #[arg(long = "db_dir", env = "AMPTK_DB", value_name = "PATH", default_value = "DB")]
    pub db_dir: PathBuf,

    /// The DADA2 R pipeline script.
    #[arg(
        long = "dada2_script",
        env = "AMPTK_DADA2_SCRIPT",
        value_name = "PATH",
        default_value = "dada2_pipeline_nofilt.R"
    )]
    pub dada2_script: PathBuf,

    /// Number of threads handed to the R pipeline.
    #[arg(long, value_name = "USIZE")]
    pub cpus: Option<usize>,

    /// USEARCH executable. Every stage of this pipeline runs on `vsearch`, so
    /// this is only checked for.
    #[arg(short = 'u', long, value_name = "PATH", default_value = "usearch9")]
    pub usearch: String,
}

impl Dada2Args {
    /// The run log file.
    pub fn log_path(&self) -> PathBuf {
        self.out.with_suffix(".amptk-dada2.log")
    }
}

/// Files written during a run.
struct RunFiles {
    cleaned: PathBuf,
    filtered: PathBuf,
    sample_dir: PathBuf,
    rscript_log: PathBuf,
    dada2_csv: PathBuf,
    raw_iseqs: PathBuf,
    nonchimeras: PathBuf,
    iseqs: PathBuf,
    iseq_table: PathBuf,
    reads_fasta: PathBuf,
    iseq_uc: PathBuf,
    otus: PathBuf,
    otu_table: PathBuf,
    otu_uc: PathBuf,
    iseq_map: PathBuf,
    provenance: PathBuf,
}

impl RunFiles {
    fn new(out: &Path) -> Self {
        RunFiles {
            cleaned: out.with_suffix(".cleaned_input.fq"),
            filtered: out.with_suffix(".qual-filtered.fq"),
            sample_dir: out.with_suffix("_filtered"),
            rscript_log: out.with_suffix(".dada2.Rscript.log"),
            dada2_csv: out.with_suffix(".dada2.csv"),
            raw_iseqs: out.with_suffix(".otus.tmp"),
            nonchimeras: out.with_suffix(".nonchimeras.fa"),
            iseqs: out.with_suffix(".iSeqs.fa"),
            iseq_table: out.with_suffix(".otu_table.txt"),
            reads_fasta: out.with_suffix(".original.fa"),
            iseq_uc: out.with_suffix(".dada2.map.uc"),
            otus: out.with_suffix(".cluster.otus.fa"),
            otu_table: out.with_suffix(".cluster.otu_table.txt"),
            otu_uc: out.with_suffix(".map.uc"),
            iseq_map: out.with_suffix(".iseq_map.uc"),
            provenance: out.with_suffix(".iSeqs2clusters.txt"),
        }
    }

    fn intermediates(&self) -> [&Path; 7] {
        [
            self.cleaned.as_path(),
            self.dada2_csv.as_path(),
            self.filtered.as_path(),
            self.reads_fasta.as_path(),
            self.otu_uc.as_path(),
            self.iseq_map.as_path(),
            self.iseq_uc.as_path(),
        ]
    }
}

//=================================//
// Prepares the `dada2` subcommand //
//=================================//

/// Main function for the `amptk dada2` subcommand.
pub fn dada2(args: Dada2Args) -> anyhow::Result<()> {
    info!("Starting dada2 command...");
    debug!("Arguments:");
    debug!("  [*] FASTQ: {}", args.fastq.display());
    debug!("  [*] Output basename: {}", args.out.display());
    debug!("  [*] Truncation length: {}", args.length);

    let files = RunFiles::new(&args.out);
    let vsearch = tools::require("vsearch")?;
    tools::require("Rscript")?;
    if !tools::is_installed(&args.usearch) {
        warn!("{} not found on the PATH, continuing with vsearch only", args.usearch);
    }

    //===============//
    // Prepare reads //
    //===============//

    info!("Loading FASTQ Records");
    let original_total = fastq::count(&args.fastq)?;
    let size = fs::metadata(&args.fastq)
        .with_context(|| format!("reading metadata of {}", args.fastq.display()))?
        .len();
    info!(
        "{} reads ({})",
        display::count(original_total),
        FileSize(size)
    );

    reads::strip_padding(&args.fastq, &files.cleaned)?;

    info!("Quality Filtering, expected errors < {}", args.maxee);
    tools::run_producing(
        Command::new(&vsearch)
            .arg("--fastq_filter")
            .arg(&files.cleaned)
            .args(["--fastq_maxee", &args.maxee.to_string()])
            .arg("--fastqout")
            .arg(&files.filtered)
            .args(["--fastq_qmax", "55", "--fastq_maxns", "0"]),
        &files.filtered,
    )?;
    if !tools::output_exists(&files.filtered) {
        bail!("no reads passed quality filtering");
    }
    info!("{} reads passed", display::count(fastq::count(&files.filtered)?));

    let stats = match LengthStats::from_fastq(&files.filtered)? {
        Some(stats) => stats,
        None => bail!("no reads passed quality filtering"),
    };
    info!(
        "DADA2 compatible read lengths, avg: {:.0} bp, min: {} bp, max: {} bp, top 95%: {} bp",
        stats.mean, stats.min, stats.max, stats.p5
    );

    let length = stats.truncation_length(args.length);
    if length != args.length {
        warn!(
            "Average length of reads {:.0} bp, is less than specified truncation length {} bp",
            stats.mean, args.length
        );
        warn!("Resetting truncation length to {} bp (keep > 95% of data)", length);
    }

    info!("Splitting FASTQ file by Sample and truncating to {} bp", length);
    let split = reads::split_by_sample(&files.filtered, &files.sample_dir, length)?;
    debug!(
        "{} reads written for {} samples, {} too short",
        display::count(split.written),
        split.samples,
        display::count(split.too_short)
    );

    //=========//
    // Denoise //
    //=========//

    info!("Running DADA2 pipeline");
    let cpus = args.cpus.unwrap_or_else(default_cpus);
    let mut cmd = denoise::rscript_command(
        &args.dada2_script,
        &files.sample_dir,
        &files.dada2_csv,
        args.platform,
        args.pool,
        cpus,
    );
    tools::remove_file(&files.dada2_csv);
    tools::run_logged_to(&mut cmd, &files.rscript_log)?;

    if !tools::output_exists(&files.dada2_csv) {
        bail!(
            "DADA2 run failed, please check {} logfile",
            files.rscript_log.display()
        );
    }

    denoise::csv_to_fasta(&files.dada2_csv, &files.raw_iseqs)?;

    let log = RscriptLog::read(&files.rscript_log)?;
    if let (Some(r), Some(dada2)) = (&log.r_version, &log.dada2_version) {
        info!("R v{}, DADA2 v{}", r, dada2);
    }
    info!("{} total inferred sequences (iSeqs)", display::count(log.total));
    info!("{} denovo chimeras removed", display::count(log.chimeras));
    info!("{} valid iSeqs", display::count(log.valid()));

    //==========================//
    // Reference chimera filter //
    //==========================//

    match &args.uchime_ref {
        Some(uchime_ref) => {
            let kept = chimera::filter_or_skip(
                uchime_ref,
                &args.db_dir,
                &files.raw_iseqs,
                &files.nonchimeras,
            )?;

            let n = chimera::write_sorted(&kept, &files.iseqs)?;
            if kept == files.nonchimeras {
                info!(
                    "{} iSeqs passed, {} ref chimeras removed",
                    display::count(n),
                    display::count(log.valid().saturating_sub(n))
                );
            }

            if !args.debug {
                tools::remove_file(&files.nonchimeras);
                tools::remove_file(&files.raw_iseqs);
            }
        }
        None => fs::rename(&files.raw_iseqs, &files.iseqs).with_context(|| {
            format!(
                "renaming {} to {}",
                files.raw_iseqs.display(),
                files.iseqs.display()
            )
        })?,
    }

    //=====================//
    // Map reads to iSeqs //
    //=====================//

    info!("Mapping reads to DADA2 iSeqs");
    tools::run_producing(
        Command::new(&vsearch)
            .arg("--fastq_filter")
            .arg(absolute(&args.fastq)?)
            .args(["--fastq_qmax", "55", "--fastq_maxns", "0"])
            .arg("--fastaout")
            .arg(&files.reads_fasta),
        &files.reads_fasta,
    )?;
    map_reads(
        &vsearch,
        &files.reads_fasta,
        &files.iseqs,
        &files.iseq_uc,
        &files.iseq_table,
    )?;
    let mapped = uc::count_hits(&files.iseq_uc)?;
    info!(
        "{} reads mapped to iSeqs ({})",
        display::count(mapped),
        PercentageFormat(mapped as u64, original_total as u64)
    );

    //=========//
    // Cluster //
    //=========//

    info!(
        "Clustering iSeqs at {}% to generate biological OTUs",
        args.pct_otu
    );
    let radius = (args.pct_otu / 100.0).to_string();
    tools::run_producing(
        Command::new(&vsearch)
            .arg("--cluster_smallmem")
            .arg(&files.iseqs)
            .arg("--centroids")
            .arg(&files.otus)
            .args(["--id", radius.as_str(), "--strand", "plus"])
            .args(["--relabel", "OTU", "--qmask", "none", "--usersort"]),
        &files.otus,
    )?;

    if !tools::output_exists(&files.otus) {
        warn!("Clustering produced no OTUs, using the iSeqs as OTUs");
        fs::copy(&files.iseqs, &files.otus)
            .with_context(|| format!("copying {}", files.iseqs.display()))?;
    }
    info!("{} OTUs generated", display::count(fasta::count(&files.otus)?));

    tools::run_producing(
        Command::new(&vsearch)
            .arg("--usearch_global")
            .arg(&files.iseqs)
            .arg("--db")
            .arg(&files.otus)
            .args(["--id", radius.as_str()])
            .arg("--uc")
            .arg(&files.iseq_map)
            .args(["--strand", "plus"]),
        &files.iseq_map,
    )?;
    let provenance = clusters::provenance(&files.iseq_map)?;
    clusters::write_provenance(&provenance, &files.provenance)?;

    info!("Mapping reads to OTUs");
    map_reads(
        &vsearch,
        &files.reads_fasta,
        &files.otus,
        &files.otu_uc,
        &files.otu_table,
    )?;
    let mapped = uc::count_hits(&files.otu_uc)?;
    info!(
        "{} reads mapped to OTUs ({})",
        display::count(mapped),
        PercentageFormat(mapped as u64, original_total as u64)
    );

    if !args.debug {
        for path in files.intermediates() {
            tools::remove_file(path);
        }
        if let Err(e) = fs::remove_dir_all(&files.sample_dir) {
            warn!("Could not remove {}: {}", files.sample_dir.display(), e);
        }
    }

    summary_table(&files, args.debug).printstd();

    Ok(())
}

/// Maps reads onto `db` and writes the abundance table.
fn map_reads(
    vsearch: &Path,
    reads: &Path,
    db: &Path,
    uc: &Path,
    table: &Path,
) -> anyhow::Result<()> {
    tools::remove_file(uc);
    tools::run_producing(
        Command::new(vsearch)
            .arg("--usearch_global")
            .arg(reads)
            .arg("--db")
            .arg(db)
            .args(["--id", READ_MAPPING_IDENTITY])
            .arg("--uc")
            .arg(uc)
            .args(["--strand", "plus"])
            .arg("--otutabout")
            .arg(table),
        table,
    )?;

    if !tools::output_exists(table) {
        bail!("mapping reads to {} produced no table", db.display());
    }

    Ok(())
}

fn summary_table(files: &RunFiles, debug: bool) -> Table {
    let mut table = Table::new();

    table.add_row(row!["Output", "File"]);
    if debug {
        table.add_row(row!["Tmp Folder of files", files.sample_dir.display()]);
    }
    table.add_row(row!["Inferred iSeqs", files.iseqs.display()]);
    table.add_row(row!["iSeq OTU Table", files.iseq_table.display()]);
    table.add_row(row!["Clustered OTUs", files.otus.display()]);
    table.add_row(row!["OTU Table", files.otu_table.display()]);
    table.add_row(row!["iSeqs 2 OTUs", files.provenance.display()]);

    table
}
