//! Functionality relating to the `amptk taxonomy` subcommand itself.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use anyhow::bail;
use anyhow::Context;
use clap::Args;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::annotate;
use super::global;
use super::global::GlobalAlignmentHit;
use super::method::Databases;
use super::method::GlobalAlignmentDatabase;
use super::method::Method;
use super::method::RdpTrainingSet;
use super::method::ReferenceDatabase;
use super::method::TaxonomyMethod;
use super::output;
use super::output::Columns;
use super::parse;
use super::parse::ClassifierResultMap;
use super::reconcile;
use super::reconcile::Classifier;
use super::reconcile::ConsensusTaxonomy;
use super::reconcile::TaxonomyCall;
use super::reconcile::DEFAULT_HYBRID_IDENTITY;
use crate::utils::args::cutoff_in_range;
use crate::utils::args::default_cpus;
use crate::utils::display;
use crate::utils::formats::fasta;
use crate::utils::pathbuf::absolute;
use crate::utils::pathbuf::basename_from_fasta;
use crate::utils::pathbuf::WithSuffix;
use crate::utils::tools;

/// Output format requested from BLAST.
const BLAST_OUTFMT: &str = "6 qseqid sseqid pident stitle";

//========================//
// Command line arguments //
//========================//

/// Clap arguments for the `amptk taxonomy` subcommand.
#[derive(Args, Debug)]
pub struct TaxonomyArgs {
    /// OTU table to append taxonomy to.
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    pub otu_table: Option<PathBuf>,

    /// OTU sequences.
    #[arg(short = 'f', long, value_name = "PATH")]
    pub fasta: PathBuf,

    /// Output basename. Defaults to the FASTA file name up to `.fa`.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// QIIME mapping file passed on to the BIOM converter.
    #[arg(short = 'm', long = "mapping_file", value_name = "PATH")]
    pub mapping_file: Option<PathBuf>,

    /// Taxonomy method.
    #[arg(long, value_enum, default_value = "hybrid")]
    pub method: Method,

    /// Preinstalled database.
    #[arg(short = 'd', long, value_enum)]
    pub db: Option<ReferenceDatabase>,

    /// Taxonomy computed elsewhere, as a two column file.
    #[arg(short = 't', long, value_name = "PATH")]
    pub taxonomy: Option<PathBuf>,

    /// Alternative database of FASTA sequences.
    #[arg(long = "fasta_db", value_name = "PATH")]
    pub fasta_db: Option<PathBuf>,

    /// Custom FASTA sequences added to the database on the fly.
    #[arg(long, value_name = "PATH")]
    pub add2db: Option<PathBuf>,

    /// UTAX reference database.
    #[arg(long = "utax_db", value_name = "PATH")]
    pub utax_db: Option<PathBuf>,

    /// UTAX confidence threshold.
    #[arg(long = "utax_cutoff", value_name = "F64", default_value = "0.8")]
    #[arg(value_parser = cutoff_in_range)]
    pub utax_cutoff: f64,

    /// USEARCH global alignment reference database.
    #[arg(long = "usearch_db", value_name = "PATH")]
    pub usearch_db: Option<PathBuf>,

    /// Global alignment identity threshold.
    #[arg(long = "usearch_cutoff", value_name = "F64", default_value = "0.7")]
    #[arg(value_parser = cutoff_in_range)]
    pub usearch_cutoff: f64,

    /// Path to the RDP classifier jar.
    #[arg(short = 'r', long, value_name = "PATH", default_value = "classifier.jar")]
    pub rdp: PathBuf,

    /// Training set for the RDP classifier.
    #[arg(long = "rdp_db", value_enum, default_value = "fungalits_unite")]
    pub rdp_db: RdpTrainingSet,

    /// RDP confidence threshold.
    #[arg(long = "rdp_cutoff", value_name = "F64", default_value = "0.8")]
    #[arg(value_parser = cutoff_in_range)]
    pub rdp_cutoff: f64,

    /// Local BLAST database. Without it BLAST runs remotely against NCBI nt.
    #[arg(long = "local_blast", value_name = "PATH")]
    pub local_blast: Option<PathBuf>,

    /// USEARCH executable.
    #[arg(short = 'u', long, value_name = "PATH", default_value = "usearch9")]
    pub usearch: PathBuf,

    /// Keep only OTUs whose taxonomy contains this text.
    #[arg(long = "tax_filter", value_name = "STRING")]
    pub tax_filter: Option<String>,

    /// SINTAX confidence threshold.
    #[arg(long = "sintax_cutoff", value_name = "F64", default_value = "0.8")]
    #[arg(value_parser = cutoff_in_range)]
    pub sintax_cutoff: f64,

    /// Identity a global alignment hit must exceed to override a classifier
    /// in hybrid mode.
    #[arg(long = "hybrid_identity", value_name = "F64", default_value_t = DEFAULT_HYBRID_IDENTITY)]
    #[arg(value_parser = cutoff_in_range)]
    pub hybrid_identity: f64,

    /// Keep intermediate files.
    #[arg(long)]
    pub debug: bool,

    /// Directory holding the preinstalled databases.
    #[arg(long = "db_dir", env = "AMPTK_DB", value_name = "PATH", default_value = "DB")]
    pub db_dir: PathBuf,

    /// Number of threads handed to external tools.
    #[arg(long, value_name = "USIZE")]
    pub cpus: Option<usize>,
}

impl TaxonomyArgs {
    /// The basename every output file is named after.
    pub fn basename(&self) -> PathBuf {
        match &self.out {
            Some(out) => out.clone(),
            None => basename_from_fasta(&self.fasta),
        }
    }

    /// The run log file.
    pub fn log_path(&self) -> PathBuf {
        self.basename().with_suffix(".amptk-taxonomy.log")
    }
}

/// Intermediate files written during a run.
struct RunFiles {
    blast: PathBuf,
    rdp: PathBuf,
    utax: PathBuf,
    usearch: PathBuf,
    sintax: PathBuf,
    custom_db: PathBuf,
    otu_table: PathBuf,
    otu_table_tmp: PathBuf,
    otus: PathBuf,
    taxonomy: PathBuf,
    qiime: PathBuf,
    tree: PathBuf,
    biom: PathBuf,
}

impl RunFiles {
    fn new(base: &Path) -> Self {
        RunFiles {
            blast: base.with_suffix(".blast.txt"),
            rdp: base.with_suffix(".rdp.txt"),
            utax: base.with_suffix(".utax.txt"),
            usearch: base.with_suffix(".usearch.txt"),
            sintax: base.with_suffix(".sintax.txt"),
            custom_db: base.with_suffix(".custom_database.fa"),
            otu_table: base.with_suffix(".otu_table.taxonomy.txt"),
            otu_table_tmp: base.with_suffix(".otu_table.tmp"),
            otus: base.with_suffix(".otus.taxonomy.fa"),
            taxonomy: base.with_suffix(".taxonomy.txt"),
            qiime: base.with_suffix(".qiime.taxonomy.txt"),
            tree: base.with_suffix(".tree.phy"),
            biom: base.with_suffix(".biom"),
        }
    }
}

/// Everything computed by the selected method.
#[derive(Default)]
struct Assignment {
    consensus: ConsensusTaxonomy,
    global: Option<HashMap<String, GlobalAlignmentHit>>,
    utax: Option<ClassifierResultMap>,
    sintax: Option<ClassifierResultMap>,
}

impl Assignment {
    fn columns(&self) -> Columns<'_> {
        match (&self.global, &self.utax, &self.sintax) {
            (Some(global), Some(utax), Some(sintax)) => Columns::Hybrid {
                global,
                sintax,
                utax,
            },
            (Some(global), None, None) => Columns::GlobalAlignment(global),
            _ => Columns::Consensus,
        }
    }
}

//====================================//
// Prepares the `taxonomy` subcommand //
//====================================//

/// Main function for the `amptk taxonomy` subcommand.
pub fn taxonomy(args: TaxonomyArgs) -> anyhow::Result<()> {
    info!("Starting taxonomy command...");

    let base = args.basename();
    let files = RunFiles::new(&base);
    let method = TaxonomyMethod::resolve(args.method, args.taxonomy.clone());

    debug!("Arguments:");
    debug!("  [*] OTUs: {}", args.fasta.display());
    debug!("  [*] Method: {}", method);
    debug!("  [*] Output basename: {}", base.display());

    let usearch = tools::require(&args.usearch)?;

    let databases = Databases::resolve(
        args.db,
        &args.db_dir,
        args.usearch_db.clone(),
        args.utax_db.clone(),
        args.fasta_db.clone(),
    );
    debug!("  [*] Databases: {:?}", databases);

    if method.needs_database() && !databases.any_selected() {
        bail!(
            "You have not selected a database, need either --db, --utax_db, \
            --usearch_db, or --fasta_db"
        );
    }

    let custom_db = match &args.add2db {
        Some(add2db) => {
            info!("Adding {} to database", add2db.display());
            let current = match databases.base_fasta() {
                Some(p) => p,
                None => bail!("--add2db requires --db or --fasta_db"),
            };
            concatenate(&[current, add2db.as_path()], &files.custom_db)?;
            Some(files.custom_db.clone())
        }
        None => None,
    };

    info!("Loading FASTA Records");
    let ids = fasta::names(&args.fasta)?;
    info!("{} OTUs", display::count(ids.len()));

    //=================//
    // Assign taxonomy //
    //=================//

    let assignment = match &method {
        TaxonomyMethod::Blast => Assignment {
            consensus: blast(&args, &files)?,
            ..Default::default()
        },
        TaxonomyMethod::Rdp => Assignment {
            consensus: rdp(&args, &files)?,
            ..Default::default()
        },
        TaxonomyMethod::ExternalTaxonomyFile(path) => {
            debug!("Loading custom taxonomy from {}", path.display());
            let consensus = parse::taxonomy_file(path)?
                .into_iter()
                .map(|(id, tax)| (id, TaxonomyCall::External(tax)))
                .collect();
            Assignment {
                consensus,
                ..Default::default()
            }
        }
        TaxonomyMethod::GlobalAlignment => {
            let target = match databases.global_alignment(custom_db.as_deref()) {
                Some(target) => target,
                None => bail!("no global alignment database was selected"),
            };
            run_global_alignment(&args, &usearch, &target, &files.usearch)?;
            require_output(&files.usearch, "global alignment")?;

            let hits = global::parse(&files.usearch)?;
            let consensus = reconcile::best_taxonomy(
                &hits,
                &HashMap::new(),
                ids.iter().map(String::as_str),
                args.hybrid_identity,
            );
            Assignment {
                consensus,
                global: Some(hits),
                ..Default::default()
            }
        }
        TaxonomyMethod::Utax => {
            let db = match &databases.utax {
                Some(db) => db,
                None => bail!("no UTAX database was selected"),
            };
            run_utax(&args, &usearch, db, &files.utax)?;
            require_output(&files.utax, "UTAX")?;

            let calls = parse::classifier(&files.utax, args.utax_cutoff)?;
            Assignment {
                consensus: classified(&calls, Classifier::Utax),
                ..Default::default()
            }
        }
        TaxonomyMethod::Sintax => {
            let db = match &databases.sintax {
                Some(db) => db,
                None => bail!("no SINTAX database was selected, use --db or --fasta_db"),
            };
            run_sintax(&args, &usearch, db, &files.sintax)?;
            require_output(&files.sintax, "SINTAX")?;

            let calls = parse::classifier(&files.sintax, args.sintax_cutoff)?;
            Assignment {
                consensus: classified(&calls, Classifier::Sintax),
                ..Default::default()
            }
        }
        TaxonomyMethod::Hybrid => hybrid(
            &args,
            &usearch,
            &databases,
            custom_db.as_deref(),
            &ids,
            &files,
        )?,
    };

    //==========//
    // Annotate //
    //==========//

    let mut biom_input = args.otu_table.clone();

    if let Some(table) = &args.otu_table {
        info!("Appending taxonomy to OTU table and OTUs");

        let filter = match (&method, args.tax_filter.as_deref()) {
            (TaxonomyMethod::Blast, Some(_)) => {
                info!("Blast is incompatible with --tax_filter, use a different method");
                None
            }
            (_, filter) => filter,
        };

        let summary = annotate::annotate_table(
            table,
            &files.otu_table,
            &assignment.consensus,
            filter,
            filter.map(|_| files.otu_table_tmp.as_path()),
        )?;

        if let Some(f) = filter {
            info!(
                "Found {} OTUs not matching {}, writing {} {} hits to taxonomy OTU table",
                display::count(summary.dropped),
                f,
                display::count(summary.kept),
                f
            );
            biom_input = Some(files.otu_table_tmp.clone());
        }
    }

    annotate::annotate_fasta(&args.fasta, &files.otus, &assignment.consensus)?;

    let taxonomy_file = match &method {
        TaxonomyMethod::ExternalTaxonomyFile(path) => path.clone(),
        _ => {
            output::write_taxonomy(&files.taxonomy, &assignment.consensus, &assignment.columns())?;
            files.taxonomy.clone()
        }
    };

    if method != TaxonomyMethod::Blast {
        output::write_qiime(&taxonomy_file, &files.qiime)?;
    } else {
        warn!("Blast taxonomy is not compatible with BIOM output, use a different method");
    }

    //======//
    // Tree //
    //======//

    info!("Generating phylogenetic tree");
    tools::run_producing(
        Command::new(&usearch)
            .arg("-cluster_agg")
            .arg(&args.fasta)
            .arg("-treeout")
            .arg(&files.tree),
        &files.tree,
    )?;

    info!("Taxonomy finished: {}", taxonomy_file.display());

    //======//
    // BIOM //
    //======//

    if let (Some(input), false) = (biom_input, method == TaxonomyMethod::Blast) {
        info!("Classic OTU table with taxonomy: {}", files.otu_table.display());

        if tools::is_installed("biom") {
            biom(&input, &files.qiime, args.mapping_file.as_deref(), &files.biom)?;
            info!("BIOM OTU table created: {}", files.biom.display());
        } else {
            info!("biom program not installed, install via `pip install biom-format`");
        }
    }

    info!("OTUs with taxonomy: {}", files.otus.display());
    info!("OTU phylogeny: {}", files.tree.display());

    if !args.debug {
        for path in [
            &files.utax,
            &files.usearch,
            &files.sintax,
            &files.qiime,
            &files.otu_table_tmp,
        ] {
            tools::remove_file(path);
        }
    }

    Ok(())
}

//=========//
// Methods //
//=========//

/// Tags every classifier call with its method.
fn classified(calls: &ClassifierResultMap, method: Classifier) -> ConsensusTaxonomy {
    calls
        .iter()
        .map(|(id, taxonomy)| {
            let call = TaxonomyCall::Classified {
                method,
                taxonomy: taxonomy.clone(),
            };
            (id.clone(), call)
        })
        .collect()
}

/// Bails if a tool that gates the run produced no output.
fn require_output(path: &Path, stage: &str) -> anyhow::Result<()> {
    match tools::output_exists(path) {
        true => Ok(()),
        false => bail!(
            "{} produced no output ({}), see the log file for details",
            stage,
            path.display()
        ),
    }
}

/// Parses the output of an optional hybrid stage, or warns and falls back to
/// an empty result.
fn optional_output<T, F>(path: &Path, stage: &str, parse: F) -> anyhow::Result<T>
where
    T: Default,
    F: FnOnce(&Path) -> anyhow::Result<T>,
{
    match tools::output_exists(path) {
        true => parse(path),
        false => {
            warn!("{} produced no output, continuing without it", stage);
            Ok(T::default())
        }
    }
}

fn hybrid(
    args: &TaxonomyArgs,
    usearch: &Path,
    databases: &Databases,
    custom_db: Option<&Path>,
    ids: &[String],
    files: &RunFiles,
) -> anyhow::Result<Assignment> {
    match databases.global_alignment(custom_db) {
        Some(target) => run_global_alignment(args, usearch, &target, &files.usearch)?,
        None => warn!("USEARCH DB not found, skipping global alignment"),
    }

    match &databases.utax {
        Some(db) => run_utax(args, usearch, db, &files.utax)?,
        None => warn!("UTAX DB not found, skipping"),
    }

    match &databases.sintax {
        Some(db) => run_sintax(args, usearch, db, &files.sintax)?,
        None => warn!("SINTAX DB not found, skipping"),
    }

    let global = optional_output(&files.usearch, "Global alignment", |p| global::parse(p))?;
    let utax = optional_output(&files.utax, "UTAX", |p| {
        parse::classifier(p, args.utax_cutoff)
    })?;
    let sintax = optional_output(&files.sintax, "SINTAX", |p| {
        parse::classifier(p, args.sintax_cutoff)
    })?;

    let classified =
        reconcile::best_classifier(&utax, &sintax, ids.iter().map(String::as_str));
    let consensus = reconcile::best_taxonomy(
        &global,
        &classified,
        ids.iter().map(String::as_str),
        args.hybrid_identity,
    );

    Ok(Assignment {
        consensus,
        global: Some(global),
        utax: Some(utax),
        sintax: Some(sintax),
    })
}

fn blast(args: &TaxonomyArgs, files: &RunFiles) -> anyhow::Result<ConsensusTaxonomy> {
    let blastn = tools::require("blastn")?;
    let mut cmd = Command::new(blastn);

    match &args.local_blast {
        Some(db) => {
            info!("Running local BLAST using db: {}", db.display());
            let cpus = args.cpus.unwrap_or_else(default_cpus);
            cmd.arg("-num_threads")
                .arg(cpus.to_string())
                .arg("-query")
                .arg(&args.fasta)
                .arg("-db")
                .arg(absolute(db)?);
        }
        None => {
            info!("Running BLASTN using NCBI remote nt database, this may take awhile");
            cmd.arg("-query")
                .arg(&args.fasta)
                .args(["-db", "nt", "-remote"]);
        }
    }

    cmd.args(["-max_target_seqs", "1", "-outfmt", BLAST_OUTFMT])
        .arg("-out")
        .arg(&files.blast);
    tools::run_producing(&mut cmd, &files.blast)?;
    require_output(&files.blast, "BLAST")?;

    Ok(parse::blast(&files.blast)?
        .into_iter()
        .map(|(id, hit)| (id, TaxonomyCall::Blast(hit)))
        .collect())
}

fn rdp(args: &TaxonomyArgs, files: &RunFiles) -> anyhow::Result<ConsensusTaxonomy> {
    let java = tools::require("java")?;
    if !args.rdp.is_file() {
        bail!("{} not found, exiting.", args.rdp.display());
    }

    info!("Using RDP classifier {} training set", args.rdp_db);
    let training_set = args.rdp_db.to_string();
    tools::run_producing(
        Command::new(java)
            .arg("-Xmx2000m")
            .arg("-jar")
            .arg(&args.rdp)
            .args(["classify", "-g", training_set.as_str()])
            .arg("-o")
            .arg(&files.rdp)
            .args(["-f", "fixrank"])
            .arg(&args.fasta),
        &files.rdp,
    )?;
    require_output(&files.rdp, "RDP classifier")?;

    let calls = parse::rdp(&files.rdp, args.rdp_cutoff)?;
    Ok(classified(&calls, Classifier::Rdp))
}

fn run_global_alignment(
    args: &TaxonomyArgs,
    usearch: &Path,
    target: &GlobalAlignmentDatabase,
    out: &Path,
) -> anyhow::Result<()> {
    let identity = args.usearch_cutoff.to_string();

    match target {
        GlobalAlignmentDatabase::Fasta(db) => {
            info!("Global alignment OTUs with usearch_global (VSEARCH)");
            let vsearch = tools::require("vsearch")?;
            tools::run_producing(
                Command::new(vsearch)
                    .arg("--usearch_global")
                    .arg(&args.fasta)
                    .arg("--db")
                    .arg(absolute(db)?)
                    .arg("--userout")
                    .arg(out)
                    .args(["--id", identity.as_str(), "--strand", "both"])
                    .args(["--output_no_hits", "--top_hits_only"])
                    .args(["--userfields", "query+target+id", "--notrunclabels"]),
                out,
            )
        }
        GlobalAlignmentDatabase::Udb(db) => {
            info!("Global alignment OTUs with usearch_global (USEARCH)");
            tools::run_producing(
                Command::new(usearch)
                    .arg("-usearch_global")
                    .arg(&args.fasta)
                    .arg("-db")
                    .arg(db)
                    .arg("-userout")
                    .arg(out)
                    .args(["-id", identity.as_str(), "-strand", "both"])
                    .args(["-output_no_hits", "-top_hit_only"])
                    .args(["-userfields", "query+target+id"]),
                out,
            )
        }
    }
}

fn run_utax(args: &TaxonomyArgs, usearch: &Path, db: &Path, out: &Path) -> anyhow::Result<()> {
    info!("Classifying OTUs with UTAX (USEARCH)");
    let cutoff = args.utax_cutoff.to_string();
    tools::run_producing(
        Command::new(usearch)
            .arg("-utax")
            .arg(&args.fasta)
            .arg("-db")
            .arg(db)
            .arg("-utaxout")
            .arg(out)
            .args(["-utax_cutoff", cutoff.as_str()])
            .args(["-strand", "plus", "-notrunclabels"]),
        out,
    )
}

fn run_sintax(args: &TaxonomyArgs, usearch: &Path, db: &Path, out: &Path) -> anyhow::Result<()> {
    info!("Classifying OTUs with SINTAX (USEARCH)");
    let cutoff = args.sintax_cutoff.to_string();
    tools::run_producing(
        Command::new(usearch)
            .arg("-sintax")
            .arg(&args.fasta)
            .arg("-db")
            .arg(absolute(db)?)
            .arg("-tabbedout")
            .arg(out)
            .args(["-sintax_cutoff", cutoff.as_str()])
            .args(["-strand", "both"]),
        out,
    )
}

fn biom(
    table: &Path,
    metadata: &Path,
    mapping_file: Option<&Path>,
    dst: &Path,
) -> anyhow::Result<()> {
    let tmp = dst.with_suffix(".tmp");
    tools::remove_file(dst);

    tools::run_producing(
        Command::new("biom")
            .arg("convert")
            .arg("-i")
            .arg(table)
            .arg("-o")
            .arg(&tmp)
            .args(["--table-type", "OTU table", "--to-json"]),
        &tmp,
    )?;

    let mut cmd = Command::new("biom");
    cmd.arg("add-metadata")
        .arg("-i")
        .arg(&tmp)
        .arg("-o")
        .arg(dst)
        .arg("--observation-metadata-fp")
        .arg(metadata);
    if let Some(mapping) = mapping_file {
        cmd.arg("-m").arg(mapping);
    }
    cmd.args(["--sc-separated", "taxonomy", "--output-as-json"]);
    tools::run(&mut cmd)?;

    tools::remove_file(&tmp);
    Ok(())
}

/// Writes the contents of every file in `srcs`, in order, to `dst`.
fn concatenate(srcs: &[&Path], dst: &Path) -> anyhow::Result<()> {
    let out = File::create(dst).with_context(|| format!("creating {}", dst.display()))?;
    let mut writer = BufWriter::new(out);

    for src in srcs {
        let mut reader =
            File::open(src).with_context(|| format!("opening {}", src.display()))?;
        io::copy(&mut reader, &mut writer)
            .with_context(|| format!("copying {} to {}", src.display(), dst.display()))?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use clap::Parser;

    use crate::taxonomy::ranks::RankedTaxonomy;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        args: TaxonomyArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["amptk", "-f", "run.filtered.otus.fa"]);
        let args = cli.args;

        assert_eq!(args.method, Method::Hybrid);
        assert_eq!(args.utax_cutoff, 0.8);
        assert_eq!(args.usearch_cutoff, 0.7);
        assert_eq!(args.hybrid_identity, 0.97);
        assert_eq!(args.rdp_db, RdpTrainingSet::FungalItsUnite);
        assert_eq!(args.usearch, PathBuf::from("usearch9"));
        assert_eq!(args.basename(), PathBuf::from("run"));
        assert_eq!(args.log_path(), PathBuf::from("run.amptk-taxonomy.log"));
    }

    #[test]
    fn test_flags_keep_their_names() {
        let cli = Cli::parse_from([
            "amptk",
            "-f",
            "otus.fa",
            "-i",
            "otu_table.txt",
            "--method",
            "usearch",
            "-d",
            "16S",
            "--tax_filter",
            "Fungi",
            "--usearch_cutoff",
            "0.9",
            "-o",
            "out/run",
        ]);
        let args = cli.args;

        assert_eq!(args.otu_table, Some(PathBuf::from("otu_table.txt")));
        assert_eq!(args.method, Method::Usearch);
        assert_eq!(args.db, Some(ReferenceDatabase::SixteenS));
        assert_eq!(args.tax_filter.as_deref(), Some("Fungi"));
        assert_eq!(args.usearch_cutoff, 0.9);
        assert_eq!(args.basename(), PathBuf::from("out/run"));
    }

    #[test]
    fn test_cutoff_out_of_range_is_rejected() {
        let result = Cli::try_parse_from(["amptk", "-f", "otus.fa", "--sintax_cutoff", "1.5"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_classified_tags_calls() {
        let mut calls = ClassifierResultMap::new();
        calls.insert(String::from("OTU1"), RankedTaxonomy::parse("k:Fungi,p:Ascomycota"));

        let consensus = classified(&calls, Classifier::Rdp);
        assert_eq!(consensus.label("OTU1"), "RDP;k:Fungi,p:Ascomycota");
        assert_eq!(consensus.label("OTU2"), "No Hit");
    }

    #[test]
    fn test_optional_output_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("run.utax.txt");

        let calls = optional_output(&missing, "UTAX", |p| parse::classifier(p, 0.8)).unwrap();
        assert!(calls.is_empty());
        assert!(require_output(&missing, "UTAX").is_err());
    }

    #[test]
    fn test_concatenate() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.fa");
        let b = dir.path().join("b.fa");
        let dst = dir.path().join("run.custom_database.fa");
        fs::write(&a, ">A;tax=k:Fungi\nACGT\n").unwrap();
        fs::write(&b, ">B;tax=k:Fungi\nGGCC\n").unwrap();

        concatenate(&[a.as_path(), b.as_path()], &dst).unwrap();
        assert_eq!(fasta::count(&dst).unwrap(), 2);
    }

    #[test]
    fn test_hybrid_columns_selected() {
        let assignment = Assignment {
            global: Some(HashMap::new()),
            utax: Some(ClassifierResultMap::new()),
            sintax: Some(ClassifierResultMap::new()),
            ..Default::default()
        };
        assert!(matches!(assignment.columns(), Columns::Hybrid { .. }));

        let assignment = Assignment::default();
        assert!(matches!(assignment.columns(), Columns::Consensus));
    }
}
