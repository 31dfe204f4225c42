use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use amptk::dada2;
use amptk::taxonomy;
use amptk::utils::tools;
use clap::Parser;
use clap::Subcommand;
use git_testament::git_testament;
use git_testament::render_testament;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

mod errors;

git_testament!(TESTAMENT);

#[derive(Parser)]
#[command(author, version = render_testament!(TESTAMENT), propagate_version = true, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Only errors are printed to the stderr stream.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// All available information, including debug information, is printed to
    /// stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assigns taxonomy to OTUs and annotates the OTU table.
    Taxonomy(taxonomy::command::TaxonomyArgs),

    /// Denoises reads into inferred sequences with DADA2 and clusters them
    /// into biological OTUs.
    Dada2(dada2::command::Dada2Args),
}

impl Commands {
    fn log_path(&self) -> PathBuf {
        match self {
            Commands::Taxonomy(args) => args.log_path(),
            Commands::Dada2(args) => args.log_path(),
        }
    }
}

/// Sets up logging to stderr at `level` and, at the debug level, to `log`.
/// Any log left over from a previous run is replaced.
fn init_logging(level: LevelFilter, log: &Path) -> anyhow::Result<()> {
    tools::remove_file(log);
    let file = File::create(log)?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(level))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(LevelFilter::DEBUG),
        )
        .init();

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LevelFilter::ERROR
    } else if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let log = cli.command.log_path();
    init_logging(level, &log)?;

    debug!("amptk {}", render_testament!(TESTAMENT));
    debug!("Command: {}", std::env::args().collect::<Vec<_>>().join(" "));
    debug!("Log file: {}", log.display());

    let result = match cli.command {
        Commands::Taxonomy(args) => taxonomy::command::taxonomy(args),
        Commands::Dada2(args) => dada2::command::dada2(args),
    };

    if let Err(e) = result {
        errors::exit(format!("{:#}", e).as_str(), errors::ExitCode::Failure);
    }

    Ok(())
}
