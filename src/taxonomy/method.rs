//! Taxonomy methods and the reference databases they run against.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use clap::ValueEnum;

//=========//
// Methods //
//=========//

/// Methods selectable with `--method`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Method {
    /// UTAX classifier.
    Utax,

    /// Global alignment against a reference database.
    Usearch,

    /// SINTAX classifier.
    Sintax,

    /// Global alignment reconciled with UTAX and SINTAX.
    Hybrid,

    /// RDP naive Bayesian classifier.
    Rdp,

    /// BLASTN against NCBI nt or a local database.
    Blast,
}

/// How taxonomy is assigned in one run. Resolved once from the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaxonomyMethod {
    /// Global alignment best hits only.
    GlobalAlignment,

    /// UTAX calls only.
    Utax,

    /// SINTAX calls only.
    Sintax,

    /// RDP calls only.
    Rdp,

    /// BLAST best hits only.
    Blast,

    /// Global alignment, UTAX and SINTAX reconciled.
    Hybrid,

    /// A two-column taxonomy file computed elsewhere.
    ExternalTaxonomyFile(PathBuf),
}

impl TaxonomyMethod {
    /// Resolves the method. A taxonomy file overrides `--method`.
    pub fn resolve(method: Method, taxonomy: Option<PathBuf>) -> Self {
        if let Some(path) = taxonomy {
            return TaxonomyMethod::ExternalTaxonomyFile(path);
        }

        match method {
            Method::Utax => TaxonomyMethod::Utax,
            Method::Usearch => TaxonomyMethod::GlobalAlignment,
            Method::Sintax => TaxonomyMethod::Sintax,
            Method::Hybrid => TaxonomyMethod::Hybrid,
            Method::Rdp => TaxonomyMethod::Rdp,
            Method::Blast => TaxonomyMethod::Blast,
        }
    }

    /// Whether the method needs a USEARCH or FASTA reference database.
    pub fn needs_database(&self) -> bool {
        matches!(
            self,
            TaxonomyMethod::GlobalAlignment | TaxonomyMethod::Utax | TaxonomyMethod::Hybrid
        )
    }
}

impl fmt::Display for TaxonomyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonomyMethod::GlobalAlignment => write!(f, "usearch"),
            TaxonomyMethod::Utax => write!(f, "utax"),
            TaxonomyMethod::Sintax => write!(f, "sintax"),
            TaxonomyMethod::Rdp => write!(f, "rdp"),
            TaxonomyMethod::Blast => write!(f, "blast"),
            TaxonomyMethod::Hybrid => write!(f, "hybrid"),
            TaxonomyMethod::ExternalTaxonomyFile(p) => write!(f, "external ({})", p.display()),
        }
    }
}

//===========//
// Databases //
//===========//

/// Preinstalled reference databases selectable with `--db`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReferenceDatabase {
    /// Full ITS region.
    #[value(name = "ITS")]
    Its,

    /// ITS1 region.
    #[value(name = "ITS1")]
    Its1,

    /// ITS2 region.
    #[value(name = "ITS2")]
    Its2,

    /// 16S rRNA.
    #[value(name = "16S")]
    SixteenS,

    /// Large ribosomal subunit.
    #[value(name = "LSU")]
    Lsu,

    /// Cytochrome oxidase I.
    #[value(name = "COI")]
    Coi,
}

impl ReferenceDatabase {
    /// File names of the global alignment, UTAX and SINTAX databases.
    fn files(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            ReferenceDatabase::Its => ("ITS.udb", "ITS_UTAX.udb", "ITS.extracted.fa"),
            ReferenceDatabase::Its1 => ("ITS.udb", "ITS1_UTAX.udb", "ITS.extracted.fa"),
            ReferenceDatabase::Its2 => ("ITS.udb", "ITS2_UTAX.udb", "ITS.extracted.fa"),
            ReferenceDatabase::SixteenS => ("16S.udb", "16S.udb", "16S.extracted.fa"),
            ReferenceDatabase::Lsu => ("LSU.udb", "LSU_UTAX.udb", "LSU.extracted.fa"),
            ReferenceDatabase::Coi => ("COI.udb", "COI_UTAX.udb", "COI.extracted.fa"),
        }
    }
}

/// RDP classifier training sets selectable with `--rdp_db`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RdpTrainingSet {
    /// Bacterial and archaeal 16S rRNA.
    #[value(name = "16srrna")]
    SixteenSrRNA,

    /// Fungal LSU.
    #[value(name = "fungallsu")]
    FungalLsu,

    /// Fungal ITS, Warcup.
    #[value(name = "fungalits_warcup")]
    FungalItsWarcup,

    /// Fungal ITS, UNITE.
    #[value(name = "fungalits_unite")]
    FungalItsUnite,
}

impl fmt::Display for RdpTrainingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RdpTrainingSet::SixteenSrRNA => "16srrna",
            RdpTrainingSet::FungalLsu => "fungallsu",
            RdpTrainingSet::FungalItsWarcup => "fungalits_warcup",
            RdpTrainingSet::FungalItsUnite => "fungalits_unite",
        };
        f.write_str(name)
    }
}

/// Where a global alignment is run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlobalAlignmentDatabase {
    /// A FASTA database searched with `vsearch`.
    Fasta(PathBuf),

    /// A `.udb` database searched with `usearch`.
    Udb(PathBuf),
}

/// The reference databases of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Databases {
    /// The `.udb` global alignment database.
    pub usearch: Option<PathBuf>,

    /// The UTAX database.
    pub utax: Option<PathBuf>,

    /// The SINTAX (FASTA) database.
    pub sintax: Option<PathBuf>,

    /// A user FASTA database that overrides the others.
    pub fasta: Option<PathBuf>,
}

impl Databases {
    /// Resolves the databases from a preset under `db_dir` or from explicit
    /// paths. A preset takes precedence over `--usearch_db` and `--utax_db`;
    /// `--fasta_db` overrides the SINTAX database.
    pub fn resolve(
        preset: Option<ReferenceDatabase>,
        db_dir: &Path,
        usearch_db: Option<PathBuf>,
        utax_db: Option<PathBuf>,
        fasta_db: Option<PathBuf>,
    ) -> Self {
        let (usearch, utax, sintax) = match preset {
            Some(db) => {
                let (u, t, s) = db.files();
                (
                    Some(db_dir.join(u)),
                    Some(db_dir.join(t)),
                    Some(db_dir.join(s)),
                )
            }
            None => (usearch_db, utax_db, None),
        };

        Databases {
            usearch,
            utax,
            sintax: fasta_db.clone().or(sintax),
            fasta: fasta_db,
        }
    }

    /// Whether any database a global alignment or UTAX run could use is set.
    pub fn any_selected(&self) -> bool {
        self.usearch.is_some() || self.utax.is_some() || self.fasta.is_some()
    }

    /// The FASTA file that custom sequences are appended to.
    pub fn base_fasta(&self) -> Option<&Path> {
        self.fasta.as_deref().or(self.sintax.as_deref())
    }

    /// Picks the global alignment database: the user FASTA first, then a
    /// custom database built on the fly, then the `.udb`.
    pub fn global_alignment(&self, custom: Option<&Path>) -> Option<GlobalAlignmentDatabase> {
        if let Some(fasta) = &self.fasta {
            return Some(GlobalAlignmentDatabase::Fasta(fasta.clone()));
        }

        if let Some(custom) = custom {
            return Some(GlobalAlignmentDatabase::Fasta(custom.to_path_buf()));
        }

        self.usearch.clone().map(GlobalAlignmentDatabase::Udb)
    }
}
