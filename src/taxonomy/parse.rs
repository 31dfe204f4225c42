//! Parsers for the raw output of the taxonomic classifiers.
//!
//! Every parser reads a tab-delimited file into a mapping keyed by sequence
//! identifier. A missing file or a row with too few columns is an error that
//! names the file and line.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use anyhow::bail;
use anyhow::Context;

use super::ranks::Rank;
use super::ranks::RankedTaxonomy;
use super::ranks::FIXED_RANKS;

/// Mapping from sequence identifier to the lineage called by one classifier.
pub type ClassifierResultMap = HashMap<String, RankedTaxonomy>;

/// A BLAST best hit for one query.
#[derive(Clone, Debug, PartialEq)]
pub struct BlastHit {
    /// The accession of the subject sequence.
    pub accession: String,

    /// The subject title.
    pub title: String,

    /// Percent identity as reported by BLAST.
    pub identity: String,
}

/// Iterates over the non-empty lines of a tab-delimited file, yielding the
/// 1-based line number and the fields. Rows with fewer than `min_columns`
/// fields are an error.
pub(super) fn for_each_row<P, F>(src: P, min_columns: usize, mut f: F) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    F: FnMut(&[&str]) -> anyhow::Result<()>,
{
    let path = src.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < min_columns {
            bail!(
                "{} line {}: expected at least {} tab-separated columns, found {}",
                path.display(),
                i + 1,
                min_columns,
                fields.len()
            );
        }

        f(&fields).with_context(|| format!("{} line {}", path.display(), i + 1))?;
    }

    Ok(())
}

/// Parses UTAX (`-utaxout`) or SINTAX (`-tabbedout`) output. The second
/// column carries `<letter>:<name>(<confidence>)` ranks; each call is cut at
/// the deepest rank above `cutoff` and stripped of trailing placeholder ranks.
pub fn classifier<P>(src: P, cutoff: f64) -> anyhow::Result<ClassifierResultMap>
where
    P: AsRef<Path>,
{
    let mut results = ClassifierResultMap::new();

    for_each_row(src, 2, |fields| {
        let taxonomy = RankedTaxonomy::parse(fields[1])
            .truncate_at_confidence(cutoff)
            .strip_trailing_artifacts();
        results.insert(fields[0].to_string(), taxonomy);
        Ok(())
    })?;

    Ok(results)
}

/// Parses RDP classifier `fixrank` output. After the query identifier and an
/// empty column, each of six ranks is reported as a `name, rank, confidence`
/// triplet.
pub fn rdp<P>(src: P, cutoff: f64) -> anyhow::Result<ClassifierResultMap>
where
    P: AsRef<Path>,
{
    let mut results = ClassifierResultMap::new();
    let min_columns = 2 + 3 * FIXED_RANKS.len();

    for_each_row(src, min_columns, |fields| {
        let mut ranks = Vec::with_capacity(FIXED_RANKS.len());

        for (i, letter) in FIXED_RANKS.iter().enumerate() {
            let name = fields[2 + 3 * i];
            let score = fields[4 + 3 * i];
            let confidence = score
                .trim()
                .parse::<f64>()
                .with_context(|| format!("invalid confidence: {}", score))?;

            ranks.push(Rank {
                letter: letter.to_string(),
                name: name.trim_matches('"').to_string(),
                confidence: Some(confidence),
            });
        }

        let taxonomy = RankedTaxonomy::new(ranks)
            .truncate_at_confidence(cutoff)
            .strip_trailing_artifacts();
        results.insert(fields[0].to_string(), taxonomy);
        Ok(())
    })?;

    Ok(results)
}

/// Parses BLAST tabular output written with `-outfmt "6 qseqid sseqid pident
/// stitle"`. Only the first hit of each query is kept.
pub fn blast<P>(src: P) -> anyhow::Result<HashMap<String, BlastHit>>
where
    P: AsRef<Path>,
{
    let mut results = HashMap::new();

    for_each_row(src, 4, |fields| {
        let accession = fields[1].split('|').nth(3).unwrap_or(fields[1]);

        results
            .entry(fields[0].to_string())
            .or_insert_with(|| BlastHit {
                accession: accession.to_string(),
                title: fields[3].to_string(),
                identity: fields[2].to_string(),
            });
        Ok(())
    })?;

    Ok(results)
}

/// Parses a two-column taxonomy file computed elsewhere. Lines starting with
/// `#` are skipped; the taxonomy string is kept verbatim.
pub fn taxonomy_file<P>(src: P) -> anyhow::Result<HashMap<String, String>>
where
    P: AsRef<Path>,
{
    let mut results = HashMap::new();

    for_each_row(src, 2, |fields| {
        if !fields[0].starts_with('#') {
            results.insert(fields[0].to_string(), fields[1].to_string());
        }
        Ok(())
    })?;

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_sintax_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "run.sintax.txt",
            "OTU1\tk:Fungi(1.0000),p:Ascomycota(0.9900),c:Eurotiomycetes(0.9000),o:Eurotiales(0.6000)\t+\tk:Fungi,p:Ascomycota,c:Eurotiomycetes\n\
             OTU2\tk:Fungi(0.4000),p:Basidiomycota(0.2000)\t+\t\n\
             OTU3\t\t\t\n",
        );

        let results = classifier(&path, 0.8).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(
            results["OTU1"].to_string(),
            "k:Fungi,p:Ascomycota,c:Eurotiomycetes"
        );
        assert!(results["OTU2"].is_unclassified());
        assert_eq!(results["OTU2"].to_string(), "k:unclassified");
        assert_eq!(results["OTU3"].depth(), 0);
    }

    #[test]
    fn test_classifier_strips_trailing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "run.utax.txt",
            "OTU1\td:Fungi(1.0000),p:Ascomycota(0.9900),c:Incertae_sedis(0.9500)\tk:Fungi\t+\n",
        );

        let results = classifier(&path, 0.8).unwrap();
        assert_eq!(results["OTU1"].to_string(), "d:Fungi,p:Ascomycota");
    }

    #[test]
    fn test_classifier_rejects_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bad.txt", "OTU1\n");

        let err = classifier(&path, 0.8).unwrap_err();
        assert!(format!("{:#}", err).contains("line 1"));
    }

    #[test]
    fn test_classifier_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(classifier(dir.path().join("missing.txt"), 0.8).is_err());
    }

    #[test]
    fn test_rdp_fixrank_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "run.rdp.txt",
            "OTU1\t\tFungi\tdomain\t1.0\tAscomycota\tphylum\t0.99\tSordariomycetes\tclass\t0.95\t\
             Hypocreales\torder\t0.9\tunidentified\tfamily\t0.85\tFusarium\tgenus\t0.5\n\
             OTU2\t\tFungi\tdomain\t0.5\tAscomycota\tphylum\t0.4\tX\tclass\t0.3\t\
             Y\torder\t0.2\tZ\tfamily\t0.1\tW\tgenus\t0.1\n",
        );

        let results = rdp(&path, 0.8).unwrap();
        assert_eq!(
            results["OTU1"].to_string(),
            "k:Fungi,p:Ascomycota,c:Sordariomycetes,o:Hypocreales"
        );
        assert_eq!(results["OTU2"].to_string(), "k:unclassified");
    }

    #[test]
    fn test_blast_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "run.blast.txt",
            "OTU1\tgi|123|gb|KX123456.1|\t99.50\tFusarium oxysporum strain X\n\
             OTU1\tgi|124|gb|KX000001.1|\t99.00\tFusarium sp.\n\
             OTU2\tlocal_seq\t97.00\tAspergillus niger\n",
        );

        let results = blast(&path).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results["OTU1"].accession, "KX123456.1");
        assert_eq!(results["OTU1"].identity, "99.50");
        assert_eq!(results["OTU2"].accession, "local_seq");
    }

    #[test]
    fn test_taxonomy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "tax.txt",
            "#OTUID\ttaxonomy\nOTU1\tSINTAX;k:Fungi\nOTU2\tNo Hit\n",
        );

        let results = taxonomy_file(&path).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results["OTU1"], "SINTAX;k:Fungi");
    }
}
