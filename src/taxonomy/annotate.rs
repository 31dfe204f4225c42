//! Appending consensus taxonomy to OTU tables and OTU FASTA files.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::bail;
use anyhow::Context;
use tracing::debug;

use super::reconcile::ConsensusTaxonomy;
use crate::utils::formats::delimited;
use crate::utils::formats::fasta;

/// Name of the column appended to OTU tables.
pub const TAXONOMY_COLUMN: &str = "Taxonomy";

/// Leading tokens that mark the header row of an OTU table.
const HEADER_PREFIXES: [&str; 2] = ["#OTU", "OTUId"];

/// Counts reported after annotating an OTU table.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AnnotationSummary {
    /// Data rows written to the annotated table.
    pub kept: usize,

    /// Data rows dropped by the taxonomy filter.
    pub dropped: usize,
}

/// Appends a `Taxonomy` column to the OTU table at `src`, writing the result to
/// `dst` tab-delimited. The source delimiter is sniffed from its header; the
/// fields themselves are written back unchanged and unquoted.
///
/// With a `filter`, rows whose taxonomy does not contain it are dropped and,
/// if `filtered_dst` is given, the kept rows are also written there without
/// the taxonomy column, tab-delimited.
pub fn annotate_table<P, Q>(
    src: P,
    dst: Q,
    taxonomy: &ConsensusTaxonomy,
    filter: Option<&str>,
    filtered_dst: Option<&Path>,
) -> anyhow::Result<AnnotationSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let src = src.as_ref();
    let dst = dst.as_ref();

    let (delimiter, mut reader) = delimited::open(src)?;
    debug!(
        "Reading OTU table {} ({:?}-delimited)",
        src.display(),
        char::from(delimiter)
    );
    let mut rows = reader.records();

    let header = match rows.next() {
        Some(result) => result.with_context(|| format!("parsing {}", src.display()))?,
        None => bail!("OTU table is empty: {}", src.display()),
    };
    check_header(&header, src)?;

    let out = File::create(dst).with_context(|| format!("creating {}", dst.display()))?;
    let mut writer = delimited::writer(BufWriter::new(out), b'\t');

    let mut filtered_writer = match (filter, filtered_dst) {
        (Some(_), Some(path)) => {
            let out = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            Some(delimited::writer(BufWriter::new(out), b'\t'))
        }
        _ => None,
    };

    let mut annotated_header = header.clone();
    annotated_header.push_field(TAXONOMY_COLUMN);
    writer.write_record(&annotated_header)?;
    if let Some(w) = filtered_writer.as_mut() {
        w.write_record(&header)?;
    }

    let mut summary = AnnotationSummary::default();

    for result in rows {
        let row = result.with_context(|| format!("parsing {}", src.display()))?;
        let id = row.get(0).unwrap_or_default();
        let label = taxonomy.label(id);

        if let Some(f) = filter {
            if !label.contains(f) {
                summary.dropped += 1;
                continue;
            }
        }

        let mut annotated = row.clone();
        annotated.push_field(&label);
        writer.write_record(&annotated)?;

        if let Some(w) = filtered_writer.as_mut() {
            w.write_record(&row)?;
        }

        summary.kept += 1;
    }

    writer.flush()?;
    if let Some(mut w) = filtered_writer {
        w.flush()?;
    }

    Ok(summary)
}

/// Rejects tables without an OTU header row and tables that already carry a
/// taxonomy column.
fn check_header(header: &csv::StringRecord, src: &Path) -> anyhow::Result<()> {
    let first = header.get(0).unwrap_or_default();

    if !HEADER_PREFIXES.iter().any(|p| first.starts_with(p)) {
        bail!(
            "{} does not look like an OTU table: the header must start with \
            one of {:?}, found {:?}",
            src.display(),
            HEADER_PREFIXES,
            first
        );
    }

    let last = header.iter().last().unwrap_or_default();
    if header.len() > 1 && last.eq_ignore_ascii_case(TAXONOMY_COLUMN) {
        bail!(
            "{} already has a {} column; refusing to annotate it twice",
            src.display(),
            TAXONOMY_COLUMN
        );
    }

    Ok(())
}

/// Writes every record of the FASTA file at `src` to `dst` with its taxonomy
/// as the description.
pub fn annotate_fasta<P, Q>(src: P, dst: Q, taxonomy: &ConsensusTaxonomy) -> anyhow::Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let src = src.as_ref();
    let mut reader = fasta::open(src)?;
    let mut writer = fasta::writer(dst)?;
    let mut n = 0;

    for result in reader.records() {
        let record = result.with_context(|| format!("reading {}", src.display()))?;
        let label = taxonomy.label(record.name());
        writer.write_record(&fasta::with_description(&record, &label))?;
        n += 1;
    }

    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use crate::taxonomy::ranks::RankedTaxonomy;
    use crate::taxonomy::reconcile::Classifier;
    use crate::taxonomy::reconcile::TaxonomyCall;

    fn consensus() -> ConsensusTaxonomy {
        let mut c = ConsensusTaxonomy::new();
        c.insert(
            "OTU1",
            TaxonomyCall::Classified {
                method: Classifier::Sintax,
                taxonomy: RankedTaxonomy::parse("k:Fungi,p:Ascomycota"),
            },
        );
        c.insert(
            "OTU2",
            TaxonomyCall::Classified {
                method: Classifier::Utax,
                taxonomy: RankedTaxonomy::parse("k:Bacteria"),
            },
        );
        c
    }

    const TABLE: &str = "#OTU ID\tS1\tS2\nOTU1\t10\t0\nOTU2\t3\t4\nOTU3\t0\t1\n";

    #[test]
    fn test_annotate_table() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("otu_table.txt");
        let dst = dir.path().join("annotated.txt");
        fs::write(&src, TABLE).unwrap();

        let summary = annotate_table(&src, &dst, &consensus(), None, None).unwrap();
        assert_eq!(summary, AnnotationSummary { kept: 3, dropped: 0 });

        let out = fs::read_to_string(&dst).unwrap();
        assert_eq!(
            out,
            "#OTU ID\tS1\tS2\tTaxonomy\n\
             OTU1\t10\t0\tSINTAX;k:Fungi,p:Ascomycota\n\
             OTU2\t3\t4\tUTAX;k:Bacteria\n\
             OTU3\t0\t1\tNo Hit\n"
        );
    }

    #[test]
    fn test_stripping_the_taxonomy_column_restores_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("otu_table.txt");
        let dst = dir.path().join("annotated.txt");
        fs::write(&src, TABLE).unwrap();

        annotate_table(&src, &dst, &consensus(), None, None).unwrap();

        let stripped: Vec<String> = fs::read_to_string(&dst)
            .unwrap()
            .lines()
            .map(|l| l.rsplit_once('\t').unwrap().0.to_string())
            .collect();
        assert_eq!(stripped, TABLE.lines().collect::<Vec<_>>());
    }

    #[test]
    fn test_comma_table_labels_are_not_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("otu_table.csv");
        let dst = dir.path().join("annotated.txt");
        let table = "OTUId,S1,S2\nOTU1,10,0\nOTU2,3,4\n";
        fs::write(&src, table).unwrap();

        annotate_table(&src, &dst, &consensus(), None, None).unwrap();

        let out = fs::read_to_string(&dst).unwrap();
        assert_eq!(
            out,
            "OTUId\tS1\tS2\tTaxonomy\n\
             OTU1\t10\t0\tSINTAX;k:Fungi,p:Ascomycota\n\
             OTU2\t3\t4\tUTAX;k:Bacteria\n"
        );
        assert!(!out.contains('"'));

        let restored: String = out
            .lines()
            .map(|l| {
                let fields: Vec<&str> = l.split('\t').collect();
                format!("{}\n", fields[..fields.len() - 1].join(","))
            })
            .collect();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_reannotation_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("otu_table.txt");
        let once = dir.path().join("once.txt");
        let twice = dir.path().join("twice.txt");
        fs::write(&src, TABLE).unwrap();

        annotate_table(&src, &once, &consensus(), None, None).unwrap();
        let err = annotate_table(&once, &twice, &consensus(), None, None).unwrap_err();
        assert!(err.to_string().contains("already has a Taxonomy column"));
    }

    #[test]
    fn test_table_without_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("otu_table.txt");
        fs::write(&src, "OTU1\t10\t0\n").unwrap();

        let err = annotate_table(&src, dir.path().join("x"), &consensus(), None, None);
        assert!(err.is_err());
    }

    #[test]
    fn test_filter_writes_filtered_variant() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("otu_table.txt");
        let dst = dir.path().join("annotated.txt");
        let tmp = dir.path().join("otu_table.tmp");
        fs::write(&src, TABLE).unwrap();

        let summary =
            annotate_table(&src, &dst, &consensus(), Some("Fungi"), Some(&tmp)).unwrap();
        assert_eq!(summary, AnnotationSummary { kept: 1, dropped: 2 });

        assert_eq!(
            fs::read_to_string(&dst).unwrap(),
            "#OTU ID\tS1\tS2\tTaxonomy\nOTU1\t10\t0\tSINTAX;k:Fungi,p:Ascomycota\n"
        );
        assert_eq!(
            fs::read_to_string(&tmp).unwrap(),
            "#OTU ID\tS1\tS2\nOTU1\t10\t0\n"
        );
    }

    #[test]
    fn test_annotate_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("otus.fa");
        let dst = dir.path().join("otus.taxonomy.fa");
        fs::write(&src, ">OTU1\nACGT\n>OTU3\nGGCC\n").unwrap();

        assert_eq!(annotate_fasta(&src, &dst, &consensus()).unwrap(), 2);

        let records = fasta::read_all(&dst).unwrap();
        assert_eq!(records[0].description(), Some("SINTAX;k:Fungi,p:Ascomycota"));
        assert_eq!(records[1].description(), Some("No Hit"));
    }
}
