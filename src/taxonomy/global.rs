//! Parsing of global alignment (`usearch_global`) best hits.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use super::parse::for_each_row;
use super::ranks::RankedTaxonomy;

/// The best database hit of a query sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum GlobalAlignmentHit {
    /// The query aligned to a database sequence.
    Hit {
        /// The database sequence identifier (label without its taxonomy).
        target: String,

        /// Fractional identity in `[0.0, 1.0]`.
        identity: f64,

        /// The lineage stored in the database label.
        taxonomy: RankedTaxonomy,
    },

    /// No database sequence passed the identity cutoff.
    NoHit,
}

impl GlobalAlignmentHit {
    /// Builds a hit from a raw database label such as
    /// `UDB013470;tax=k:Fungi,p:Ascomycota;` and an identity in percent.
    pub fn from_label(label: &str, percent_identity: f64) -> Self {
        let (target, taxonomy) = match label.split_once("tax=") {
            Some((target, tax)) => (target.trim_end_matches(';'), RankedTaxonomy::parse(tax)),
            None => (label, RankedTaxonomy::default()),
        };

        GlobalAlignmentHit::Hit {
            target: target.to_string(),
            identity: percent_identity / 100.0,
            taxonomy,
        }
    }

    /// The number of resolved ranks in the hit's lineage (zero for no hit).
    pub fn depth(&self) -> usize {
        match self {
            GlobalAlignmentHit::Hit { taxonomy, .. } => taxonomy.depth(),
            GlobalAlignmentHit::NoHit => 0,
        }
    }

    /// Identity rendered on the percentage scale with one decimal place.
    pub fn percent_identity(&self) -> Option<String> {
        match self {
            GlobalAlignmentHit::Hit { identity, .. } => Some(format!("{:.1}", identity * 100.0)),
            GlobalAlignmentHit::NoHit => None,
        }
    }
}

/// Parses a `-userout` file written with `-userfields query+target+id`.
///
/// When several top hits tie for a query, the one with the deepest lineage is
/// kept (the first one on equal depth). A target of `*` is a missing hit.
pub fn parse<P>(src: P) -> anyhow::Result<HashMap<String, GlobalAlignmentHit>>
where
    P: AsRef<Path>,
{
    let mut results: HashMap<String, GlobalAlignmentHit> = HashMap::new();

    for_each_row(src, 3, |fields| {
        let hit = match fields[1] {
            "*" => GlobalAlignmentHit::NoHit,
            label => {
                let identity = fields[2]
                    .parse::<f64>()
                    .with_context(|| format!("invalid identity {}", fields[2]))?;
                GlobalAlignmentHit::from_label(label, identity)
            }
        };

        match results.get(fields[0]) {
            Some(existing) if existing.depth() >= hit.depth() => {}
            _ => {
                results.insert(fields[0].to_string(), hit);
            }
        }

        Ok(())
    })?;

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn test_from_label() {
        let hit = GlobalAlignmentHit::from_label("UDB013470;tax=k:Fungi,p:Ascomycota;", 98.0);
        match &hit {
            GlobalAlignmentHit::Hit {
                target,
                identity,
                taxonomy,
            } => {
                assert_eq!(target, "UDB013470");
                assert!((identity - 0.98).abs() < 1e-9);
                assert_eq!(taxonomy.to_string(), "k:Fungi,p:Ascomycota");
            }
            GlobalAlignmentHit::NoHit => panic!("expected a hit"),
        }
        assert_eq!(hit.percent_identity().as_deref(), Some("98.0"));
        assert_eq!(hit.depth(), 2);
    }

    #[test]
    fn test_label_without_taxonomy() {
        let hit = GlobalAlignmentHit::from_label("custom_seq_1", 100.0);
        assert_eq!(hit.depth(), 0);
        assert_eq!(hit.percent_identity().as_deref(), Some("100.0"));
    }

    #[test]
    fn test_parse_keeps_deepest_tied_hit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.usearch.txt");
        fs::write(
            &path,
            "OTU1\tA;tax=k:Fungi,p:Ascomycota;\t99.2\n\
             OTU1\tB;tax=k:Fungi,p:Ascomycota,c:Eurotiomycetes;\t99.2\n\
             OTU1\tC;tax=k:Fungi;\t99.2\n\
             OTU2\t*\t0.0\n",
        )
        .unwrap();

        let results = parse(&path).unwrap();
        assert_eq!(results.len(), 2);
        match &results["OTU1"] {
            GlobalAlignmentHit::Hit { target, .. } => assert_eq!(target, "B"),
            GlobalAlignmentHit::NoHit => panic!("expected a hit"),
        }
        assert_eq!(results["OTU2"], GlobalAlignmentHit::NoHit);
        assert_eq!(results["OTU2"].percent_identity(), None);
    }

    #[test]
    fn test_parse_rejects_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, "OTU1\tA;tax=k:Fungi;\t99.0\nOTU2\tA\n").unwrap();

        let err = parse(&path).unwrap_err().to_string();
        assert!(err.contains("line 2"), "{}", err);
    }

    #[test]
    fn test_parse_reports_bad_identity_with_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, "OTU1\tA;tax=k:Fungi;\tninety\n").unwrap();

        let err = format!("{:#}", parse(&path).unwrap_err());
        assert!(err.contains("line 1"), "{}", err);
        assert!(err.contains("invalid identity ninety"), "{}", err);
    }
}
