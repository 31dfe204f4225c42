//! Reconciliation of classifier calls into one consensus taxonomy per
//! sequence ("hybrid" mode).
//!
//! Reconciliation is done in two stages:
//!
//! 1. [`best_classifier`] picks, per sequence, the deeper of the UTAX and
//!    SINTAX calls. Equal depths go to [`PREFERRED_CLASSIFIER`].
//! 2. [`best_taxonomy`] weighs that call against the global alignment hit.
//!    A near-identical database hit wins when its lineage is at least as deep
//!    as the classifier's.
//!
//! Both stages are pure functions of the values stored for each key, so the
//! result does not depend on the iteration order of the input maps.

use std::collections::HashMap;
use std::fmt;

use super::global::GlobalAlignmentHit;
use super::parse::BlastHit;
use super::parse::ClassifierResultMap;
use super::ranks::RankedTaxonomy;
use crate::utils::sort::natural_cmp;

/// Label written for sequences without any taxonomy.
pub const NO_HIT: &str = "No Hit";

/// Default identity a global alignment hit must exceed to override a
/// classifier call.
pub const DEFAULT_HYBRID_IDENTITY: f64 = 0.97;

/// The classifier that wins a tie at equal resolved depth.
pub const PREFERRED_CLASSIFIER: Classifier = Classifier::Utax;

/// Classifiers whose calls carry a method tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classifier {
    /// USEARCH UTAX.
    Utax,

    /// USEARCH SINTAX.
    Sintax,

    /// The RDP naive Bayesian classifier.
    Rdp,
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classifier::Utax => write!(f, "UTAX"),
            Classifier::Sintax => write!(f, "SINTAX"),
            Classifier::Rdp => write!(f, "RDP"),
        }
    }
}

/// The stage 1 winner for one sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierCall {
    /// The classifier that made the call, or `None` if neither had an entry.
    pub method: Option<Classifier>,

    /// The lineage that was called.
    pub taxonomy: RankedTaxonomy,
}

impl ClassifierCall {
    fn unclassified() -> Self {
        ClassifierCall {
            method: None,
            taxonomy: RankedTaxonomy::unclassified("k"),
        }
    }

    /// The number of resolved ranks of the call.
    pub fn depth(&self) -> usize {
        self.taxonomy.depth()
    }
}

/// One final taxonomy call, tagged with its provenance.
#[derive(Clone, Debug, PartialEq)]
pub enum TaxonomyCall {
    /// Taken from a global alignment hit: `GS|<identity>|<target>;<lineage>`.
    GlobalAlignment {
        /// The database sequence identifier.
        target: String,

        /// Fractional identity.
        identity: f64,

        /// The database lineage.
        taxonomy: RankedTaxonomy,
    },

    /// Taken from a classifier: `<METHOD>;<lineage>`.
    Classified {
        /// The classifier that made the call.
        method: Classifier,

        /// The called lineage.
        taxonomy: RankedTaxonomy,
    },

    /// Taken from a BLAST hit: `<accession>;<title> (<identity>)`.
    Blast(BlastHit),

    /// Supplied verbatim by the user.
    External(String),

    /// Nothing was found.
    NoHit,
}

impl TaxonomyCall {
    /// Builds a call from a global alignment hit.
    pub fn from_global(hit: &GlobalAlignmentHit) -> Self {
        match hit {
            GlobalAlignmentHit::Hit {
                target,
                identity,
                taxonomy,
            } => TaxonomyCall::GlobalAlignment {
                target: target.clone(),
                identity: *identity,
                taxonomy: taxonomy.clone(),
            },
            GlobalAlignmentHit::NoHit => TaxonomyCall::NoHit,
        }
    }
}

impl fmt::Display for TaxonomyCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonomyCall::GlobalAlignment {
                target,
                identity,
                taxonomy,
            } => write!(f, "GS|{:.1}|{};{}", identity * 100.0, target, taxonomy),
            TaxonomyCall::Classified { method, taxonomy } => write!(f, "{};{}", method, taxonomy),
            TaxonomyCall::Blast(hit) => {
                write!(f, "{};{} ({})", hit.accession, hit.title, hit.identity)
            }
            TaxonomyCall::External(s) => f.write_str(s),
            TaxonomyCall::NoHit => f.write_str(NO_HIT),
        }
    }
}

/// The final taxonomy call of every sequence in a run.
#[derive(Debug, Default)]
pub struct ConsensusTaxonomy {
    calls: HashMap<String, TaxonomyCall>,
}

impl ConsensusTaxonomy {
    /// Creates an empty [`ConsensusTaxonomy`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the call for `id`, replacing any previous one.
    pub fn insert<S>(&mut self, id: S, call: TaxonomyCall)
    where
        S: Into<String>,
    {
        self.calls.insert(id.into(), call);
    }

    /// Gets the call for `id`, if one was made.
    pub fn get(&self, id: &str) -> Option<&TaxonomyCall> {
        self.calls.get(id)
    }

    /// The rendered call for `id`, or [`NO_HIT`] if there is none.
    pub fn label(&self, id: &str) -> String {
        self.calls
            .get(id)
            .map(|c| c.to_string())
            .unwrap_or_else(|| String::from(NO_HIT))
    }

    /// The number of sequences with a call.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Whether no sequence has a call.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// All calls in natural order of sequence identifier.
    pub fn sorted(&self) -> Vec<(&str, &TaxonomyCall)> {
        let mut entries: Vec<(&str, &TaxonomyCall)> =
            self.calls.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by(|a, b| natural_cmp(a.0, b.0));
        entries
    }
}

impl FromIterator<(String, TaxonomyCall)> for ConsensusTaxonomy {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (String, TaxonomyCall)>,
    {
        ConsensusTaxonomy {
            calls: iter.into_iter().collect(),
        }
    }
}

/// Picks the more resolved of the UTAX and SINTAX calls for one sequence.
pub fn pick_classifier(
    utax: Option<&RankedTaxonomy>,
    sintax: Option<&RankedTaxonomy>,
) -> ClassifierCall {
    let call = |method, taxonomy: &RankedTaxonomy| ClassifierCall {
        method: Some(method),
        taxonomy: taxonomy.clone(),
    };

    match (utax, sintax) {
        (None, None) => ClassifierCall::unclassified(),
        (Some(u), None) => call(Classifier::Utax, u),
        (None, Some(s)) => call(Classifier::Sintax, s),
        (Some(u), Some(s)) => {
            if u.depth() > s.depth() {
                call(Classifier::Utax, u)
            } else if s.depth() > u.depth() {
                call(Classifier::Sintax, s)
            } else {
                match PREFERRED_CLASSIFIER {
                    Classifier::Sintax => call(Classifier::Sintax, s),
                    _ => call(Classifier::Utax, u),
                }
            }
        }
    }
}

/// Stage 1: picks the better classifier call for every sequence in `ids` and
/// every sequence either classifier reported on.
pub fn best_classifier<'a, I>(
    utax: &'a ClassifierResultMap,
    sintax: &'a ClassifierResultMap,
    ids: I,
) -> HashMap<String, ClassifierCall>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut results = HashMap::new();

    let keys = ids
        .into_iter()
        .chain(utax.keys().map(String::as_str))
        .chain(sintax.keys().map(String::as_str));

    for id in keys {
        if results.contains_key(id) {
            continue;
        }

        results.insert(id.to_string(), pick_classifier(utax.get(id), sintax.get(id)));
    }

    results
}

/// Picks the final call for one sequence from its global alignment hit and
/// its stage 1 classifier call.
pub fn pick_taxonomy(
    hit: Option<&GlobalAlignmentHit>,
    call: Option<&ClassifierCall>,
    identity_threshold: f64,
) -> TaxonomyCall {
    let class_depth = call.map(ClassifierCall::depth).unwrap_or(0);

    if let Some(h) = hit {
        if let GlobalAlignmentHit::Hit {
            identity, taxonomy, ..
        } = h
        {
            if *identity > identity_threshold && taxonomy.depth() >= class_depth {
                return TaxonomyCall::from_global(h);
            }
        }
    }

    match call {
        Some(ClassifierCall {
            method: Some(method),
            taxonomy,
        }) if !taxonomy.is_empty() => TaxonomyCall::Classified {
            method: *method,
            taxonomy: taxonomy.clone(),
        },
        _ => match hit {
            Some(h) => TaxonomyCall::from_global(h),
            None => TaxonomyCall::NoHit,
        },
    }
}

/// Stage 2: combines the global alignment hits with the stage 1 calls for
/// every sequence in `ids` and every sequence either input reported on.
pub fn best_taxonomy<'a, I>(
    global: &'a HashMap<String, GlobalAlignmentHit>,
    classified: &'a HashMap<String, ClassifierCall>,
    ids: I,
    identity_threshold: f64,
) -> ConsensusTaxonomy
where
    I: IntoIterator<Item = &'a str>,
{
    let mut results = ConsensusTaxonomy::new();

    let keys = ids
        .into_iter()
        .chain(global.keys().map(String::as_str))
        .chain(classified.keys().map(String::as_str));

    for id in keys {
        if results.get(id).is_some() {
            continue;
        }

        let call = pick_taxonomy(global.get(id), classified.get(id), identity_threshold);
        results.insert(id, call);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lineage(s: &str) -> RankedTaxonomy {
        RankedTaxonomy::parse(s)
    }

    fn map(entries: &[(&str, &str)]) -> ClassifierResultMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), lineage(v)))
            .collect()
    }

    #[test]
    fn test_deeper_classifier_wins_in_either_order() {
        let deep = map(&[("OTU1", "k:Fungi,p:Ascomycota,c:Eurotiomycetes")]);
        let shallow = map(&[("OTU1", "k:Fungi,p:Ascomycota")]);

        let a = best_classifier(&deep, &shallow, ["OTU1"]);
        let b = best_classifier(&shallow, &deep, ["OTU1"]);

        assert_eq!(a["OTU1"].taxonomy, lineage("k:Fungi,p:Ascomycota,c:Eurotiomycetes"));
        assert_eq!(b["OTU1"].taxonomy, lineage("k:Fungi,p:Ascomycota,c:Eurotiomycetes"));
        assert_eq!(a["OTU1"].method, Some(Classifier::Utax));
        assert_eq!(b["OTU1"].method, Some(Classifier::Sintax));
    }

    #[test]
    fn test_equal_depth_prefers_utax() {
        let utax = map(&[("OTU1", "k:Fungi,p:Ascomycota")]);
        let sintax = map(&[("OTU1", "k:Fungi,p:Basidiomycota")]);

        let result = best_classifier(&utax, &sintax, []);
        assert_eq!(result["OTU1"].method, Some(Classifier::Utax));
        assert_eq!(result["OTU1"].taxonomy, lineage("k:Fungi,p:Ascomycota"));
    }

    #[test]
    fn test_absent_from_both_is_unclassified() {
        let empty = ClassifierResultMap::new();
        let result = best_classifier(&empty, &empty, ["OTU9"]);
        assert_eq!(result["OTU9"].method, None);
        assert_eq!(result["OTU9"].depth(), 0);
        assert!(result["OTU9"].taxonomy.is_unclassified());
    }

    #[test]
    fn test_single_classifier_entry_wins_even_if_unclassified() {
        let utax = ClassifierResultMap::new();
        let sintax = map(&[("OTU1", "k:unclassified")]);
        let result = best_classifier(&utax, &sintax, []);
        assert_eq!(result["OTU1"].method, Some(Classifier::Sintax));
        assert_eq!(result["OTU1"].depth(), 0);
    }

    #[test]
    fn test_near_identical_deeper_hit_wins() {
        let hit = GlobalAlignmentHit::from_label(
            "UDB1;tax=k:Fungi,p:Ascomycota,c:Eurotiomycetes,o:Eurotiales,f:Aspergillaceae",
            99.0,
        );
        let call = ClassifierCall {
            method: Some(Classifier::Sintax),
            taxonomy: lineage("k:Fungi,p:Ascomycota,c:Eurotiomycetes"),
        };

        let result = pick_taxonomy(Some(&hit), Some(&call), DEFAULT_HYBRID_IDENTITY);
        assert_eq!(
            result.to_string(),
            "GS|99.0|UDB1;k:Fungi,p:Ascomycota,c:Eurotiomycetes,o:Eurotiales,f:Aspergillaceae"
        );
    }

    #[test]
    fn test_deeper_classifier_beats_identical_hit() {
        let hit = GlobalAlignmentHit::from_label("UDB1;tax=k:Fungi,p:Ascomycota", 100.0);
        let call = ClassifierCall {
            method: Some(Classifier::Utax),
            taxonomy: lineage("k:Fungi,p:Ascomycota,c:Eurotiomycetes"),
        };

        let result = pick_taxonomy(Some(&hit), Some(&call), DEFAULT_HYBRID_IDENTITY);
        assert_eq!(result.to_string(), "UTAX;k:Fungi,p:Ascomycota,c:Eurotiomycetes");
    }

    #[test]
    fn test_low_identity_hit_loses_to_classifier() {
        let hit = GlobalAlignmentHit::from_label("UDB1;tax=k:Fungi,p:Ascomycota,c:X,o:Y", 90.0);
        let call = ClassifierCall {
            method: Some(Classifier::Sintax),
            taxonomy: lineage("k:Fungi"),
        };

        let result = pick_taxonomy(Some(&hit), Some(&call), DEFAULT_HYBRID_IDENTITY);
        assert_eq!(result.to_string(), "SINTAX;k:Fungi");
    }

    #[test]
    fn test_low_identity_hit_used_without_classifier_call() {
        let hit = GlobalAlignmentHit::from_label("UDB1;tax=k:Fungi,p:Ascomycota", 90.0);
        let call = ClassifierCall::unclassified();

        let result = pick_taxonomy(Some(&hit), Some(&call), DEFAULT_HYBRID_IDENTITY);
        assert_eq!(result.to_string(), "GS|90.0|UDB1;k:Fungi,p:Ascomycota");
    }

    #[test]
    fn test_nothing_is_no_hit() {
        let call = ClassifierCall::unclassified();
        assert_eq!(
            pick_taxonomy(Some(&GlobalAlignmentHit::NoHit), Some(&call), 0.97),
            TaxonomyCall::NoHit
        );
        assert_eq!(pick_taxonomy(None, None, 0.97).to_string(), "No Hit");
    }

    #[test]
    fn test_three_sequence_scenario() {
        let mut global = HashMap::new();
        global.insert(
            String::from("seq1"),
            GlobalAlignmentHit::from_label(
                "DB7;tax=k:Fungi,p:Ascomycota,c:Sordariomycetes,o:Hypocreales,f:Nectriaceae,g:Fusarium",
                98.0,
            ),
        );
        global.insert(String::from("seq2"), GlobalAlignmentHit::NoHit);

        let utax = ClassifierResultMap::new();
        let sintax = map(&[(
            "seq2",
            "k:Fungi,p:Basidiomycota,c:Agaricomycetes,o:Agaricales",
        )]);

        let ids = ["seq1", "seq2", "seq3"];
        let classified = best_classifier(&utax, &sintax, ids);
        let consensus = best_taxonomy(&global, &classified, ids, DEFAULT_HYBRID_IDENTITY);

        let rows: Vec<(String, String)> = consensus
            .sorted()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0].1,
            "GS|98.0|DB7;k:Fungi,p:Ascomycota,c:Sordariomycetes,o:Hypocreales,f:Nectriaceae,g:Fusarium"
        );
        assert_eq!(rows[1].1, "SINTAX;k:Fungi,p:Basidiomycota,c:Agaricomycetes,o:Agaricales");
        assert_eq!(rows[2], (String::from("seq3"), String::from("No Hit")));
    }

    #[test]
    fn test_reconciliation_ignores_insertion_order() {
        let forward = map(&[("OTU1", "k:A,p:B"), ("OTU2", "k:A"), ("OTU10", "k:A,p:B,c:C")]);
        let reverse = map(&[("OTU10", "k:A,p:B,c:C"), ("OTU2", "k:A"), ("OTU1", "k:A,p:B")]);
        let other = map(&[("OTU2", "k:A,p:Z")]);

        let a = best_classifier(&forward, &other, []);
        let b = best_classifier(&reverse, &other, []);
        assert_eq!(a, b);

        let global = HashMap::new();
        let ca = best_taxonomy(&global, &a, [], 0.97);
        let cb = best_taxonomy(&global, &b, [], 0.97);
        let la: Vec<String> = ca.sorted().iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        let lb: Vec<String> = cb.sorted().iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        assert_eq!(la, lb);
        assert_eq!(
            la,
            vec!["OTU1=UTAX;k:A,p:B", "OTU2=SINTAX;k:A,p:Z", "OTU10=UTAX;k:A,p:B,c:C"]
        );
    }

    #[test]
    fn test_blast_and_external_rendering() {
        let blast = TaxonomyCall::Blast(BlastHit {
            accession: String::from("KX1.1"),
            title: String::from("Fusarium sp."),
            identity: String::from("99.50"),
        });
        assert_eq!(blast.to_string(), "KX1.1;Fusarium sp. (99.50)");
        assert_eq!(TaxonomyCall::External(String::from("x;y")).to_string(), "x;y");
    }
}
