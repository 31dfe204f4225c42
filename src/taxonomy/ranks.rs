//! Rank-labelled taxonomic lineages.
//!
//! A lineage is written as a comma-separated list of `<letter>:<name>` ranks,
//! for example `k:Fungi,p:Ascomycota,c:Sordariomycetes`. Classifiers that
//! report a confidence per rank append it in parentheses:
//! `k:Fungi(1.0000),p:Ascomycota(0.9800)`.

use std::fmt;
use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;

/// Name of the sentinel rank emitted when nothing passes a cutoff.
pub const UNCLASSIFIED: &str = "unclassified";

/// Rank letters used for classifiers with fixed rank positions (RDP).
pub const FIXED_RANKS: [char; 6] = ['k', 'p', 'c', 'o', 'f', 'g'];

/// Matches ranks that carry no taxonomic information.
fn artifact_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)unidentified|incertae|uncultured").expect("artifact regex to compile")
    })
}

/// One level of a lineage.
#[derive(Clone, Debug, PartialEq)]
pub struct Rank {
    /// The rank letter (`k`, `d`, `p`, `c`, `o`, `f`, `g`, `s`).
    pub letter: String,

    /// The taxon name at this rank.
    pub name: String,

    /// The classifier confidence for this rank, if reported.
    pub confidence: Option<f64>,
}

impl Rank {
    /// Creates a new [`Rank`] without a confidence.
    pub fn new<L, N>(letter: L, name: N) -> Self
    where
        L: Into<String>,
        N: Into<String>,
    {
        Rank {
            letter: letter.into(),
            name: name.into(),
            confidence: None,
        }
    }

    /// Whether this rank names an uninformative placeholder taxon.
    pub fn is_artifact(&self) -> bool {
        artifact_regex().is_match(&self.name)
    }

    /// Parses `k:Fungi` or `k:Fungi(0.9800)`. A trailing parenthesised group
    /// that is not a number stays part of the name. Text without a `:` is
    /// taken as a name with an empty letter.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        let scored = s
            .strip_suffix(')')
            .and_then(|x| x.rsplit_once('('))
            .and_then(|(label, score)| score.parse::<f64>().ok().map(|c| (label, c)));

        let (label, confidence) = match scored {
            Some((label, score)) => (label, Some(score)),
            None => (s, None),
        };

        let (letter, name) = label.split_once(':').unwrap_or(("", label));

        Rank {
            letter: letter.to_string(),
            name: name.to_string(),
            confidence,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.letter.is_empty() {
            true => f.write_str(&self.name),
            false => write!(f, "{}:{}", self.letter, self.name),
        }
    }
}

/// An ordered, prefix-closed lineage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedTaxonomy {
    ranks: Vec<Rank>,
}

impl RankedTaxonomy {
    /// Creates a lineage from its ranks, most general first.
    pub fn new(ranks: Vec<Rank>) -> Self {
        RankedTaxonomy { ranks }
    }

    /// The explicit "unclassified" sentinel at the top rank.
    pub fn unclassified<L>(letter: L) -> Self
    where
        L: Into<String>,
    {
        RankedTaxonomy {
            ranks: vec![Rank::new(letter, UNCLASSIFIED)],
        }
    }

    /// Parses a comma-separated lineage. Empty input yields an empty lineage.
    pub fn parse(s: &str) -> Self {
        let ranks = s
            .trim()
            .trim_end_matches(';')
            .split(',')
            .filter(|x| !x.trim().is_empty())
            .map(Rank::parse)
            .collect();

        RankedTaxonomy { ranks }
    }

    /// The ranks of this lineage, most general first.
    pub fn ranks(&self) -> &[Rank] {
        &self.ranks
    }

    /// Whether this is the "unclassified" sentinel.
    pub fn is_unclassified(&self) -> bool {
        self.ranks.len() == 1 && self.ranks[0].name == UNCLASSIFIED
    }

    /// The number of resolved ranks. The sentinel has depth zero.
    pub fn depth(&self) -> usize {
        match self.is_unclassified() {
            true => 0,
            false => self.ranks.len(),
        }
    }

    /// Whether no rank is resolved.
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// The confidence of the deepest rank, if reported.
    pub fn confidence(&self) -> Option<f64> {
        self.ranks.last().and_then(|r| r.confidence)
    }

    /// Keeps the ranks up to and including the deepest one whose confidence
    /// strictly exceeds `cutoff`. When no rank passes, the lineage becomes the
    /// "unclassified" sentinel labelled with the top rank's letter.
    pub fn truncate_at_confidence(self, cutoff: f64) -> Self {
        let deepest = self
            .ranks
            .iter()
            .rposition(|r| r.confidence.map(|c| c > cutoff).unwrap_or(false));

        match deepest {
            Some(i) => {
                let mut ranks = self.ranks;
                ranks.truncate(i + 1);
                RankedTaxonomy { ranks }
            }
            None => {
                let letter = self
                    .ranks
                    .first()
                    .map(|r| r.letter.clone())
                    .unwrap_or_else(|| String::from("k"));
                RankedTaxonomy::unclassified(letter)
            }
        }
    }

    /// Removes uninformative ranks from the tail of the lineage. Only trailing
    /// ranks are removed, and the top rank is always kept.
    pub fn strip_trailing_artifacts(mut self) -> Self {
        while self.ranks.len() > 1 && self.ranks.last().map(Rank::is_artifact).unwrap_or(false) {
            self.ranks.pop();
        }

        self
    }
}

impl fmt::Display for RankedTaxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ranks.iter().join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lineage(s: &str) -> RankedTaxonomy {
        RankedTaxonomy::parse(s)
    }

    #[test]
    fn test_parse_rank_with_confidence() {
        let rank = Rank::parse("p:Ascomycota(0.9800)");
        assert_eq!(rank.letter, "p");
        assert_eq!(rank.name, "Ascomycota");
        assert_eq!(rank.confidence, Some(0.98));
        assert_eq!(rank.to_string(), "p:Ascomycota");
    }

    #[test]
    fn test_parse_rank_with_parentheses_in_name() {
        let rank = Rank::parse("s:Foo_(bar)_baz(0.5000)");
        assert_eq!(rank.name, "Foo_(bar)_baz");
        assert_eq!(rank.confidence, Some(0.5));

        let rank = Rank::parse("s:Foo_(bar)");
        assert_eq!(rank.name, "Foo_(bar)");
        assert_eq!(rank.confidence, None);
    }

    #[test]
    fn test_parse_lineage() {
        let tax = lineage("k:Fungi,p:Ascomycota,c:Sordariomycetes;");
        assert_eq!(tax.depth(), 3);
        assert_eq!(tax.to_string(), "k:Fungi,p:Ascomycota,c:Sordariomycetes");
        assert!(lineage("").is_empty());
    }

    #[test]
    fn test_truncate_at_confidence() {
        let tax = lineage("k:Fungi(1.0),p:Ascomycota(0.95),c:Sordariomycetes(0.7),o:Hypocreales(0.85)");
        let tax = tax.truncate_at_confidence(0.8);
        assert_eq!(tax.to_string(), "k:Fungi,p:Ascomycota,c:Sordariomycetes,o:Hypocreales");

        let tax = lineage("k:Fungi(1.0),p:Ascomycota(0.95),c:Sordariomycetes(0.7)");
        assert_eq!(
            tax.truncate_at_confidence(0.8).to_string(),
            "k:Fungi,p:Ascomycota"
        );
    }

    #[test]
    fn test_truncate_requires_strictly_greater() {
        let tax = lineage("k:Fungi(0.8),p:Ascomycota(0.8)");
        let tax = tax.truncate_at_confidence(0.8);
        assert!(tax.is_unclassified());
        assert_eq!(tax.depth(), 0);
        assert_eq!(tax.to_string(), "k:unclassified");
    }

    #[test]
    fn test_unclassified_keeps_top_letter() {
        let tax = lineage("d:Bacteria(0.1)").truncate_at_confidence(0.8);
        assert_eq!(tax.to_string(), "d:unclassified");
    }

    #[test]
    fn test_strip_trailing_artifacts() {
        let tax = lineage("k:Fungi,p:Ascomycota,c:Incertae_sedis,o:unidentified");
        assert_eq!(
            tax.strip_trailing_artifacts().to_string(),
            "k:Fungi,p:Ascomycota"
        );
    }

    #[test]
    fn test_strip_keeps_inner_artifacts() {
        let tax = lineage("k:Fungi,p:Ascomycota,c:incertae_sedis,o:Hypocreales");
        assert_eq!(tax.clone().strip_trailing_artifacts(), tax);
    }

    #[test]
    fn test_strip_keeps_top_rank() {
        let tax = lineage("k:uncultured,p:UNIDENTIFIED");
        assert_eq!(tax.strip_trailing_artifacts().to_string(), "k:uncultured");
    }

    #[test]
    fn test_resolved_ranks_are_non_empty_and_tail_informative() {
        let raw = "k:Fungi(1.0),p:Basidiomycota(0.99),c:Agaricomycetes(0.95),\
                   o:Agaricales(0.9),f:Agaricales_fam_Incertae_sedis(0.9),g:unidentified(0.85)";
        let tax = lineage(raw)
            .truncate_at_confidence(0.8)
            .strip_trailing_artifacts();

        assert_eq!(tax.depth(), 4);
        assert!(tax.ranks().iter().all(|r| !r.name.is_empty()));
        assert!(!tax.ranks().last().unwrap().is_artifact());
    }
}
