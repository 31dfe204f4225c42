//! Writers for the final taxonomy files.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use anyhow::Context;

use super::global::GlobalAlignmentHit;
use super::parse::ClassifierResultMap;
use super::reconcile::ConsensusTaxonomy;
use super::reconcile::NO_HIT;

/// Rank prefixes of a QIIME lineage, most general first.
const QIIME_RANKS: [&str; 7] = ["k", "p", "c", "o", "f", "g", "s"];

/// Extra columns written next to the consensus call.
pub enum Columns<'a> {
    /// `#OTUID  taxonomy`.
    Consensus,

    /// Adds the global alignment hit and its identity.
    GlobalAlignment(&'a HashMap<String, GlobalAlignmentHit>),

    /// Adds the raw USEARCH, SINTAX and UTAX lineages behind a hybrid call.
    Hybrid {
        /// Global alignment hits.
        global: &'a HashMap<String, GlobalAlignmentHit>,

        /// SINTAX calls.
        sintax: &'a ClassifierResultMap,

        /// UTAX calls.
        utax: &'a ClassifierResultMap,
    },
}

impl Columns<'_> {
    fn header(&self) -> &'static str {
        match self {
            Columns::Consensus => "#OTUID\ttaxonomy",
            Columns::GlobalAlignment(_) => "#OTUID\ttaxonomy\thit\tidentity",
            Columns::Hybrid { .. } => "#OTUID\ttaxonomy\tUSEARCH\tSINTAX\tUTAX",
        }
    }

    fn extra(&self, id: &str) -> Vec<String> {
        let lineage = |map: &ClassifierResultMap| {
            map.get(id).map(|t| t.to_string()).unwrap_or_default()
        };

        match self {
            Columns::Consensus => Vec::new(),
            Columns::GlobalAlignment(global) => match global.get(id) {
                Some(GlobalAlignmentHit::Hit {
                    target, identity, ..
                }) => vec![target.clone(), format!("{:.1}", identity * 100.0)],
                _ => vec![String::from(NO_HIT), String::new()],
            },
            Columns::Hybrid {
                global,
                sintax,
                utax,
            } => {
                let usearch = match global.get(id) {
                    Some(GlobalAlignmentHit::Hit { taxonomy, .. }) => taxonomy.to_string(),
                    _ => String::from(NO_HIT),
                };
                vec![usearch, lineage(sintax), lineage(utax)]
            }
        }
    }
}

/// Writes `<id>\t<taxonomy>[\t<extra>...]` for every call, in natural order
/// of identifier.
pub fn write_taxonomy<P>(
    dst: P,
    taxonomy: &ConsensusTaxonomy,
    columns: &Columns<'_>,
) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let path = dst.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", columns.header())?;

    for (id, call) in taxonomy.sorted() {
        write!(writer, "{}\t{}", id, call)?;
        for field in columns.extra(id) {
            write!(writer, "\t{}", field)?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Converts one taxonomy call to a QIIME lineage.
///
/// The ranks after the first `;` are rewritten from `x:Name` to `x__Name`
/// and laid out over the seven QIIME ranks, with a leading `d__` when the
/// lineage is rooted at a domain. Missing ranks are left empty.
pub fn qiime_lineage(call: &str) -> String {
    let ranks = match call.split_once(';') {
        Some((_, ranks)) => ranks,
        None => call,
    };

    let mut names: HashMap<&str, &str> = HashMap::new();
    for rank in ranks.split(',') {
        if let Some((letter, name)) = rank.trim().split_once(':') {
            names.entry(letter).or_insert(name);
        }
    }

    let mut letters = Vec::with_capacity(QIIME_RANKS.len() + 1);
    if names.contains_key("d") {
        letters.push("d");
        letters.extend(QIIME_RANKS.iter().skip(1));
    } else {
        letters.extend(QIIME_RANKS.iter());
    }

    letters
        .into_iter()
        .map(|l| format!("{}__{}", l, names.get(l).copied().unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(";")
}

/// Rewrites a two-column taxonomy file as the QIIME observation metadata
/// file consumed by `biom add-metadata`.
pub fn write_qiime<P, Q>(src: P, dst: Q) -> anyhow::Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let src = src.as_ref();
    let dst = dst.as_ref();

    let reader = BufReader::new(
        File::open(src).with_context(|| format!("opening {}", src.display()))?,
    );
    let file = File::create(dst).with_context(|| format!("creating {}", dst.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "#OTUID\ttaxonomy")?;

    let mut n = 0;
    for line in reader.lines() {
        let line = line.with_context(|| format!("reading {}", src.display()))?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split('\t');
        let id = fields.next().unwrap_or_default();
        let call = fields.next().unwrap_or_default();
        writeln!(writer, "{}\t{}", id, qiime_lineage(call))?;
        n += 1;
    }

    writer.flush()?;
    Ok(n)
}
