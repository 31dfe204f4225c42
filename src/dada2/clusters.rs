//! Tracking which inferred sequences were clustered into which OTU.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::utils::formats::uc;
use crate::utils::sort::natural_cmp;

/// Biological OTU to the inferred sequences that clustered into it, in the
/// order they were mapped.
pub type Provenance = IndexMap<String, Vec<String>>;

/// Builds the provenance map from the UC file of iSeqs mapped onto OTUs.
/// Only hit records contribute.
pub fn provenance<P>(src: P) -> anyhow::Result<Provenance>
where
    P: AsRef<Path>,
{
    let mut map = Provenance::new();

    for result in uc::records(src)? {
        let record = result?;
        if !record.is_hit() {
            continue;
        }

        map.entry(record.target).or_default().push(record.query);
    }

    Ok(map)
}

/// Writes `OTU\tiSeqs` rows in natural order of OTU, members joined by `, `.
pub fn write_provenance<P>(map: &Provenance, dst: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let dst = dst.as_ref();
    let file = File::create(dst).with_context(|| format!("creating {}", dst.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "OTU\tiSeqs")?;
    for (otu, iseqs) in map.iter().sorted_by(|a, b| natural_cmp(a.0, b.0)) {
        writeln!(writer, "{}\t{}", otu, iseqs.iter().join(", "))?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn test_provenance() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("dada2.iseq_map.uc");
        let dst = dir.path().join("dada2.iSeqs2clusters.txt");
        fs::write(
            &src,
            "H\t0\t250\t100.0\t+\t0\t0\t250M\tiSeq_1\tOTU1\n\
             H\t1\t250\t98.4\t+\t0\t0\t250M\tiSeq_3\tOTU10\n\
             H\t0\t250\t97.6\t+\t0\t0\t250M\tiSeq_2\tOTU1\n\
             N\t*\t250\t*\t*\t*\t*\t*\tiSeq_4\t*\n\
             H\t2\t250\t100.0\t+\t0\t0\t250M\tiSeq_5\tOTU2\n",
        )
        .unwrap();

        let map = provenance(&src).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map["OTU1"], vec!["iSeq_1", "iSeq_2"]);

        write_provenance(&map, &dst).unwrap();
        assert_eq!(
            fs::read_to_string(&dst).unwrap(),
            "OTU\tiSeqs\n\
             OTU1\tiSeq_1, iSeq_2\n\
             OTU2\tiSeq_5\n\
             OTU10\tiSeq_3\n"
        );
    }
}
