//!
//! 5-mer baseline pore model
//!
//! Expected current level (mean, stdv) for each 5-mer, as published in the
//! ONT model files (`kmer level_mean level_stdv sd_mean sd_stdv`).
//!
use crate::common::K;
use crate::error::{Error, Result};
use crate::io::open_reader;
use derive_new::new;
use fnv::FnvHashMap as HashMap;
use std::io::{BufRead, Write};
use std::path::Path;

///
/// Expected current of a 5-mer.
///
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize, new)]
pub struct Level {
    pub mean: f64,
    pub stdv: f64,
}

///
/// Map from 5-mer to its expected `Level`.
/// Read-only after loading; shared by reference between workers.
///
#[derive(Clone, Debug, Default)]
pub struct KmerModel {
    levels: HashMap<Vec<u8>, Level>,
}

impl KmerModel {
    ///
    /// Create a model from `(kmer, level)` pairs.
    ///
    pub fn from_levels<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = (S, Level)>,
        S: AsRef<[u8]>,
    {
        KmerModel {
            levels: levels
                .into_iter()
                .map(|(kmer, level)| (kmer.as_ref().to_vec(), level))
                .collect(),
        }
    }
    ///
    /// Load an ONT style model file.
    ///
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_reader(path)?;
        Self::from_reader(reader, path)
    }
    ///
    /// Parse an ONT style model from a reader.
    /// `path` is only used in error messages.
    ///
    /// `#` lines and the `kmer ...` header are skipped; the remaining lines are
    /// `kmer<TAB>level_mean<TAB>level_stdv[<TAB>...]`.
    ///
    pub fn from_reader<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut levels = HashMap::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(Error::io(path))?;
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') || line.starts_with("kmer") {
                continue;
            }
            let mut fields = line.split('\t');
            let kmer = fields.next().unwrap_or_default();
            if kmer.len() != K {
                return Err(Error::parse(
                    path,
                    i + 1,
                    format!("k-mer `{}` is not of length {}", kmer, K),
                ));
            }
            let mut number = |name: &str| -> Result<f64> {
                fields
                    .next()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .ok_or_else(|| Error::parse(path, i + 1, format!("invalid {}", name)))
            };
            let mean = number("level_mean")?;
            let stdv = number("level_stdv")?;
            if !(stdv > 0.0) {
                return Err(Error::parse(
                    path,
                    i + 1,
                    format!("level_stdv of {} must be positive", kmer),
                ));
            }
            levels.insert(kmer.as_bytes().to_vec(), Level::new(mean, stdv));
        }
        Ok(KmerModel { levels })
    }
    ///
    /// Write the model in ONT format (sorted by 5-mer)
    ///
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "kmer\tlevel_mean\tlevel_stdv")?;
        for (kmer, level) in self.iter_sorted() {
            writeln!(
                w,
                "{}\t{}\t{}",
                String::from_utf8_lossy(kmer),
                level.mean,
                level.stdv
            )?;
        }
        Ok(())
    }
    ///
    /// `(kmer, level)` in lexicographic order of the 5-mers
    ///
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&[u8], Level)> + '_ {
        let mut entries: Vec<(&[u8], Level)> = self
            .levels
            .iter()
            .map(|(kmer, level)| (kmer.as_slice(), *level))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }
    /// the number of 5-mers in the model
    pub fn len(&self) -> usize {
        self.levels.len()
    }
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
    ///
    /// Look up a 5-mer
    ///
    pub fn get(&self, kmer: &[u8]) -> Option<Level> {
        self.levels.get(kmer).copied()
    }
    ///
    /// Look up a 5-mer that must be in the model
    ///
    pub fn level(&self, kmer: &[u8]) -> Result<Level> {
        self.get(kmer)
            .ok_or_else(|| Error::MissingKmer(String::from_utf8_lossy(kmer).into_owned()))
    }
    ///
    /// Levels of the positions anchored in `window`.
    ///
    /// A window of length `L` anchors `L - 5` positions; position `i` uses
    /// `window[i..i+5]`.
    ///
    pub fn window_levels(&self, window: &[u8]) -> Result<Vec<Level>> {
        if window.len() <= K {
            return Err(Error::WindowTooShort(window.len()));
        }
        (0..window.len() - K)
            .map(|i| self.level(&window[i..i + K]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "#model_name\ttemplate_median68pA.model\n\
                         #type\tbase\n\
                         kmer\tlevel_mean\tlevel_stdv\tsd_mean\tsd_stdv\n\
                         AAAAA\t80.5\t1.2\t0.0\t0.0\n\
                         AAAAC\t82.0\t1.5\t0.0\t0.0\n";

    #[test]
    fn parse_ont_model() {
        let m = KmerModel::from_reader(MODEL.as_bytes(), Path::new("model")).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(b"AAAAA"), Some(Level::new(80.5, 1.2)));
        assert_eq!(m.get(b"AAAAC"), Some(Level::new(82.0, 1.5)));
        assert_eq!(m.get(b"CCCCC"), None);
        assert!(matches!(m.level(b"CCCCC"), Err(Error::MissingKmer(k)) if k == "CCCCC"));
    }

    #[test]
    fn parse_rejects_bad_rows() {
        let bad_kmer = "AAAA\t80.0\t1.0\n";
        assert!(matches!(
            KmerModel::from_reader(bad_kmer.as_bytes(), Path::new("m")),
            Err(Error::Parse { line: 1, .. })
        ));
        let bad_level = "AAAAA\t80.0\n";
        assert!(matches!(
            KmerModel::from_reader(bad_level.as_bytes(), Path::new("m")),
            Err(Error::Parse { line: 1, .. })
        ));
        let zero_stdv = "AAAAA\t80.0\t0.0\n";
        assert!(KmerModel::from_reader(zero_stdv.as_bytes(), Path::new("m")).is_err());
    }

    #[test]
    fn window_levels_skip_last_kmer() {
        let m = KmerModel::from_levels(vec![
            ("AAAAA", Level::new(80.0, 1.0)),
            ("AAAAC", Level::new(90.0, 1.0)),
        ]);
        // 6 bases -> a single anchored position
        let levels = m.window_levels(b"AAAAAC").unwrap();
        assert_eq!(levels, vec![Level::new(80.0, 1.0)]);
        assert!(matches!(m.window_levels(b"AAAAA"), Err(Error::WindowTooShort(5))));
    }

    #[test]
    fn written_model_parses_back() {
        let m = KmerModel::from_levels(vec![
            ("CCCCC", Level::new(99.125, 2.5)),
            ("AAAAA", Level::new(80.0, 1.0)),
        ]);
        let mut buf = Vec::new();
        m.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("AAAAA"));
        let m2 = KmerModel::from_reader(&buf[..], Path::new("mem")).unwrap();
        assert_eq!(m2.len(), 2);
        assert_eq!(m2.get(b"CCCCC"), Some(Level::new(99.125, 2.5)));
    }
}
