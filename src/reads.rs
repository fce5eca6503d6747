//!
//! Training reads and the training data file
//!
//! ## Format
//!
//! ```text
//! <reference sequence>
//! <number of reads>
//! <basecalls>              \
//! <refStart> <refEnd>       | repeated once per read
//! <queryStart> <queryEnd>   |
//! <raw> <raw> <raw> ...    /
//! ```
//!
//! Bounds are half-open. The read count is only used for progress display.
//! Any record that does not follow this structure is a parse error.
//!
use crate::common::{sequence_to_string, Interval, Sequence};
use crate::error::{Error, Result};
use crate::io::open_reader;
use itertools::Itertools;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

///
/// A single read used for training.
///
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingRead {
    /// basecalled sequence
    pub basecalls: Sequence,
    /// region of the reference this read aligned to
    pub bounds_reference: Interval,
    /// aligned region of the basecalls
    pub bounds_query: Interval,
    /// raw current samples in time order
    pub raw: Vec<f64>,
}

impl TrainingRead {
    ///
    /// Write the read as four lines of the training data format.
    ///
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "{}", sequence_to_string(&self.basecalls))?;
        writeln!(
            w,
            "{} {}",
            self.bounds_reference.start, self.bounds_reference.end
        )?;
        writeln!(w, "{} {}", self.bounds_query.start, self.bounds_query.end)?;
        writeln!(w, "{}", self.raw.iter().join(" "))
    }
}

///
/// Write the header (reference and read count) of a training data file.
///
pub fn write_header<W: Write>(w: &mut W, reference: &[u8], n_reads: usize) -> std::io::Result<()> {
    writeln!(w, "{}", sequence_to_string(reference))?;
    writeln!(w, "{}", n_reads)
}

///
/// Parse a bounds line `"<start> <end>"`.
///
/// Exactly two non-negative integers separated by whitespace with
/// `start <= end` are accepted.
///
pub fn parse_bounds(line: &str) -> Option<Interval> {
    let mut fields = line.split_whitespace();
    let start = fields.next()?.parse::<usize>().ok()?;
    let end = fields.next()?.parse::<usize>().ok()?;
    if fields.next().is_some() || start > end {
        return None;
    }
    Some(Interval::new(start, end))
}

///
/// Parse a space separated list of current samples.
///
pub fn parse_signal(line: &str) -> Option<Vec<f64>> {
    line.split_whitespace()
        .map(|s| s.parse::<f64>().ok().filter(|x| x.is_finite()))
        .collect()
}

///
/// Sequential reader of a training data file.
///
/// The header is parsed on construction; records are then pulled one by one
/// (it is also an `Iterator` of `Result<TrainingRead>`).
///
pub struct TrainingData<R> {
    reader: R,
    path: PathBuf,
    /// 1-based number of the last line read
    line: usize,
    /// reference sequence
    pub reference: Sequence,
    /// declared number of reads
    pub n_reads: usize,
}

impl TrainingData<Box<dyn BufRead + Send>> {
    ///
    /// Open a training data file (plain or `.gz`).
    ///
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_reader(path)?;
        TrainingData::from_reader(reader, path)
    }
}

impl<R: BufRead> TrainingData<R> {
    ///
    /// Wrap a reader and parse the header.
    /// `path` is only used in error messages.
    ///
    pub fn from_reader<P: Into<PathBuf>>(reader: R, path: P) -> Result<Self> {
        let mut data = TrainingData {
            reader,
            path: path.into(),
            line: 0,
            reference: Vec::new(),
            n_reads: 0,
        };
        let reference = data.expect_line("reference sequence")?;
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(data.error("reference sequence is empty"));
        }
        data.reference = reference.as_bytes().to_ascii_uppercase();
        let n_reads = data.expect_line("read count")?;
        let n_reads: usize = n_reads
            .trim()
            .parse()
            .map_err(|_| data.error(format!("invalid read count `{}`", n_reads.trim())))?;
        data.n_reads = n_reads;
        Ok(data)
    }
    fn error<S: Into<String>>(&self, message: S) -> Error {
        Error::parse(&self.path, self.line, message)
    }
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        let n = self
            .reader
            .read_line(&mut buf)
            .map_err(Error::io(&self.path))?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;
        let trimmed = buf.trim_end_matches(|c| c == '\n' || c == '\r').len();
        buf.truncate(trimmed);
        Ok(Some(buf))
    }
    fn expect_line(&mut self, what: &str) -> Result<String> {
        match self.next_line()? {
            Some(line) => Ok(line),
            None => {
                self.line += 1;
                Err(self.error(format!("unexpected end of file, expected {}", what)))
            }
        }
    }
    ///
    /// Read the next record. `Ok(None)` at the end of the file.
    /// Blank lines between records are skipped.
    ///
    pub fn next_read(&mut self) -> Result<Option<TrainingRead>> {
        let basecalls = loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line.trim().as_bytes().to_vec(),
            }
        };

        let line = self.expect_line("reference bounds")?;
        let bounds_reference = parse_bounds(&line)
            .ok_or_else(|| self.error(format!("invalid reference bounds `{}`", line)))?;

        let line = self.expect_line("query bounds")?;
        let bounds_query = parse_bounds(&line)
            .ok_or_else(|| self.error(format!("invalid query bounds `{}`", line)))?;
        if bounds_query.end > basecalls.len() {
            return Err(self.error(format!(
                "query bounds {} exceed the basecall length {}",
                bounds_query,
                basecalls.len()
            )));
        }

        let line = self.expect_line("raw signal")?;
        let raw = parse_signal(&line).ok_or_else(|| self.error("invalid raw signal"))?;

        Ok(Some(TrainingRead {
            basecalls,
            bounds_reference,
            bounds_query,
            raw,
        }))
    }
}

impl<R: BufRead> Iterator for TrainingData<R> {
    type Item = Result<TrainingRead>;
    fn next(&mut self) -> Option<Self::Item> {
        self.next_read().transpose()
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const DATA: &str = "ACGTACGTAC\n\
                        2\n\
                        ACGTA\n\
                        0 8\n\
                        0 5\n\
                        80.5 81 79.25\n\
                        CGTAC\n\
                        1 9\n\
                        1 4\n\
                        90 91\n";

    #[test]
    fn parse_training_data() {
        let mut d = TrainingData::from_reader(DATA.as_bytes(), "data.foh").unwrap();
        assert_eq!(d.reference, b"ACGTACGTAC".to_vec());
        assert_eq!(d.n_reads, 2);
        let r1 = d.next_read().unwrap().unwrap();
        assert_eq!(r1.basecalls, b"ACGTA".to_vec());
        assert_eq!(r1.bounds_reference, Interval::new(0, 8));
        assert_eq!(r1.bounds_query, Interval::new(0, 5));
        assert_eq!(r1.raw, vec![80.5, 81.0, 79.25]);
        let r2 = d.next_read().unwrap().unwrap();
        assert_eq!(r2.bounds_reference, Interval::new(1, 9));
        assert_eq!(r2.raw, vec![90.0, 91.0]);
        assert!(d.next_read().unwrap().is_none());
    }

    #[test]
    fn write_then_parse() {
        let read = TrainingRead {
            basecalls: b"ACGTAC".to_vec(),
            bounds_reference: Interval::new(3, 12),
            bounds_query: Interval::new(0, 6),
            raw: vec![85.125, 90.0, 1e-3],
        };
        let mut buf = Vec::new();
        write_header(&mut buf, b"ACGTACGTACGTACGT", 1).unwrap();
        read.write_to(&mut buf).unwrap();
        let reads: Vec<TrainingRead> = TrainingData::from_reader(&buf[..], "mem")
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(reads, vec![read]);
    }

    #[test_case("0 8", Some(Interval::new(0, 8)) ; "well formed")]
    #[test_case("12  40", Some(Interval::new(12, 40)) ; "extra whitespace")]
    #[test_case("5 5", Some(Interval::new(5, 5)) ; "empty interval")]
    #[test_case("8", None ; "missing delimiter")]
    #[test_case("0 8 9", None ; "extra field")]
    #[test_case("a 8", None ; "non integer")]
    #[test_case("-1 8", None ; "negative")]
    #[test_case("9 8", None ; "reversed")]
    #[test_case("", None ; "empty line")]
    fn bounds_line(line: &str, expected: Option<Interval>) {
        assert_eq!(parse_bounds(line), expected);
    }

    #[test]
    fn malformed_bounds_are_fatal() {
        let data = "ACGTACGTAC\n1\nACGTA\n08\n0 5\n80 81\n";
        let mut d = TrainingData::from_reader(data.as_bytes(), "bad.foh").unwrap();
        match d.next_read() {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn truncated_record_is_fatal() {
        let data = "ACGTACGTAC\n1\nACGTA\n0 8\n0 5\n";
        let mut d = TrainingData::from_reader(data.as_bytes(), "short.foh").unwrap();
        assert!(matches!(d.next_read(), Err(Error::Parse { line: 6, .. })));
    }

    #[test]
    fn query_bounds_beyond_basecalls_are_fatal() {
        let data = "ACGTACGTAC\n1\nACG\n0 8\n0 5\n80 81\n";
        let mut d = TrainingData::from_reader(data.as_bytes(), "q.foh").unwrap();
        assert!(matches!(d.next_read(), Err(Error::Parse { line: 5, .. })));
    }

    #[test]
    fn bad_sample_is_fatal() {
        let data = "ACGTACGTAC\n1\nACGTA\n0 8\n0 5\n80 x 81\n";
        let mut d = TrainingData::from_reader(data.as_bytes(), "s.foh").unwrap();
        assert!(matches!(d.next_read(), Err(Error::Parse { line: 6, .. })));
    }

    #[test]
    fn bad_header() {
        assert!(TrainingData::from_reader("".as_bytes(), "e.foh").is_err());
        assert!(TrainingData::from_reader("ACGT\nmany\n".as_bytes(), "e.foh").is_err());
    }
}
