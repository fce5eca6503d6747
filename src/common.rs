//!
//! Common types shared by the alignment and fitting stages
//!

/// 0-based position on the reference sequence
pub type Position = usize;

/// Type of DNA sequence
pub type Sequence = Vec<u8>;

/// Length of the k-mer that anchors a single position of the pore model
pub const K: usize = 5;

/// Convert Sequence(Vec<u8>) into &str
/// useful in displaying
pub fn sequence_to_string(seq: &[u8]) -> &str {
    std::str::from_utf8(seq).unwrap_or("<non-utf8>")
}

///
/// Array of valid DNA bases
///
pub const VALID_BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

///
/// Half-open interval `[start, end)` on a sequence.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    /// Constructor. `start <= end` is assumed.
    pub fn new(start: usize, end: usize) -> Self {
        Interval { start, end }
    }
    /// the number of positions in the interval
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// `start <= x < end`?
    pub fn contains(&self, x: usize) -> bool {
        self.start <= x && x < self.end
    }
    /// iterator of the positions in the interval
    pub fn iter(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{})", self.start, self.end)
    }
}

//
// tests
//
