//!
//! Event pileup: normalized current values pooled by reference position
//!
//! ## Intermediate store
//!
//! The pileup is periodically appended to a text file and cleared, one line
//! per position:
//!
//! ```text
//! <position> <value> <value> ...
//! ```
//!
//! A position can appear on several lines (one per offload); loading the
//! store concatenates them.
//!
use crate::common::Position;
use crate::error::{Error, Result};
use crate::io::{create_writer, open_reader};
use crate::phmm::ReadOutcome;
use fnv::FnvHashMap as HashMap;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

///
/// Values pooled by reference position.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventPileup {
    events: HashMap<Position, Vec<f64>>,
    n_events: usize,
}

impl EventPileup {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, position: Position, value: f64) {
        self.events.entry(position).or_default().push(value);
        self.n_events += 1;
    }
    pub fn extend<I: IntoIterator<Item = (Position, f64)>>(&mut self, events: I) {
        for (position, value) in events {
            self.add(position, value);
        }
    }
    /// values of a position (empty slice if none)
    pub fn get(&self, position: Position) -> &[f64] {
        self.events
            .get(&position)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
    pub fn n_positions(&self) -> usize {
        self.events.len()
    }
    pub fn n_events(&self) -> usize {
        self.n_events
    }
    pub fn is_empty(&self) -> bool {
        self.n_events == 0
    }
    pub fn clear(&mut self) {
        self.events.clear();
        self.n_events = 0;
    }
    ///
    /// Write one line per position in increasing position order.
    ///
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let mut positions: Vec<Position> = self.events.keys().copied().collect();
        positions.sort_unstable();
        for position in positions {
            write!(w, "{}", position)?;
            for value in self.events[&position].iter() {
                write!(w, " {}", value)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

///
/// Counters of the alignment phase
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReadCounts {
    /// reads whose outcome has been merged
    pub processed: usize,
    /// reads skipped because of a per-read failure
    pub failed: usize,
    /// events added to the pileup
    pub events: usize,
}

///
/// Pileup and counters shared by the alignment workers.
///
/// Each read is merged under a single lock.
///
#[derive(Debug, Default)]
pub struct SharedPileup {
    inner: Mutex<(EventPileup, ReadCounts)>,
}

impl SharedPileup {
    pub fn new() -> Self {
        Self::default()
    }
    ///
    /// Merge the outcome of one read. Returns the counters after the merge.
    ///
    pub fn merge(&self, outcome: &ReadOutcome) -> ReadCounts {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let (pileup, counts) = &mut *guard;
        counts.processed += 1;
        match outcome {
            Ok(aligned) => {
                pileup.extend(aligned.events.iter().copied());
                counts.events += aligned.events.len();
            }
            Err(_) => counts.failed += 1,
        }
        *counts
    }
    pub fn counts(&self) -> ReadCounts {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).1
    }
    ///
    /// Append the pileup to the store and clear it.
    ///
    pub fn offload(&self, store: &mut EventStoreWriter) -> Result<()> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        store.append(&mut guard.0)
    }
}

///
/// Append-only writer of the intermediate store.
///
pub struct EventStoreWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    n_offloads: usize,
}

impl EventStoreWriter {
    ///
    /// Create (truncate) the store at `path`.
    ///
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = create_writer(&path)?;
        Ok(EventStoreWriter {
            path,
            writer,
            n_offloads: 0,
        })
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    /// number of `append` calls so far
    pub fn n_offloads(&self) -> usize {
        self.n_offloads
    }
    ///
    /// Write the whole pileup, flush, then clear the pileup.
    ///
    pub fn append(&mut self, pileup: &mut EventPileup) -> Result<()> {
        pileup
            .write_to(&mut self.writer)
            .map_err(Error::io(&self.path))?;
        self.writer.flush().map_err(Error::io(&self.path))?;
        pileup.clear();
        self.n_offloads += 1;
        Ok(())
    }
}

///
/// Load the store, concatenating the values of each position across lines.
///
pub fn load_event_store<P: AsRef<Path>>(path: P) -> Result<BTreeMap<Position, Vec<f64>>> {
    let path = path.as_ref();
    parse_event_store(open_reader(path)?, path)
}

///
/// Parse the store from a reader. `path` is only used in error messages.
///
pub fn parse_event_store<R: BufRead>(
    reader: R,
    path: &Path,
) -> Result<BTreeMap<Position, Vec<f64>>> {
    let mut pools: BTreeMap<Position, Vec<f64>> = BTreeMap::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(Error::io(path))?;
        let mut fields = line.split_whitespace();
        let position = match fields.next() {
            None => continue,
            Some(field) => field.parse::<Position>().map_err(|_| {
                Error::parse(path, i + 1, format!("invalid position `{}`", field))
            })?,
        };
        let pool = pools.entry(position).or_default();
        for field in fields {
            let value = field
                .parse::<f64>()
                .map_err(|_| Error::parse(path, i + 1, format!("invalid value `{}`", field)))?;
            pool.push(value);
        }
    }
    Ok(pools)
}

//
// tests
//
