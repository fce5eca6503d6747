//!
//! Error types
//!
//! Run-level failures (`Error`) abort the training run.
//! Per-read and per-position failures are not errors of the run; they are
//! counted by the pipeline (see `train`).
//!
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// file could not be opened, read or written
    #[error("could not access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// input file does not follow the expected line structure
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// the pore model has no entry for a 5-mer that the reference needs
    #[error("5-mer {0} is not in the pore model")]
    MissingKmer(String),

    /// reference window too short to anchor a single 5-mer position
    #[error("reference window of length {0} is too short (at least 6 bases are needed)")]
    WindowTooShort(usize),

    /// reference window does not fit inside the reference
    #[error("reference window [{start}, {end}) is outside the reference of length {len}")]
    WindowOutOfRange { start: usize, end: usize, len: usize },

    /// silent states of the state graph form a cycle
    #[error("silent states form a cycle and cannot be ordered")]
    SilentCycle,

    /// invalid run configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    ///
    /// Wrap an io error with the path it happened on.
    ///
    pub fn io<P: Into<PathBuf>>(path: P) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
    ///
    /// Parse error at `line` (1-based) of `path`.
    ///
    pub fn parse<P: Into<PathBuf>, S: Into<String>>(path: P, line: usize, message: S) -> Error {
        Error::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
