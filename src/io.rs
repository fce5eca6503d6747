//!
//! File helpers
//!
//! Every open/create attaches the path to the error so a failing run reports
//! which file it could not access.
//!
use crate::error::{Error, Result};
use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

///
/// Open a text file for buffered reading.
/// Files ending with `.gz` are decompressed on the fly.
///
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(Error::io(path))?;
    let reader = BufReader::new(file);
    if path.extension().is_some_and(|ext| ext == "gz") {
        let decoder = MultiGzDecoder::new(reader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        Ok(Box::new(reader))
    }
}

///
/// Create (truncate) a file for buffered writing.
///
pub fn create_writer<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    let path = path.as_ref();
    let file = File::create(path).map_err(Error::io(path))?;
    Ok(BufWriter::new(file))
}

///
/// write string into a file
///
pub fn write_string<P: AsRef<Path>>(path: P, string: &str) -> Result<()> {
    let path = path.as_ref();
    let mut file = create_writer(path)?;
    file.write_all(string.as_bytes()).map_err(Error::io(path))?;
    file.flush().map_err(Error::io(path))
}
