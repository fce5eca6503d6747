//!
//! Final model table
//!
//! Tab separated, one header line then one row per fitted position in
//! increasing position order:
//!
//! ```text
//! position  5mer  ONT_mean  ONT_stdv  pi_1  mean_1  stdv_1  pi_2  mean_2  stdv_2
//! ```
//!
use crate::common::Position;
use crate::error::{Error, Result};
use crate::io::open_reader;
use crate::kmer_model::Level;
use crate::mixture::Component;
use std::io::{BufRead, Write};
use std::path::Path;

/// header line of the table
pub const HEADER: &str =
    "position\t5mer\tONT_mean\tONT_stdv\tpi_1\tmean_1\tstdv_1\tpi_2\tmean_2\tstdv_2";

///
/// Fitted parameters of a reference position
///
#[derive(Clone, Debug, PartialEq)]
pub struct FittedPosition {
    pub position: Position,
    pub kmer: String,
    /// level of the 5-mer in the baseline model
    pub baseline: Level,
    /// narrow and wide components
    pub mixture: [Component; 2],
}

impl std::fmt::Display for FittedPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.position, self.kmer, self.baseline.mean, self.baseline.stdv
        )?;
        for c in self.mixture.iter() {
            write!(f, "\t{}\t{}\t{}", c.weight, c.mean, c.stdv)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for FittedPosition {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('\t').collect();
        if fields.len() != 10 {
            return Err(format!("expected 10 columns, found {}", fields.len()));
        }
        let float = |i: usize| -> std::result::Result<f64, String> {
            fields[i]
                .parse()
                .map_err(|_| format!("invalid number `{}` in column {}", fields[i], i + 1))
        };
        let position = fields[0]
            .parse()
            .map_err(|_| format!("invalid position `{}`", fields[0]))?;
        Ok(FittedPosition {
            position,
            kmer: fields[1].to_string(),
            baseline: Level::new(float(2)?, float(3)?),
            mixture: [
                Component::new(float(4)?, float(5)?, float(6)?),
                Component::new(float(7)?, float(8)?, float(9)?),
            ],
        })
    }
}

///
/// Write the header and the rows (in the given order).
///
pub fn write_model_table<W: Write>(w: &mut W, rows: &[FittedPosition]) -> std::io::Result<()> {
    writeln!(w, "{}", HEADER)?;
    for row in rows {
        writeln!(w, "{}", row)?;
    }
    Ok(())
}

///
/// Read a table written by `write_model_table`.
///
pub fn read_model_table<P: AsRef<Path>>(path: P) -> Result<Vec<FittedPosition>> {
    let path = path.as_ref();
    let reader = open_reader(path)?;
    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(Error::io(path))?;
        if i == 0 {
            if line != HEADER {
                return Err(Error::parse(path, 1, "unexpected header"));
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }
        let row = line
            .parse::<FittedPosition>()
            .map_err(|message| Error::parse(path, i + 1, message))?;
        rows.push(row);
    }
    Ok(rows)
}
