//!
//! Shift/scale normalization of the raw signal
//!
//! The raw current of a read is mapped onto the scale of the pore model by an
//! affine transform `raw = shift + scale * level`.
//!
//! Since the raw samples are not yet aligned to 5-mers, the transform is
//! fitted on quantiles: the sorted raw samples are paired with the sorted
//! expected levels of the read's reference window, and `(shift, scale)` is
//! the inverse-variance weighted least squares solution
//!
//! ```text
//! | Σw    Σwμ  | |shift|   | Σwx  |
//! | Σwμ   Σwμ² | |scale| = | Σwxμ |     (w = 1/σ²)
//! ```
//!
//! The quality score is the root mean square of the standardized residuals
//! `(normalized - μ) / σ` of those pairs.
//!
use crate::error::{Error, Result};
use crate::kmer_model::{KmerModel, Level};
use crate::reads::TrainingRead;

/// Reads whose quality score has an absolute value above this are discarded.
pub const MAX_QUALITY_SCORE: f64 = 1.0;

///
/// Result of normalizing a read.
///
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedReadData {
    /// normalized signal; same length and order as the raw signal
    pub normalized: Vec<f64>,
    /// residual fit error. `|score| > 1.0` marks the read unusable.
    pub quality_score: f64,
    pub shift: f64,
    pub scale: f64,
}

impl NormalizedReadData {
    ///
    /// Is the fit good enough to align the read?
    /// The boundary `|score| == 1.0` is accepted.
    ///
    pub fn is_usable(&self) -> bool {
        self.quality_score.abs() <= MAX_QUALITY_SCORE
    }
    fn rejected(raw: &[f64]) -> Self {
        NormalizedReadData {
            normalized: raw.to_vec(),
            quality_score: f64::INFINITY,
            shift: 0.0,
            scale: 1.0,
        }
    }
}

///
/// Normalize the read against the levels of its mapped reference window.
///
/// Errors only when the window cannot be looked up in the model;
/// a bad fit is reported through the quality score.
///
pub fn normalize_read(
    read: &TrainingRead,
    reference: &[u8],
    model: &KmerModel,
) -> Result<NormalizedReadData> {
    let b = read.bounds_reference;
    if b.end > reference.len() {
        return Err(Error::WindowOutOfRange {
            start: b.start,
            end: b.end,
            len: reference.len(),
        });
    }
    let levels = model.window_levels(&reference[b.start..b.end])?;
    Ok(normalize_signal(&read.raw, &levels))
}

///
/// Normalize `raw` to the distribution of `levels`.
///
pub fn normalize_signal(raw: &[f64], levels: &[Level]) -> NormalizedReadData {
    if raw.is_empty() || levels.is_empty() {
        return NormalizedReadData::rejected(raw);
    }

    let mut sorted_raw = raw.to_vec();
    sorted_raw.sort_by(|a, b| a.total_cmp(b));
    let mut sorted_levels = levels.to_vec();
    sorted_levels.sort_by(|a, b| a.mean.total_cmp(&b.mean));

    let n = sorted_raw.len();
    let m = sorted_levels.len();
    let paired = |i: usize| -> Level {
        // level at the same quantile as the i-th sorted sample
        let rank = ((2 * i + 1) * m) / (2 * n);
        sorted_levels[rank.min(m - 1)]
    };

    // normal equations
    let (mut a00, mut a01, mut a11, mut b0, mut b1) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (i, &x) in sorted_raw.iter().enumerate() {
        let level = paired(i);
        let w = 1.0 / (level.stdv * level.stdv);
        a00 += w;
        a01 += w * level.mean;
        a11 += w * level.mean * level.mean;
        b0 += w * x;
        b1 += w * x * level.mean;
    }
    let det = a00 * a11 - a01 * a01;
    if !(det.abs() > f64::EPSILON * a00 * a11) {
        return NormalizedReadData::rejected(raw);
    }
    let shift = (a11 * b0 - a01 * b1) / det;
    let scale = (a00 * b1 - a01 * b0) / det;
    if !(scale > 0.0) || !shift.is_finite() || !scale.is_finite() {
        return NormalizedReadData::rejected(raw);
    }

    let residual: f64 = sorted_raw
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let level = paired(i);
            let z = ((x - shift) / scale - level.mean) / level.stdv;
            z * z
        })
        .sum();
    let quality_score = (residual / n as f64).sqrt();

    NormalizedReadData {
        normalized: raw.iter().map(|&x| (x - shift) / scale).collect(),
        quality_score,
        shift,
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn levels() -> Vec<Level> {
        vec![
            Level::new(80.0, 1.5),
            Level::new(95.0, 2.0),
            Level::new(88.0, 1.0),
            Level::new(102.0, 2.5),
            Level::new(71.0, 1.2),
        ]
    }

    #[test]
    fn identity_when_signal_is_the_levels() {
        let raw: Vec<f64> = levels().iter().map(|l| l.mean).collect();
        let r = normalize_signal(&raw, &levels());
        assert_abs_diff_eq!(r.shift, 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(r.scale, 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(r.quality_score, 0.0, epsilon = 1e-8);
        for (x, y) in r.normalized.iter().zip(raw.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-8);
        }
        assert!(r.is_usable());
    }

    #[test]
    fn recover_affine_transform() {
        // raw = 12 + 1.3 * level, two samples per level, in scrambled order
        let mut raw: Vec<f64> = levels()
            .iter()
            .flat_map(|l| vec![12.0 + 1.3 * l.mean; 2])
            .collect();
        raw.reverse();
        let r = normalize_signal(&raw, &levels());
        assert_abs_diff_eq!(r.shift, 12.0, epsilon = 1e-6);
        assert_abs_diff_eq!(r.scale, 1.3, epsilon = 1e-8);
        assert_eq!(r.normalized.len(), raw.len());
        // order is preserved
        assert_abs_diff_eq!(r.normalized[0], 71.0, epsilon = 1e-6);
        assert_abs_diff_eq!(r.normalized[2], 102.0, epsilon = 1e-6);
        assert!(r.is_usable());
    }

    #[test]
    fn degenerate_signals_are_rejected() {
        let r = normalize_signal(&[], &levels());
        assert!(!r.is_usable());
        // a flat window has no spread to fit a scale on
        let flat = vec![Level::new(80.0, 1.0); 4];
        let r = normalize_signal(&[70.0, 80.0, 90.0, 100.0], &flat);
        assert!(!r.is_usable());
        // samples are paired by rank, so a decreasing signal still gets a positive scale
        let raw: Vec<f64> = vec![200.0, 100.0];
        let two = vec![Level::new(80.0, 1.0), Level::new(90.0, 1.0)];
        let r = normalize_signal(&raw, &two);
        assert!(r.is_usable());
        assert!(r.scale > 0.0);
    }

    #[test]
    fn quality_threshold_is_inclusive() {
        let two = [Level::new(80.0, 1.0), Level::new(95.0, 1.0)];
        let mut r = normalize_signal(&[80.0, 95.0], &two);
        r.quality_score = 1.0;
        assert!(r.is_usable());
        r.quality_score = -1.0;
        assert!(r.is_usable());
        r.quality_score = 1.0 + 1e-9;
        assert!(!r.is_usable());
    }

    #[test]
    fn noisy_signal_is_rejected() {
        // signal unrelated to the levels: wild outliers
        let raw = vec![80.0, 80.0, 80.0, 80.0, 400.0];
        let r = normalize_signal(&raw, &levels());
        assert!(r.quality_score > MAX_QUALITY_SCORE);
        assert!(!r.is_usable());
    }
}
