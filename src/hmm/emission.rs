//!
//! Emission distributions of HMM states
//!
use crate::prob::Prob;

/// `0.5 * ln(2π)`
const HALF_LN_2PI: f64 = 0.918_938_533_204_672_8;

///
/// Emission distribution of a state.
///
/// `Silent` states do not consume an observation.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Emission {
    Silent,
    Uniform { lower: f64, upper: f64 },
    Normal { mean: f64, stdv: f64 },
}

impl Emission {
    pub fn normal(mean: f64, stdv: f64) -> Self {
        Emission::Normal { mean, stdv }
    }
    pub fn uniform(lower: f64, upper: f64) -> Self {
        Emission::Uniform { lower, upper }
    }
    ///
    /// This state does not emit.
    ///
    pub fn is_silent(&self) -> bool {
        matches!(self, Emission::Silent)
    }
    ///
    /// Density of observing `x`.
    /// Silent states have nothing to observe and return `p=1`.
    ///
    pub fn prob(&self, x: f64) -> Prob {
        match *self {
            Emission::Silent => Prob::one(),
            Emission::Uniform { lower, upper } => {
                if lower <= x && x <= upper {
                    Prob::from_log_prob(-(upper - lower).ln())
                } else {
                    Prob::zero()
                }
            }
            Emission::Normal { mean, stdv } => {
                let z = (x - mean) / stdv;
                Prob::from_log_prob(-0.5 * z * z - stdv.ln() - HALF_LN_2PI)
            }
        }
    }
}

impl std::fmt::Display for Emission {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Emission::Silent => write!(f, "silent"),
            Emission::Uniform { lower, upper } => write!(f, "U({},{})", lower, upper),
            Emission::Normal { mean, stdv } => write!(f, "N({:.3},{:.3})", mean, stdv),
        }
    }
}
