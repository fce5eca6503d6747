//!
//! Transition probabilities of the profile HMM
//!
//! The names refer to silent "switch" states of a position module:
//! `SS` is the entry of a module and `SE` is its exit. They are
//! folded into direct transitions by the builder.
//!
use serde::{Deserialize, Serialize};

///
/// Fixed transition probabilities of a profile HMM.
///
/// Passed explicitly to the builder so that several parameter sets can
/// coexist.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionParams {
    //
    // internal (within a module)
    //
    /// Insert self loop
    pub i_to_i: f64,
    /// Insert to module entry
    pub i_to_ss: f64,
    /// module entry to narrow match
    pub ss_to_m1: f64,
    /// module entry to wide match
    pub ss_to_m2: f64,
    pub m1_to_m1: f64,
    pub m1_to_se: f64,
    pub m2_to_m2: f64,
    pub m2_to_se: f64,
    /// module exit back to Insert
    pub se_to_i: f64,
    //
    // external (from module i to i+1)
    //
    pub ext_d_to_d: f64,
    pub ext_d_to_ss: f64,
    pub ext_i_to_ss: f64,
    pub ext_se_to_d: f64,
    pub ext_se_to_ss: f64,
    //
    // emissions
    //
    /// support of the uniform emission of Insert states
    pub insert_lower: f64,
    pub insert_upper: f64,
}

impl Default for TransitionParams {
    fn default() -> Self {
        TransitionParams {
            i_to_i: 0.001,
            i_to_ss: 0.999,
            ss_to_m1: 0.996,
            ss_to_m2: 0.004,
            m1_to_m1: 0.4,
            m1_to_se: 0.6,
            m2_to_m2: 0.4,
            m2_to_se: 0.6,
            se_to_i: 0.001,
            ext_d_to_d: 0.3,
            ext_d_to_ss: 0.7,
            ext_i_to_ss: 0.999,
            ext_se_to_d: 0.0025,
            ext_se_to_ss: 0.9965,
            insert_lower: 50.0,
            insert_upper: 150.0,
        }
    }
}

impl std::fmt::Display for TransitionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "i_to_i: {}", self.i_to_i)?;
        writeln!(f, "i_to_ss: {}", self.i_to_ss)?;
        writeln!(f, "ss_to_m1: {}", self.ss_to_m1)?;
        writeln!(f, "ss_to_m2: {}", self.ss_to_m2)?;
        writeln!(f, "m1_to_m1: {}", self.m1_to_m1)?;
        writeln!(f, "m1_to_se: {}", self.m1_to_se)?;
        writeln!(f, "m2_to_m2: {}", self.m2_to_m2)?;
        writeln!(f, "m2_to_se: {}", self.m2_to_se)?;
        writeln!(f, "se_to_i: {}", self.se_to_i)?;
        writeln!(f, "ext_d_to_d: {}", self.ext_d_to_d)?;
        writeln!(f, "ext_d_to_ss: {}", self.ext_d_to_ss)?;
        writeln!(f, "ext_i_to_ss: {}", self.ext_i_to_ss)?;
        writeln!(f, "ext_se_to_d: {}", self.ext_se_to_d)?;
        writeln!(f, "ext_se_to_ss: {}", self.ext_se_to_ss)?;
        write!(f, "insert: U({},{})", self.insert_lower, self.insert_upper)
    }
}
