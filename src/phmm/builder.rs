//!
//! Construction of the profile HMM of a reference window
//!
use super::params::TransitionParams;
use crate::common::{Position, K};
use crate::error::Result;
use crate::hmm::{Emission, FinalizedGraph, StateGraph, StateIndex};
use crate::kmer_model::KmerModel;
use derive_new::new;

/// Finalized profile HMM
pub type ProfileHmm = FinalizedGraph<StateLabel>;

///
/// The four states of a module.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Track {
    /// silent
    Delete,
    /// uniform emission
    Insert,
    /// `N(mean, stdv)`
    MatchNarrow,
    /// `N(mean, 2 stdv)`
    MatchWide,
}

impl Track {
    pub fn is_match(&self) -> bool {
        matches!(self, Track::MatchNarrow | Track::MatchWide)
    }
    pub fn is_emitting(&self) -> bool {
        !matches!(self, Track::Delete)
    }
    fn as_str(&self) -> &'static str {
        match self {
            Track::Delete => "D",
            Track::Insert => "I",
            Track::MatchNarrow => "M1",
            Track::MatchWide => "M2",
        }
    }
}

///
/// Label of a profile HMM state: absolute reference position and track.
///
/// Textual form is `<position>_<D|I|M1|M2>`, e.g. `120_M1`.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, new)]
pub struct StateLabel {
    pub position: Position,
    pub track: Track,
}

impl std::fmt::Display for StateLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}_{}", self.position, self.track.as_str())
    }
}

impl std::str::FromStr for StateLabel {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (position, track) = s
            .split_once('_')
            .ok_or_else(|| format!("state label `{}` has no track", s))?;
        let position = position
            .parse()
            .map_err(|_| format!("invalid position in state label `{}`", s))?;
        let track = match track {
            "D" => Track::Delete,
            "I" => Track::Insert,
            "M1" => Track::MatchNarrow,
            "M2" => Track::MatchWide,
            _ => return Err(format!("invalid track in state label `{}`", s)),
        };
        Ok(StateLabel { position, track })
    }
}

/// states of one module
#[derive(Clone, Copy, Debug)]
struct Module {
    d: StateIndex,
    i: StateIndex,
    m1: StateIndex,
    m2: StateIndex,
}

///
/// Build the profile HMM of `window`, which starts at `window_start` on the
/// reference.
///
/// A window of length `L` has `L - 5` modules; module `i` models the 5-mer
/// `window[i..i+5]` at reference position `window_start + i`.
/// `L < 6` is rejected with `Error::WindowTooShort`.
///
pub fn build_profile_hmm(
    window_start: Position,
    window: &[u8],
    model: &KmerModel,
    params: &TransitionParams,
) -> Result<ProfileHmm> {
    let levels = model.window_levels(window)?;
    let n = levels.len();
    debug_assert_eq!(n, window.len() - K);
    let p = params;

    let mut g = StateGraph::with_capacity(4 * n, 14 * n);
    let insert = Emission::uniform(p.insert_lower, p.insert_upper);

    // states and internal transitions
    let modules: Vec<Module> = levels
        .iter()
        .enumerate()
        .map(|(i, level)| {
            let pos = window_start + i;
            let m = Module {
                d: g.add_state(StateLabel::new(pos, Track::Delete), Emission::Silent),
                i: g.add_state(StateLabel::new(pos, Track::Insert), insert),
                m1: g.add_state(
                    StateLabel::new(pos, Track::MatchNarrow),
                    Emission::normal(level.mean, level.stdv),
                ),
                m2: g.add_state(
                    StateLabel::new(pos, Track::MatchWide),
                    Emission::normal(level.mean, 2.0 * level.stdv),
                ),
            };
            g.add_transition(m.i, m.i, p.i_to_i);
            g.add_transition(m.i, m.m1, p.i_to_ss * p.ss_to_m1);
            g.add_transition(m.i, m.m2, p.i_to_ss * p.ss_to_m2);
            g.add_transition(m.m1, m.m1, p.m1_to_m1);
            g.add_transition(m.m1, m.i, p.m1_to_se * p.se_to_i);
            g.add_transition(m.m2, m.m2, p.m2_to_m2);
            g.add_transition(m.m2, m.i, p.m2_to_se * p.se_to_i);
            m
        })
        .collect();

    // external transitions
    for (a, b) in modules.iter().zip(modules.iter().skip(1)) {
        g.add_transition(a.d, b.d, p.ext_d_to_d);
        g.add_transition(a.d, b.m1, p.ext_d_to_ss * p.ss_to_m1);
        g.add_transition(a.d, b.m2, p.ext_d_to_ss * p.ss_to_m2);

        g.add_transition(a.i, b.m1, p.ext_i_to_ss * p.ss_to_m1);
        g.add_transition(a.i, b.m2, p.ext_i_to_ss * p.ss_to_m2);

        for (m, m_to_se) in [(a.m1, p.m1_to_se), (a.m2, p.m2_to_se)] {
            g.add_transition(m, b.d, m_to_se * p.ext_se_to_d);
            g.add_transition(m, b.m1, m_to_se * p.ext_se_to_ss * p.ss_to_m1);
            g.add_transition(m, b.m2, m_to_se * p.ext_se_to_ss * p.ss_to_m2);
        }
    }

    // start and end
    let first = modules[0];
    let last = modules[n - 1];
    let (start, end) = (g.start(), g.end());
    g.add_transition(start, first.i, 0.5);
    g.add_transition(start, first.m1, 0.5 * p.ss_to_m1);
    g.add_transition(start, first.m2, 0.5 * p.ss_to_m2);
    g.add_transition(last.d, end, p.ext_d_to_d + p.ext_d_to_ss);
    g.add_transition(last.i, end, p.ext_i_to_ss);
    g.add_transition(
        last.m1,
        end,
        p.m1_to_se * (p.ext_se_to_ss + p.ext_se_to_d),
    );
    g.add_transition(
        last.m2,
        end,
        p.m2_to_se * (p.ext_se_to_ss + p.ext_se_to_d),
    );

    g.finalize()
}

//
// tests
//
