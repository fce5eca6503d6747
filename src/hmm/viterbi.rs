//!
//! Viterbi decoding of a `FinalizedGraph`
//!
use super::graph::{FinalizedGraph, StateIndex};
use crate::prob::Prob;
use ndarray::{Array2, ArrayViewMut1};
use petgraph::graph::NodeIndex;

/// back-pointer marker of unreachable cells
const NO_STATE: u32 = u32::MAX;

///
/// The most likely state path and its log-likelihood.
///
/// `states` lists every visited state between Start and End (both
/// excluded) in order, silent states included. Restricting it to the
/// emitting states gives exactly one state per observation.
///
#[derive(Clone, Debug, PartialEq)]
pub struct ViterbiPath {
    pub score: Prob,
    pub states: Vec<StateIndex>,
}

impl ViterbiPath {
    ///
    /// `End` is reachable and the score is a representable number
    ///
    pub fn is_valid(&self) -> bool {
        self.score.is_finite()
    }
}

impl<L> FinalizedGraph<L> {
    ///
    /// max over parents `u` of `col[u] * a_uv`, with the argmax
    ///
    fn best_parent(&self, v: StateIndex, col: &[Prob]) -> (Prob, u32) {
        let mut best = Prob::zero();
        let mut arg = NO_STATE;
        for &(u, a) in self.incoming[v.index()].iter() {
            let cand = col[u as usize] * a;
            if cand > best {
                best = cand;
                arg = u;
            }
        }
        (best, arg)
    }
    ///
    /// propagate a column into its silent states (in topological order)
    ///
    fn fill_silent(&self, col: &mut [Prob], mut back: ArrayViewMut1<u32>) {
        for &s in self.silent_order.iter() {
            let (best, arg) = self.best_parent(s, col);
            col[s.index()] = best;
            back[s.index()] = arg;
        }
    }
    ///
    /// Decode the most likely path emitting `emissions`.
    ///
    /// If no path can emit the observations, the score is not finite and
    /// `states` is empty.
    ///
    pub fn viterbi(&self, emissions: &[f64]) -> ViterbiPath {
        let n = emissions.len();
        let n_states = self.n_states();
        let mut back = Array2::from_elem((n + 1, n_states), NO_STATE);
        let mut prev = vec![Prob::zero(); n_states];
        let mut cur = vec![Prob::zero(); n_states];

        // t=0
        prev[self.start().index()] = Prob::one();
        self.fill_silent(&mut prev, back.row_mut(0));

        for (t, &x) in emissions.iter().enumerate() {
            let t = t + 1;
            cur.iter_mut().for_each(|p| *p = Prob::zero());
            for &j in self.emitting.iter() {
                let (best, arg) = self.best_parent(j, &prev);
                cur[j.index()] = best * self.state(j).emission.prob(x);
                back[[t, j.index()]] = arg;
            }
            self.fill_silent(&mut cur, back.row_mut(t));
            std::mem::swap(&mut prev, &mut cur);
        }

        let (score, last) = self.best_parent(self.end(), &prev);
        let failed = ViterbiPath {
            score,
            states: Vec::new(),
        };
        if !score.is_finite() || last == NO_STATE {
            return failed;
        }

        // traceback
        let mut states = Vec::new();
        let mut t = n;
        let mut v = last;
        while v != self.start().index() as u32 {
            let node = NodeIndex::new(v as usize);
            states.push(node);
            let u = back[[t, v as usize]];
            if u == NO_STATE {
                return failed;
            }
            if !self.is_silent(node) {
                t -= 1;
            }
            v = u;
        }
        states.reverse();
        ViterbiPath { score, states }
    }
}
