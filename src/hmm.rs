//!
//! Generic state machine with continuous emissions and its Viterbi decoder
//!
//! # Usage
//!
//! 1. create a `StateGraph` (it already has the silent Start/End states)
//! 2. `add_state(label, emission)` / `add_transition(from, to, p)`
//! 3. `finalize()` into a `FinalizedGraph`
//!     * outgoing weights of each state are normalized to sum to 1
//!     * silent states are put in topological order
//! 4. `viterbi(emissions)` returns the most likely state path and its score
//!
//! # Viterbi recursion
//!
//! x = x[0],...,x[n-1] : observations
//!
//! ```text
//! V[0][start] = 1
//! V[t][j] = e_j(x[t-1]) max_i V[t-1][i] a_ij   (emitting j, 1 <= t <= n)
//! V[t][s] = max_i V[t][i] a_is                (silent s, in topological order)
//! score   = max_i V[n][i] a_i,end
//! ```
//!
//! Everything is computed in log space with `Prob`.
//!
pub mod emission;
pub mod graph;
pub mod viterbi;

pub use emission::Emission;
pub use graph::{FinalizedGraph, State, StateGraph, StateIndex};
pub use viterbi::ViterbiPath;
