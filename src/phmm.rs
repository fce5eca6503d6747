//!
//! Profile HMM of a read's reference window
//!
//! * Builder
//!     A linear chain of modules, one per 5-mer of the window, each with
//!     four states
//!
//!     * `D` Delete, silent
//!     * `I` Insert, uniform emission
//!     * `M1` narrow match, `N(mean, stdv)` of the 5-mer
//!     * `M2` wide match, `N(mean, 2 stdv)` of the 5-mer
//!
//! * Align
//!     Viterbi decoding of a normalized signal and mapping of the emitting
//!     states back to reference positions
//!
//! # Usage
//!
//! ```
//! use poretrain::mocks::{mock_model, mock_reference};
//! use poretrain::phmm::{build_profile_hmm, TransitionParams};
//! let model = mock_model();
//! let reference = mock_reference(20);
//! let phmm = build_profile_hmm(0, &reference, &model, &TransitionParams::default()).unwrap();
//! // 15 modules of 4 states, plus Start/End
//! assert_eq!(phmm.n_states(), 15 * 4 + 2);
//! ```
//!
pub mod align;
pub mod builder;
pub mod params;

// re-export
pub use align::{align_events, align_read, AlignedEvents, AlignmentFailure, ReadOutcome};
pub use builder::{build_profile_hmm, ProfileHmm, StateLabel, Track};
pub use params::TransitionParams;
