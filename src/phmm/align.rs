//!
//! Alignment of a read's events to reference positions
//!
//! 1. normalize the raw signal against the reference window
//! 2. build the profile HMM of the window
//! 3. Viterbi decode the normalized signal
//! 4. keep the samples emitted by a Match state whose position is inside the
//!    training bounds
//!
use super::builder::{build_profile_hmm, ProfileHmm, StateLabel};
use super::params::TransitionParams;
use crate::common::{Interval, Position};
use crate::error::{Error, Result};
use crate::kmer_model::KmerModel;
use crate::normalize::normalize_read;
use crate::prob::Prob;
use crate::reads::TrainingRead;
use thiserror::Error as ThisError;

///
/// Events of a read assigned to reference positions.
///
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedEvents {
    /// log-likelihood of the Viterbi path
    pub score: Prob,
    /// `(position, normalized value)` in signal order
    pub events: Vec<(Position, f64)>,
    /// number of samples emitted by any state (Insert included)
    pub n_emitted: usize,
}

///
/// Why a read was skipped.
///
/// These are recovered by dropping the read; they never abort a run.
///
#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum AlignmentFailure {
    #[error("normalization quality score {0} is out of range")]
    LowQuality(f64),
    #[error("reference window of length {0} is too short")]
    WindowTooShort(usize),
    #[error("reference window [{start}, {end}) exceeds the reference")]
    WindowOutOfRange { start: usize, end: usize },
    #[error("viterbi score {0} is not finite")]
    NonFiniteScore(f64),
}

/// Per-read result: aligned events or the reason the read was skipped
pub type ReadOutcome = std::result::Result<AlignedEvents, AlignmentFailure>;

///
/// Decode `signal` on `phmm` and collect the Match events in `bounds`.
///
pub fn align_events(phmm: &ProfileHmm, signal: &[f64], bounds: &Interval) -> ReadOutcome {
    let path = phmm.viterbi(signal);
    if !path.is_valid() {
        return Err(AlignmentFailure::NonFiniteScore(path.score.to_log_value()));
    }

    let emitting: Vec<StateLabel> = path
        .states
        .iter()
        .filter(|&&v| !phmm.is_silent(v))
        .filter_map(|&v| phmm.label(v).copied())
        .collect();
    debug_assert_eq!(emitting.len(), signal.len());

    let events = emitting
        .iter()
        .zip(signal.iter())
        .filter(|(label, _)| label.track.is_match() && bounds.contains(label.position))
        .map(|(label, &x)| (label.position, x))
        .collect();

    Ok(AlignedEvents {
        score: path.score,
        events,
        n_emitted: emitting.len(),
    })
}

///
/// Full per-read alignment.
///
/// Per-read problems (bad normalization, unusable window, non-finite
/// score) are reported in the inner `ReadOutcome`; the outer `Result` only
/// carries fatal errors such as a 5-mer missing from the model.
///
pub fn align_read(
    read: &TrainingRead,
    reference: &[u8],
    model: &KmerModel,
    params: &TransitionParams,
    bounds: &Interval,
) -> Result<ReadOutcome> {
    let window = read.bounds_reference;
    let normalized = match normalize_read(read, reference, model) {
        Ok(normalized) => normalized,
        Err(err) => return window_failure(err),
    };
    if !normalized.is_usable() {
        return Ok(Err(AlignmentFailure::LowQuality(normalized.quality_score)));
    }

    let phmm = match build_profile_hmm(
        window.start,
        &reference[window.start..window.end],
        model,
        params,
    ) {
        Ok(phmm) => phmm,
        Err(err) => return window_failure(err),
    };
    Ok(align_events(&phmm, &normalized.normalized, bounds))
}

fn window_failure(err: Error) -> Result<ReadOutcome> {
    match err {
        Error::WindowTooShort(len) => Ok(Err(AlignmentFailure::WindowTooShort(len))),
        Error::WindowOutOfRange { start, end, .. } => {
            Ok(Err(AlignmentFailure::WindowOutOfRange { start, end }))
        }
        err => Err(err),
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::K;
    use crate::mocks::{mock_model, mock_read, mock_reference};

    #[test]
    fn clean_signal_recovers_the_diagonal() {
        let model = mock_model();
        let reference = mock_reference(60);
        let read = mock_read(&reference, &model, Interval::new(10, 40));
        let bounds = Interval::new(0, reference.len());
        let aligned = align_read(&read, &reference, &model, &TransitionParams::default(), &bounds)
            .unwrap()
            .unwrap();
        assert!(aligned.score.is_finite());
        assert_eq!(aligned.n_emitted, read.raw.len());
        let positions: Vec<Position> = aligned.events.iter().map(|&(p, _)| p).collect();
        assert_eq!(positions, (10..40 - K).collect::<Vec<_>>());
    }

    #[test]
    fn bounds_restrict_the_events() {
        let model = mock_model();
        let reference = mock_reference(60);
        let read = mock_read(&reference, &model, Interval::new(10, 40));
        let bounds = Interval::new(20, 25);
        let aligned = align_read(&read, &reference, &model, &TransitionParams::default(), &bounds)
            .unwrap()
            .unwrap();
        let positions: Vec<Position> = aligned.events.iter().map(|&(p, _)| p).collect();
        assert_eq!(positions, vec![20, 21, 22, 23, 24]);
        for &(p, x) in aligned.events.iter() {
            let level = model.level(&reference[p..p + K]).unwrap();
            assert!((x - level.mean).abs() < 1e-6);
        }
    }

    #[test]
    fn bad_windows_are_per_read_failures() {
        let model = mock_model();
        let reference = mock_reference(30);
        let all = Interval::new(0, 30);
        let params = TransitionParams::default();

        let mut read = mock_read(&reference, &model, Interval::new(0, 20));
        read.bounds_reference = Interval::new(10, 35);
        let r = align_read(&read, &reference, &model, &params, &all).unwrap();
        assert_eq!(
            r,
            Err(AlignmentFailure::WindowOutOfRange { start: 10, end: 35 })
        );

        read.bounds_reference = Interval::new(10, 14);
        let r = align_read(&read, &reference, &model, &params, &all).unwrap();
        assert_eq!(r, Err(AlignmentFailure::WindowTooShort(4)));
    }

    #[test]
    fn noisy_read_is_rejected_before_alignment() {
        let model = mock_model();
        let reference = mock_reference(30);
        let mut read = mock_read(&reference, &model, Interval::new(0, 30));
        let n = read.raw.len();
        read.raw[n - 1] = 1000.0;
        let r = align_read(&read, &reference, &model, &TransitionParams::default(), &Interval::new(0, 30))
            .unwrap();
        assert!(matches!(r, Err(AlignmentFailure::LowQuality(_))));
    }

    #[test]
    fn missing_kmer_is_fatal() {
        let model = mock_model();
        let reference = b"ACGTACGTNNACGTACGTAC".to_vec();
        let read = TrainingRead {
            basecalls: reference.clone(),
            bounds_reference: Interval::new(0, 20),
            bounds_query: Interval::new(0, 20),
            raw: vec![90.0; 15],
        };
        let r = align_read(&read, &reference, &model, &TransitionParams::default(), &Interval::new(0, 20));
        assert!(matches!(r, Err(Error::MissingKmer(_))));
    }

    #[test]
    fn signal_outside_every_emission_fails() {
        let model = mock_model();
        let reference = mock_reference(12);
        let phmm = build_profile_hmm(0, &reference, &model, &TransitionParams::default()).unwrap();
        // outside the insert support [50,150] and too far for any gaussian
        let signal = vec![1.0e300; 7];
        let r = align_events(&phmm, &signal, &Interval::new(0, 12));
        assert!(matches!(r, Err(AlignmentFailure::NonFiniteScore(_))));
    }
}
