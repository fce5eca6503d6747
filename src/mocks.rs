//!
//! Synthetic models, references, reads and samples for tests and benches
//!
use crate::common::{Interval, Sequence, VALID_BASES, K};
use crate::kmer_model::{KmerModel, Level};
use crate::reads::{write_header, TrainingRead};
use rand::prelude::*;
use rand_distr::Normal;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::io::Write;

/// stdv of every 5-mer of `mock_model`
pub const MOCK_STDV: f64 = 1.5;

///
/// generate random bases of given length from seed
///
pub fn random_sequence(length: usize, seed: u64) -> Sequence {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..length)
        .map(|_| VALID_BASES[rng.gen_range(0..VALID_BASES.len())])
        .collect()
}

///
/// Model covering all 1024 ACGT 5-mers.
///
/// Means are a permutation of an even grid on [70, 120) so every 5-mer has
/// its own level; all stdvs are `MOCK_STDV`.
///
pub fn mock_model() -> KmerModel {
    let n = VALID_BASES.len().pow(K as u32);
    KmerModel::from_levels((0..n).map(|index| {
        let kmer: Vec<u8> = (0..K)
            .map(|i| VALID_BASES[(index >> (2 * (K - 1 - i))) & 3])
            .collect();
        let rank = (index * 389) % n;
        let mean = 70.0 + 50.0 * rank as f64 / n as f64;
        (kmer, Level::new(mean, MOCK_STDV))
    }))
}

///
/// random reference of length `len` (seed fixed)
///
pub fn mock_reference(len: usize) -> Sequence {
    random_sequence(len, 0)
}

///
/// A read mapped to `bounds` of `reference` whose raw signal is the
/// baseline mean of every 5-mer position of the window, once each.
///
pub fn mock_read(reference: &[u8], model: &KmerModel, bounds: Interval) -> TrainingRead {
    let window = &reference[bounds.start..bounds.end];
    let raw = model
        .window_levels(window)
        .expect("mock windows are longer than a 5-mer and covered by the model")
        .iter()
        .map(|level| level.mean)
        .collect();
    TrainingRead {
        basecalls: window.to_vec(),
        bounds_reference: bounds,
        bounds_query: Interval::new(0, window.len()),
        raw,
    }
}

///
/// Like `mock_read` but with `n_samples` gaussian samples per position,
/// shifted and scaled as `shift + scale * x`.
///
pub fn mock_noisy_read(
    reference: &[u8],
    model: &KmerModel,
    bounds: Interval,
    n_samples: usize,
    shift: f64,
    scale: f64,
    seed: u64,
) -> TrainingRead {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut read = mock_read(reference, model, bounds);
    let window = &reference[bounds.start..bounds.end];
    read.raw = model
        .window_levels(window)
        .expect("mock windows are longer than a 5-mer and covered by the model")
        .iter()
        .flat_map(|level| {
            let normal =
                Normal::new(level.mean, level.stdv).expect("mock stdv is positive and finite");
            (0..n_samples)
                .map(|_| shift + scale * normal.sample(&mut rng))
                .collect::<Vec<f64>>()
        })
        .collect();
    read
}

///
/// Write a training data file (header + records).
///
pub fn write_training_data<W: Write>(
    w: &mut W,
    reference: &[u8],
    reads: &[TrainingRead],
) -> std::io::Result<()> {
    write_header(w, reference, reads.len())?;
    for read in reads {
        read.write_to(w)?;
    }
    Ok(())
}

///
/// `n` samples of a gaussian mixture given as `(weight, mean, stdv)`.
///
pub fn mixture_samples(components: &[(f64, f64, f64)], n: usize, seed: u64) -> Vec<f64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let total: f64 = components.iter().map(|c| c.0).sum();
    let normals: Vec<Normal<f64>> = components
        .iter()
        .map(|&(_, mean, stdv)| Normal::new(mean, stdv).expect("valid mixture component"))
        .collect();
    (0..n)
        .map(|_| {
            let mut u: f64 = rng.gen::<f64>() * total;
            let mut k = 0;
            while k + 1 < components.len() && u >= components[k].0 {
                u -= components[k].0;
                k += 1;
            }
            normals[k].sample(&mut rng)
        })
        .collect()
}
