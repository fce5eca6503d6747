//!
//! poretrain: training of a per-position nanopore current model
//!
//! 1. each read's raw signal is normalized to the 5-mer baseline model
//!    (`normalize`)
//! 2. a profile HMM of the read's reference window is built and the signal
//!    is Viterbi aligned to it (`phmm`, on top of the generic `hmm` engine)
//! 3. the events aligned to Match states are pooled by reference position
//!    (`pileup`)
//! 4. a two-component gaussian mixture is fitted to each position by EM
//!    (`mixture`) and written as the model table (`model_table`)
//!
//! `train` runs the two phases in parallel.
//!
pub mod common;
pub mod error;
pub mod hmm;
pub mod io;
pub mod kmer_model;
pub mod mixture;
pub mod mocks;
pub mod model_table;
pub mod normalize;
pub mod phmm;
pub mod pileup;
pub mod prob;
pub mod reads;
pub mod train;
pub mod utils;

pub use error::{Error, Result};

extern crate jemallocator;
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;
