//!
//! Two-phase training
//!
//! * Phase 1 `align_reads`
//!     Reads are pulled from the training data in batches of `threads` reads.
//!     The reads of a batch are aligned in parallel and the batch is a
//!     barrier. Aligned events are merged into a `SharedPileup`, once per
//!     read, and the pileup is offloaded to the event store every
//!     `offload_every` batches.
//!
//! * Phase 2 `fit_positions`
//!     The event store is reloaded and a two-component mixture is fitted for
//!     each position inside the bounds, in parallel. Rows are written sorted
//!     by position.
//!
use crate::common::{Interval, Position, K};
use crate::error::{Error, Result};
use crate::io::{create_writer, write_string};
use crate::kmer_model::KmerModel;
use crate::mixture::{fit_mixture, ComponentPrior, EmConfig, FitError};
use crate::model_table::{write_model_table, FittedPosition};
use crate::phmm::{align_read, TransitionParams};
use crate::pileup::{load_event_store, EventStoreWriter, ReadCounts, SharedPileup};
use crate::reads::TrainingData;
use crate::utils::{check_memory_usage, progress_common_style, timer};
use histo::Histogram;
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

///
/// Resolved configuration of a training run
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// training data file (plain or .gz)
    pub training_data: PathBuf,
    /// 5-mer baseline model in ONT format
    pub pore_model: PathBuf,
    /// final model table
    pub output: PathBuf,
    /// intermediate event store
    pub work_file: PathBuf,
    /// positions `[lower, upper)` to train
    pub bounds: Interval,
    /// number of worker threads (= batch size of phase 1)
    pub threads: usize,
    /// offload the pileup every this many batches
    pub offload_every: usize,
    pub em: EmConfig,
    pub transitions: TransitionParams,
    /// optional JSON run summary
    pub summary: Option<PathBuf>,
}

impl TrainConfig {
    ///
    /// Config with default settings. The event store is `<output>.events`.
    ///
    pub fn new<P: AsRef<Path>>(
        training_data: P,
        pore_model: P,
        output: P,
        bounds: Interval,
    ) -> Self {
        let output = output.as_ref().to_path_buf();
        TrainConfig {
            training_data: training_data.as_ref().to_path_buf(),
            pore_model: pore_model.as_ref().to_path_buf(),
            work_file: default_work_file(&output),
            output,
            bounds,
            threads: 1,
            offload_every: 5,
            em: EmConfig::default(),
            transitions: TransitionParams::default(),
            summary: None,
        }
    }
    ///
    /// Reject settings that cannot run.
    ///
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::Config("threads must be at least 1".to_string()));
        }
        if self.offload_every == 0 {
            return Err(Error::Config("offload cadence must be at least 1".to_string()));
        }
        if self.bounds.is_empty() {
            return Err(Error::Config(format!(
                "training bounds {} contain no position",
                self.bounds
            )));
        }
        if !(self.em.tolerance > 0.0) {
            return Err(Error::Config("EM tolerance must be positive".to_string()));
        }
        Ok(())
    }
}

/// `<output>.events`
pub fn default_work_file(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".events");
    PathBuf::from(name)
}

///
/// Statistics of phase 1
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Phase1Summary {
    pub reads: ReadCounts,
    pub batches: usize,
    pub offloads: usize,
}

///
/// Statistics of phase 2
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Phase2Summary {
    /// positions in bounds
    pub positions: usize,
    pub fitted: usize,
    /// fit abandoned
    pub failed: usize,
    /// no events
    pub empty: usize,
}

///
/// Statistics of a run
///
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrainSummary {
    pub align: Option<Phase1Summary>,
    pub fit: Option<Phase2Summary>,
    pub elapsed_ms: u64,
}

//
// Phase 1
//

///
/// Align every read of `data` and store the events in `config.work_file`.
///
pub fn align_reads<R: BufRead>(
    data: &mut TrainingData<R>,
    model: &KmerModel,
    config: &TrainConfig,
) -> Result<Phase1Summary> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| Error::Config(e.to_string()))?;
    let shared = SharedPileup::new();
    let mut store = EventStoreWriter::create(&config.work_file)?;
    let reference = data.reference.clone();
    let bar = ProgressBar::new(data.n_reads as u64)
        .with_style(progress_common_style())
        .with_prefix("align");
    info!(
        "aligning {} reads to a reference of {} bases with {} threads",
        data.n_reads,
        reference.len(),
        config.threads
    );

    let mut batch = Vec::with_capacity(config.threads);
    let mut n_batches = 0;
    loop {
        batch.clear();
        while batch.len() < config.threads {
            match data.next_read()? {
                Some(read) => batch.push(read),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }

        pool.install(|| {
            batch.par_iter().try_for_each(|read| -> Result<()> {
                let outcome = align_read(
                    read,
                    &reference,
                    model,
                    &config.transitions,
                    &config.bounds,
                )?;
                if let Err(failure) = &outcome {
                    debug!("read at {} skipped: {}", read.bounds_reference, failure);
                }
                let counts = shared.merge(&outcome);
                bar.set_message(format!("failed={}", counts.failed));
                bar.inc(1);
                Ok(())
            })
        })?;

        n_batches += 1;
        if n_batches % config.offload_every == 0 {
            shared.offload(&mut store)?;
            check_memory_usage();
        }
    }
    shared.offload(&mut store)?;
    bar.finish();

    let summary = Phase1Summary {
        reads: shared.counts(),
        batches: n_batches,
        offloads: store.n_offloads(),
    };
    info!(
        "aligned reads={} failed={} events={} offloads={}",
        summary.reads.processed, summary.reads.failed, summary.reads.events, summary.offloads
    );
    Ok(summary)
}

//
// Phase 2
//

///
/// Result of fitting a single position
///
#[derive(Clone, Debug, PartialEq)]
pub enum PositionFit {
    Fitted(FittedPosition),
    Failed(Position, FitError),
    Empty(Position),
}

///
/// Positions of `bounds` that have a full 5-mer in `reference`
///
pub fn trainable_positions(reference: &[u8], bounds: &Interval) -> std::ops::Range<Position> {
    let last = (reference.len() + 1).saturating_sub(K);
    bounds.start.min(last)..bounds.end.min(last)
}

///
/// Fit a position from its pooled events.
///
/// The narrow component starts from the baseline level and the wide one
/// from twice its stdv.
///
pub fn fit_position(
    position: Position,
    reference: &[u8],
    model: &KmerModel,
    events: &[f64],
    em: &EmConfig,
) -> Result<PositionFit> {
    if events.is_empty() {
        return Ok(PositionFit::Empty(position));
    }
    let kmer = &reference[position..position + K];
    let level = model.level(kmer)?;
    let priors = [
        ComponentPrior::new(level.mean, level.stdv),
        ComponentPrior::new(level.mean, 2.0 * level.stdv),
    ];
    Ok(match fit_mixture(events, priors, em) {
        Ok(mixture) => PositionFit::Fitted(FittedPosition {
            position,
            kmer: String::from_utf8_lossy(kmer).into_owned(),
            baseline: level,
            mixture: mixture.components,
        }),
        Err(err) => PositionFit::Failed(position, err),
    })
}

///
/// Fit every position in bounds from `config.work_file` and write
/// `config.output`.
///
pub fn fit_positions(
    reference: &[u8],
    model: &KmerModel,
    config: &TrainConfig,
) -> Result<Phase2Summary> {
    let pools = load_event_store(&config.work_file)?;
    let positions: Vec<Position> = trainable_positions(reference, &config.bounds).collect();
    info!(
        "fitting {} positions ({} with events in the store)",
        positions.len(),
        pools.len()
    );

    let mut histogram = Histogram::with_buckets(10);
    for p in positions.iter() {
        histogram.add(pools.get(p).map_or(0, |v| v.len()) as u64);
    }
    debug!("events per position\n{}", histogram);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| Error::Config(e.to_string()))?;
    let summary = Mutex::new(Phase2Summary {
        positions: positions.len(),
        ..Default::default()
    });
    let bar = ProgressBar::new(positions.len() as u64)
        .with_style(progress_common_style())
        .with_prefix("fit");

    let fits: Vec<PositionFit> = pool.install(|| {
        positions
            .par_iter()
            .progress_with(bar.clone())
            .map(|&position| {
                let events = pools.get(&position).map_or(&[][..], |v| v.as_slice());
                let fit = fit_position(position, reference, model, events, &config.em)?;
                let mut s = summary.lock().unwrap_or_else(|e| e.into_inner());
                match &fit {
                    PositionFit::Fitted(_) => s.fitted += 1,
                    PositionFit::Failed(p, err) => {
                        debug!("position {} not fitted: {}", p, err);
                        s.failed += 1;
                    }
                    PositionFit::Empty(_) => s.empty += 1,
                }
                bar.set_message(format!("failed={}", s.failed));
                Ok(fit)
            })
            .collect::<Result<Vec<_>>>()
    })?;
    bar.finish();

    let mut rows: Vec<FittedPosition> = fits
        .into_iter()
        .filter_map(|fit| match fit {
            PositionFit::Fitted(row) => Some(row),
            _ => None,
        })
        .collect();
    rows.sort_by_key(|row| row.position);
    let path = &config.output;
    let mut writer = create_writer(path)?;
    write_model_table(&mut writer, &rows).map_err(Error::io(path))?;
    writer.flush().map_err(Error::io(path))?;

    let summary = summary.into_inner().unwrap_or_else(|e| e.into_inner());
    info!(
        "fitted={} failed={} empty={}",
        summary.fitted, summary.failed, summary.empty
    );
    Ok(summary)
}

//
// Runs
//

///
/// Phase 1 only
///
pub fn run_align(config: &TrainConfig) -> Result<TrainSummary> {
    run(config, true, false)
}

///
/// Phase 2 only, on an existing event store
///
pub fn run_fit(config: &TrainConfig) -> Result<TrainSummary> {
    run(config, false, true)
}

///
/// Both phases
///
pub fn train(config: &TrainConfig) -> Result<TrainSummary> {
    run(config, true, true)
}

fn run(config: &TrainConfig, align: bool, fit: bool) -> Result<TrainSummary> {
    config.validate()?;
    let (summary, elapsed_ms) = timer(|| -> Result<TrainSummary> {
        let model = KmerModel::from_file(&config.pore_model)?;
        info!("loaded {} 5-mers from {}", model.len(), config.pore_model.display());
        let mut data = TrainingData::open(&config.training_data)?;
        let mut summary = TrainSummary::default();
        if align {
            summary.align = Some(align_reads(&mut data, &model, config)?);
        }
        if fit {
            summary.fit = Some(fit_positions(&data.reference, &model, config)?);
        }
        Ok(summary)
    });
    let summary = TrainSummary {
        elapsed_ms: elapsed_ms as u64,
        ..summary?
    };
    if let Some(path) = &config.summary {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| Error::Config(format!("cannot serialize the summary: {}", e)))?;
        write_string(path, &json)?;
    }
    Ok(summary)
}

//
// tests
//
