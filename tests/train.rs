//!
//! end-to-end runs of the training pipeline on synthetic data
//!
#[macro_use]
extern crate approx;

use flate2::write::GzEncoder;
use flate2::Compression;
use poretrain::common::{Interval, K};
use poretrain::mocks::{
    mock_model, mock_noisy_read, mock_read, mock_reference, write_training_data,
};
use poretrain::model_table::read_model_table;
use poretrain::phmm::{align_read, TransitionParams};
use poretrain::reads::TrainingRead;
use poretrain::train::{run_align, run_fit, train, TrainConfig};
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn write_inputs(dir: &Path, reference: &[u8], reads: &[TrainingRead], gz: bool) -> TrainConfig {
    let model_path = dir.join("template.model");
    let mut f = File::create(&model_path).unwrap();
    mock_model().write_to(&mut f).unwrap();

    let data_path = if gz {
        let path = dir.join("reads.foh.gz");
        let mut e = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        write_training_data(&mut e, reference, reads).unwrap();
        e.finish().unwrap().flush().unwrap();
        path
    } else {
        let path = dir.join("reads.foh");
        let mut f = File::create(&path).unwrap();
        write_training_data(&mut f, reference, reads).unwrap();
        path
    };
    TrainConfig::new(
        data_path,
        model_path,
        dir.join("trained.tsv"),
        Interval::new(0, reference.len()),
    )
}

#[test]
fn single_clean_read_is_fitted_at_the_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let model = mock_model();
    let reference = mock_reference(20);
    let read = mock_read(&reference, &model, Interval::new(0, 20));
    let config = write_inputs(dir.path(), &reference, &[read], false);

    let summary = train(&config).unwrap();
    println!("{:?}", summary);
    let align = summary.align.unwrap();
    assert_eq!(align.reads.processed, 1);
    assert_eq!(align.reads.failed, 0);
    let fit = summary.fit.unwrap();
    assert_eq!(fit.positions, 20 - K + 1);
    assert_eq!(fit.failed, 0);
    assert_eq!(fit.fitted + fit.empty, fit.positions);

    let rows = read_model_table(&config.output).unwrap();
    assert_eq!(rows.len(), fit.fitted);
    for pair in rows.windows(2) {
        assert!(pair[0].position < pair[1].position);
    }
    for row in rows.iter() {
        assert_eq!(row.kmer.as_bytes(), &reference[row.position..row.position + K]);
        assert!(row.mixture[0].weight > 0.95, "{}", row);
        assert_abs_diff_eq!(row.mixture[0].mean, row.baseline.mean, epsilon = 1e-3);
    }
}

#[test]
fn gzipped_training_data() {
    let model = mock_model();
    let reference = mock_reference(30);
    let reads = vec![
        mock_read(&reference, &model, Interval::new(0, 30)),
        mock_read(&reference, &model, Interval::new(4, 24)),
    ];
    let plain = tempfile::tempdir().unwrap();
    let gz = tempfile::tempdir().unwrap();
    let c1 = write_inputs(plain.path(), &reference, &reads, false);
    let c2 = write_inputs(gz.path(), &reference, &reads, true);

    let s1 = train(&c1).unwrap();
    let s2 = train(&c2).unwrap();
    assert_eq!(s1.align, s2.align);
    assert_eq!(s1.fit, s2.fit);
    assert_eq!(
        std::fs::read(&c1.output).unwrap(),
        std::fs::read(&c2.output).unwrap()
    );
}

#[test]
fn fit_phase_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let model = mock_model();
    let reference = mock_reference(40);
    let reads: Vec<TrainingRead> = (0..4)
        .map(|i| mock_noisy_read(&reference, &model, Interval::new(0, 40), 3, 0.0, 1.0, i))
        .collect();
    let config = write_inputs(dir.path(), &reference, &reads, false);

    let s = run_align(&config).unwrap();
    assert!(s.fit.is_none());
    assert!(config.work_file.exists());

    let s1 = run_fit(&config).unwrap();
    assert!(s1.align.is_none());
    let first = std::fs::read(&config.output).unwrap();
    let s2 = run_fit(&config).unwrap();
    let second = std::fs::read(&config.output).unwrap();
    assert_eq!(s1.fit, s2.fit);
    assert_eq!(first, second);
}

#[test]
fn thread_count_does_not_change_the_result() {
    let model = mock_model();
    let reference = mock_reference(50);
    let reads: Vec<TrainingRead> = (0..9)
        .map(|i| {
            let start = (i as usize * 3) % 20;
            mock_noisy_read(&reference, &model, Interval::new(start, start + 30), 2, 0.0, 1.0, i)
        })
        .collect();

    let mut tables = Vec::new();
    let mut counts = Vec::new();
    for &threads in [1, 4].iter() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path(), &reference, &reads, false);
        config.threads = threads;
        config.offload_every = 1;
        let summary = train(&config).unwrap();
        counts.push((summary.align.unwrap().reads, summary.fit.unwrap()));
        tables.push(std::fs::read(&config.output).unwrap());
    }
    assert_eq!(counts[0], counts[1]);
    assert_eq!(tables[0], tables[1]);
    assert_eq!(counts[0].0.processed, 9);
}

#[test]
fn summary_is_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let model = mock_model();
    let reference = mock_reference(20);
    let read = mock_read(&reference, &model, Interval::new(0, 20));
    let mut config = write_inputs(dir.path(), &reference, &[read], false);
    let path = dir.path().join("summary.json");
    config.summary = Some(path.clone());

    train(&config).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["align"]["reads"]["processed"], 1);
    assert_eq!(json["fit"]["failed"], 0);
    assert!(json["elapsed_ms"].is_u64());
}

#[test]
fn missing_inputs_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = TrainConfig::new(
        dir.path().join("none.foh"),
        dir.path().join("none.model"),
        dir.path().join("out.tsv"),
        Interval::new(0, 10),
    );
    assert!(train(&config).is_err());
    assert!(!config.output.exists());
}

#[test]
fn noisy_shifted_read_is_aligned_near_the_truth() {
    let model = mock_model();
    let reference = mock_reference(60);
    let bounds = Interval::new(0, 60);
    let read = mock_noisy_read(&reference, &model, bounds, 3, 10.0, 1.2, 1);
    let outcome = align_read(&read, &reference, &model, &TransitionParams::default(), &bounds)
        .unwrap()
        .unwrap();
    assert!(outcome.n_emitted == read.raw.len());
    assert!(outcome.events.len() * 10 >= read.raw.len() * 8);
    for pair in outcome.events.windows(2) {
        assert!(pair[0].0 <= pair[1].0);
    }

    // per-position means of the events stay close to the baseline
    let mut close = 0;
    let mut total = 0;
    for position in 0..60 - K {
        let values: Vec<f64> = outcome
            .events
            .iter()
            .filter(|(p, _)| *p == position)
            .map(|(_, x)| *x)
            .collect();
        if values.is_empty() {
            continue;
        }
        total += 1;
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let level = model.level(&reference[position..position + K]).unwrap();
        if (mean - level.mean).abs() < 3.0 * level.stdv {
            close += 1;
        }
    }
    println!("{}/{} positions close", close, total);
    assert!(total * 10 >= (60 - K) * 8);
    assert!(close * 10 >= total * 9);
}
