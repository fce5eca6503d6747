use indicatif::ProgressStyle;
use log::{info, warn};
use std::time::Instant;

///
/// measure time in milli-seconds (ms) of closure.
///
pub fn timer<F, T>(f: F) -> (T, u128)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let ret = f();
    let duration = start.elapsed();
    (ret, duration.as_millis())
}

///
/// Style of progress bars shared by the training phases
///
pub fn progress_common_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} (eta {eta}) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("##-")
}

///
/// Log the memory allocated by jemalloc and the resident memory (in bytes).
///
pub fn check_memory_usage() {
    if let Err(err) = jemalloc_ctl::epoch::advance() {
        warn!("[memory] cannot refresh jemalloc stats: {}", err);
        return;
    }
    match (
        jemalloc_ctl::stats::allocated::read(),
        jemalloc_ctl::stats::resident::read(),
    ) {
        (Ok(allocated), Ok(resident)) => info!("[memory] {} / {}", allocated, resident),
        _ => warn!("[memory] cannot read jemalloc stats"),
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_returns_the_value() {
        let (v, ms) = timer(|| (0..1000).sum::<u64>());
        assert_eq!(v, 499500);
        assert!(ms < 60_000);
    }

    #[test]
    fn memory_check_does_not_panic() {
        let v: Vec<u64> = (0..10_000).collect();
        check_memory_usage();
        assert_eq!(v.len(), 10_000);
    }
}
