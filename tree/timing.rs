use std::convert::TryFrom;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cumulative time spent in each phase of training, across every tree a `TreeRegressor` trains. Bin stats are computed on the rayon thread pool, so `compute_bin_stats` is the sum over every thread and can exceed `choose_best_split`.
#[derive(Debug, Default)]
pub struct Timing {
	pub sample_examples: TimingDuration,
	pub compute_bin_stats: TimingDuration,
	pub choose_best_split: TimingDuration,
	pub rearrange_examples_index: TimingDuration,
	pub export_tree: TimingDuration,
	pub train_tree: TimingDuration,
}

impl Timing {
	pub fn new() -> Timing {
		Timing::default()
	}
}

/// A duration in nanoseconds that can be added to from any thread.
#[derive(Default)]
pub struct TimingDuration {
	nanos: AtomicU64,
}

impl TimingDuration {
	pub fn total(&self) -> Duration {
		Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
	}

	pub fn add(&self, duration: Duration) {
		let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
		self.nanos.fetch_add(nanos, Ordering::Relaxed);
	}

	/// Add the time elapsed since `start`.
	pub fn record_since(&self, start: Instant) {
		self.add(start.elapsed());
	}
}

impl std::fmt::Debug for TimingDuration {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:.3}ms", self.total().as_secs_f64() * 1000.0)
	}
}

#[test]
fn test_timing_duration() {
	let duration = TimingDuration::default();
	duration.add(Duration::from_millis(2));
	duration.add(Duration::from_millis(3));
	assert_eq!(duration.total(), Duration::from_millis(5));
	assert_eq!(format!("{:?}", duration), "5.000ms");
}

#[test]
fn test_record_since() {
	let timing = Timing::new();
	let start = Instant::now();
	timing.compute_bin_stats.record_since(start);
	timing.compute_bin_stats.record_since(start);
	assert!(timing.compute_bin_stats.total() >= Duration::from_nanos(0));
	assert_eq!(timing.export_tree.total(), Duration::from_nanos(0));
}
