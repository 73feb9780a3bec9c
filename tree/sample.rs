use crate::BinnedFeaturesColumn;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

/// The `Sampler` decides which examples each tree is trained on and which features each node considers splitting on.
pub struct Sampler {
	rng: Xoshiro256Plus,
}

impl Sampler {
	pub fn new(seed: Option<u64>) -> Self {
		let rng = match seed {
			Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
			None => Xoshiro256Plus::from_entropy(),
		};
		Self { rng }
	}

	/// Return true with probability `probability_of_true`. A probability of 0 is never true and a probability of 1 is always true.
	pub fn biased_coin_flip(&mut self, probability_of_true: f64) -> bool {
		self.rng.gen::<f64>() < probability_of_true
	}

	/// Choose the examples to train a tree on. Each example is kept with probability `example_sampling_rate`, and the kept examples are returned in increasing order.
	pub fn sample_examples(&mut self, n_examples: usize, example_sampling_rate: f64) -> Vec<usize> {
		(0..n_examples)
			.filter(|_| self.biased_coin_flip(example_sampling_rate))
			.collect()
	}

	/// Choose the features a node will consider splitting on. Empty features are never chosen and do not consume a coin flip.
	pub fn sample_features(
		&mut self,
		columns: &[BinnedFeaturesColumn],
		feature_sampling_rate: f64,
	) -> Vec<usize> {
		columns
			.iter()
			.enumerate()
			.filter(|(_, column)| !column.is_empty())
			.map(|(feature_index, _)| feature_index)
			.filter(|_| self.biased_coin_flip(feature_sampling_rate))
			.collect()
	}
}

#[cfg(test)]
fn test_columns() -> Vec<BinnedFeaturesColumn> {
	vec![
		BinnedFeaturesColumn::U8 {
			n_thresholds: 1,
			values: vec![0, 1],
		},
		BinnedFeaturesColumn::Empty,
		BinnedFeaturesColumn::U16 {
			n_thresholds: 1,
			values: vec![1, 0],
		},
	]
}

#[test]
fn test_sampling_rate_bounds() {
	let mut sampler = Sampler::new(Some(0));
	assert_eq!(sampler.sample_examples(100, 1.0), (0..100).collect::<Vec<_>>());
	assert!(sampler.sample_examples(100, 0.0).is_empty());
	let columns = test_columns();
	assert_eq!(sampler.sample_features(&columns, 1.0), vec![0, 2]);
	assert!(sampler.sample_features(&columns, 0.0).is_empty());
}

#[test]
fn test_sample_examples_rate() {
	let mut sampler = Sampler::new(Some(1));
	let n_sampled = sampler.sample_examples(10_000, 0.25).len();
	assert!(n_sampled > 2_000 && n_sampled < 3_000, "{}", n_sampled);
}

#[test]
fn test_seeded_samplers_agree() {
	let mut a = Sampler::new(Some(7));
	let mut b = Sampler::new(Some(7));
	assert_eq!(a.sample_examples(1000, 0.5), b.sample_examples(1000, 0.5));
	let columns = test_columns();
	for _ in 0..10 {
		assert_eq!(
			a.sample_features(&columns, 0.5),
			b.sample_features(&columns, 0.5)
		);
	}
}

#[test]
fn test_features_are_resampled_on_every_call() {
	let mut columns: Vec<BinnedFeaturesColumn> = (0..8)
		.map(|_| BinnedFeaturesColumn::U8 {
			n_thresholds: 1,
			values: vec![0, 1],
		})
		.collect();
	columns.insert(3, BinnedFeaturesColumn::Empty);
	let mut sampler = Sampler::new(Some(3));
	let samples: Vec<Vec<usize>> = (0..20)
		.map(|_| sampler.sample_features(&columns, 0.5))
		.collect();
	let distinct: std::collections::HashSet<&Vec<usize>> = samples.iter().collect();
	assert!(distinct.len() > 1, "{:?}", samples);
	for sample in samples.iter() {
		assert!(!sample.contains(&3));
	}
}
