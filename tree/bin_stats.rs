use crate::BinnedFeaturesColumn;
use num_traits::ToPrimitive;

/// `BinStats` hold, for one feature, the number of examples in a node that fell into each bin and the sum of their targets.
#[derive(Clone, Debug, PartialEq)]
pub struct BinStats {
	pub entries: Vec<BinStatsEntry>,
	/// The number of examples in the node.
	pub count: usize,
	/// The sum of the targets of all of the examples in the node.
	pub sum_targets: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BinStatsEntry {
	pub count: usize,
	pub sum_targets: f64,
}

/// Sum the targets of the examples in a node. This does not depend on the feature, so it is computed once per node and passed to `compute_bin_stats` for each feature.
pub fn compute_sum_targets(targets: &[f32], examples_index: &[usize]) -> f64 {
	examples_index
		.iter()
		.map(|example_index| targets[*example_index].to_f64().unwrap())
		.sum()
}

/// Compute the bin stats for a single feature over the examples in `examples_index`.
pub fn compute_bin_stats(
	binned_feature: &BinnedFeaturesColumn,
	targets: &[f32],
	examples_index: &[usize],
	sum_targets: f64,
) -> BinStats {
	let mut entries = vec![BinStatsEntry::default(); binned_feature.n_bins()];
	match binned_feature {
		BinnedFeaturesColumn::U8 { values, .. } => {
			compute_bin_stats_for_feature(&mut entries, values, targets, examples_index)
		}
		BinnedFeaturesColumn::U16 { values, .. } => {
			compute_bin_stats_for_feature(&mut entries, values, targets, examples_index)
		}
		BinnedFeaturesColumn::Empty => unreachable!("empty features are never sampled"),
	}
	BinStats {
		entries,
		count: examples_index.len(),
		sum_targets,
	}
}

fn compute_bin_stats_for_feature<T>(
	entries: &mut [BinStatsEntry],
	binned_feature_values: &[T],
	targets: &[f32],
	examples_index: &[usize],
) where
	T: Copy + Into<usize>,
{
	for example_index in examples_index {
		let bin_index: usize = binned_feature_values[*example_index].into();
		let entry = &mut entries[bin_index];
		entry.count += 1;
		entry.sum_targets += targets[*example_index].to_f64().unwrap();
	}
}

#[test]
fn test_compute_bin_stats() {
	let binned_feature = BinnedFeaturesColumn::U8 {
		n_thresholds: 1,
		values: vec![0, 0, 1, 1],
	};
	let targets = [1.0, 2.0, 3.0, 10.0];
	let examples_index = [0, 1, 2, 3];
	let sum_targets = compute_sum_targets(&targets, &examples_index);
	let bin_stats = compute_bin_stats(&binned_feature, &targets, &examples_index, sum_targets);
	assert_eq!(
		bin_stats,
		BinStats {
			entries: vec![
				BinStatsEntry {
					count: 2,
					sum_targets: 3.0,
				},
				BinStatsEntry {
					count: 2,
					sum_targets: 13.0,
				},
			],
			count: 4,
			sum_targets: 16.0,
		}
	);
}

#[test]
fn test_bin_stats_conserve_counts_and_sums() {
	let values: Vec<u16> = (0..500).map(|i| (i * 7 % 300) as u16).collect();
	let binned_feature = BinnedFeaturesColumn::U16 {
		n_thresholds: 299,
		values,
	};
	let targets: Vec<f32> = (0..500).map(|i| (i as f32).sin() * 3.0).collect();
	let examples_index: Vec<usize> = (0..500).filter(|i| i % 3 != 0).collect();
	let sum_targets = compute_sum_targets(&targets, &examples_index);
	let bin_stats = compute_bin_stats(&binned_feature, &targets, &examples_index, sum_targets);
	assert_eq!(bin_stats.entries.len(), 300);
	let count: usize = bin_stats.entries.iter().map(|entry| entry.count).sum();
	assert_eq!(count, examples_index.len());
	assert_eq!(bin_stats.count, examples_index.len());
	let sum: f64 = bin_stats.entries.iter().map(|entry| entry.sum_targets).sum();
	assert!((sum - sum_targets).abs() < 1e-9);
}
