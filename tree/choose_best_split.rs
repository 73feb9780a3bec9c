use crate::{
	bin_stats::{compute_bin_stats, compute_sum_targets, BinStats},
	BinnedFeatures,
};
use num_traits::ToPrimitive;
use rayon::prelude::*;

/// The best split found for a node. Examples whose bin index for `feature_index` is <= `bin_index` go to the left child.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChooseBestSplitOutput {
	pub feature_index: usize,
	pub bin_index: usize,
	/// This is always positive.
	pub gain: f64,
}

/// The best split found for a single feature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinSplit {
	pub bin_index: usize,
	pub gain: f64,
}

/**
Find the split with the highest gain over the features in `feature_indexes`, if a split with a positive gain exists.

Each feature is evaluated independently on the rayon thread pool. When two features reach the same gain, the one with the lower feature index wins, so the result does not depend on how the work was scheduled.
*/
pub fn choose_best_split(
	binned_features: &BinnedFeatures,
	targets: &[f32],
	examples_index: &[usize],
	feature_indexes: &[usize],
	min_examples_per_leaf: usize,
	#[cfg(feature = "timing")] timing: &crate::timing::Timing,
) -> Option<ChooseBestSplitOutput> {
	assert!(!examples_index.is_empty(), "cannot split an empty node");
	let sum_targets = compute_sum_targets(targets, examples_index);
	feature_indexes
		.par_iter()
		.filter_map(|feature_index| {
			#[cfg(feature = "timing")]
			let start = std::time::Instant::now();
			let bin_stats = compute_bin_stats(
				&binned_features.columns()[*feature_index],
				targets,
				examples_index,
				sum_targets,
			);
			#[cfg(feature = "timing")]
			timing.compute_bin_stats.record_since(start);
			choose_best_split_for_feature(&bin_stats, min_examples_per_leaf).map(
				|BinSplit { bin_index, gain }| ChooseBestSplitOutput {
					feature_index: *feature_index,
					bin_index,
					gain,
				},
			)
		})
		.reduce_with(|a, b| {
			if b.gain > a.gain || (b.gain == a.gain && b.feature_index < a.feature_index) {
				b
			} else {
				a
			}
		})
}

/**
Find the best split for a single feature by iterating over the bins in order, adding each bin to the left child and removing it from the right.

Splitting a node with squared error loss leaves the sum of the squared targets unchanged, so the loss is tracked only through the `-sum^2 / count` terms. The gain of a split is the parent's loss minus the sum of the children's losses. Only splits with a strictly positive gain are returned, and the lowest bin index wins a tie.
*/
pub fn choose_best_split_for_feature(
	bin_stats: &BinStats,
	min_examples_per_leaf: usize,
) -> Option<BinSplit> {
	let n_bins = bin_stats.entries.len();
	assert!(n_bins >= 1, "bin stats must have at least one bin");
	assert!(bin_stats.count > 0, "bin stats must have at least one example");
	let loss_parent = compute_loss(bin_stats.sum_targets, bin_stats.count);
	let mut best_split: Option<BinSplit> = None;
	let mut best_gain = 0.0;
	let mut left_count = 0;
	let mut left_sum_targets = 0.0;
	// The last bin is never a split point because it would send every example left.
	for (bin_index, entry) in bin_stats.entries[0..n_bins - 1].iter().enumerate() {
		left_count += entry.count;
		left_sum_targets += entry.sum_targets;
		let right_count = bin_stats.count - left_count;
		let right_sum_targets = bin_stats.sum_targets - left_sum_targets;
		if left_count < min_examples_per_leaf {
			continue;
		}
		// The right count only decreases from here on.
		if right_count < min_examples_per_leaf {
			break;
		}
		let loss_children = compute_loss(left_sum_targets, left_count)
			+ compute_loss(right_sum_targets, right_count);
		let gain = loss_parent - loss_children;
		if gain > best_gain {
			best_gain = gain;
			best_split = Some(BinSplit { bin_index, gain });
		}
	}
	best_split
}

#[inline(always)]
fn compute_loss(sum_targets: f64, count: usize) -> f64 {
	-sum_targets * sum_targets / count.to_f64().unwrap()
}

#[cfg(test)]
use crate::{bin_stats::BinStatsEntry, BinnedFeaturesColumn};

#[cfg(test)]
fn bin_stats_from(entries: &[(usize, f64)]) -> BinStats {
	let entries: Vec<BinStatsEntry> = entries
		.iter()
		.map(|(count, sum_targets)| BinStatsEntry {
			count: *count,
			sum_targets: *sum_targets,
		})
		.collect();
	BinStats {
		count: entries.iter().map(|entry| entry.count).sum(),
		sum_targets: entries.iter().map(|entry| entry.sum_targets).sum(),
		entries,
	}
}

#[test]
fn test_two_bins() {
	// Targets [1, 2] in bin 0 and [3, 10] in bin 1.
	let bin_stats = bin_stats_from(&[(2, 3.0), (2, 13.0)]);
	assert_eq!(
		choose_best_split_for_feature(&bin_stats, 1),
		Some(BinSplit {
			bin_index: 0,
			gain: 25.0,
		})
	);
}

#[test]
fn test_single_bin_never_splits() {
	let bin_stats = bin_stats_from(&[(10, 42.0)]);
	assert_eq!(choose_best_split_for_feature(&bin_stats, 1), None);
}

#[test]
fn test_min_examples_per_leaf() {
	let bin_stats = bin_stats_from(&[(2, 3.0), (2, 13.0)]);
	assert_eq!(choose_best_split_for_feature(&bin_stats, 3), None);
	// Only the middle split leaves 3 examples on each side.
	let bin_stats = bin_stats_from(&[(2, 0.0), (1, 0.0), (1, 10.0), (2, 10.0)]);
	let split = choose_best_split_for_feature(&bin_stats, 3).unwrap();
	assert_eq!(split.bin_index, 1);
	assert!(split.gain > 0.0);
}

#[test]
fn test_no_gain_is_no_split() {
	let bin_stats = bin_stats_from(&[(2, 2.0), (4, 4.0), (2, 2.0)]);
	assert_eq!(choose_best_split_for_feature(&bin_stats, 1), None);
}

#[test]
fn test_ties_keep_lowest_bin_index() {
	// Splitting after bin 0 or after bin 1 both give a gain of 48.
	let bin_stats = bin_stats_from(&[(2, 2.0), (2, 10.0), (2, 18.0), (0, 0.0)]);
	assert_eq!(
		choose_best_split_for_feature(&bin_stats, 2),
		Some(BinSplit {
			bin_index: 0,
			gain: 48.0,
		})
	);
}

#[test]
fn test_empty_trailing_bins_stop_the_scan() {
	let bin_stats = bin_stats_from(&[(3, 0.0), (3, 30.0), (0, 0.0), (0, 0.0)]);
	let split = choose_best_split_for_feature(&bin_stats, 3).unwrap();
	assert_eq!(split.bin_index, 0);
	assert_eq!(split.gain, 150.0);
}

#[test]
fn test_choose_best_split_across_features() {
	let binned_features = BinnedFeatures::new(
		4,
		vec![
			BinnedFeaturesColumn::Empty,
			BinnedFeaturesColumn::U8 {
				n_thresholds: 1,
				values: vec![0, 1, 0, 1],
			},
			BinnedFeaturesColumn::U16 {
				n_thresholds: 1,
				values: vec![0, 0, 1, 1],
			},
			BinnedFeaturesColumn::U8 {
				n_thresholds: 1,
				values: vec![0, 0, 1, 1],
			},
		],
	)
	.unwrap();
	let targets = [1.0, 2.0, 3.0, 10.0];
	let examples_index = [0, 1, 2, 3];
	#[cfg(feature = "timing")]
	let timing = crate::timing::Timing::new();
	// Features 2 and 3 are identical, so the lower feature index wins.
	assert_eq!(
		choose_best_split(
			&binned_features,
			&targets,
			&examples_index,
			&[1, 2, 3],
			1,
			#[cfg(feature = "timing")]
			&timing,
		),
		Some(ChooseBestSplitOutput {
			feature_index: 2,
			bin_index: 0,
			gain: 25.0,
		})
	);
	assert_eq!(
		choose_best_split(
			&binned_features,
			&targets,
			&examples_index,
			&[3, 1],
			1,
			#[cfg(feature = "timing")]
			&timing,
		),
		Some(ChooseBestSplitOutput {
			feature_index: 3,
			bin_index: 0,
			gain: 25.0,
		})
	);
	assert_eq!(
		choose_best_split(
			&binned_features,
			&targets,
			&examples_index,
			&[],
			1,
			#[cfg(feature = "timing")]
			&timing,
		),
		None
	);
}
