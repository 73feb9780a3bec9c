use crate::BinnedFeaturesColumn;

/// Split the `examples_index` of a node into the examples index for its left child and the examples index for its right child. Examples whose bin index is <= `bin_index` go left. Both children keep the examples in the order they appear in `examples_index`.
pub fn rearrange_examples_index(
	binned_feature: &BinnedFeaturesColumn,
	bin_index: usize,
	examples_index: &[usize],
) -> (Vec<usize>, Vec<usize>) {
	match binned_feature {
		BinnedFeaturesColumn::U8 { values, .. } => {
			rearrange_examples_index_for_feature(values, bin_index, examples_index)
		}
		BinnedFeaturesColumn::U16 { values, .. } => {
			rearrange_examples_index_for_feature(values, bin_index, examples_index)
		}
		BinnedFeaturesColumn::Empty => unreachable!("empty features are never split on"),
	}
}

fn rearrange_examples_index_for_feature<T>(
	binned_feature_values: &[T],
	bin_index: usize,
	examples_index: &[usize],
) -> (Vec<usize>, Vec<usize>)
where
	T: Copy + Into<usize>,
{
	examples_index.iter().partition(|example_index| {
		let example_bin_index: usize = binned_feature_values[**example_index].into();
		example_bin_index <= bin_index
	})
}

#[test]
fn test_rearrange_examples_index() {
	let binned_feature = BinnedFeaturesColumn::U8 {
		n_thresholds: 3,
		values: vec![3, 0, 2, 1, 1, 0, 3, 2],
	};
	let examples_index = [7, 6, 5, 4, 3, 2, 1];
	let (left, right) = rearrange_examples_index(&binned_feature, 1, &examples_index);
	assert_eq!(left, vec![5, 4, 3, 1]);
	assert_eq!(right, vec![7, 6, 2]);
}

#[test]
fn test_rearrange_examples_index_matches_bin_stats() {
	let binned_feature = BinnedFeaturesColumn::U16 {
		n_thresholds: 2,
		values: vec![0, 1, 2, 2, 1, 0, 2],
	};
	let targets = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0];
	let examples_index = [6, 0, 1, 2, 3, 4, 5];
	let sum_targets = crate::bin_stats::compute_sum_targets(&targets, &examples_index);
	let bin_stats =
		crate::bin_stats::compute_bin_stats(&binned_feature, &targets, &examples_index, sum_targets);
	let mut left_count = 0;
	let mut left_sum_targets = 0.0;
	for (bin_index, entry) in bin_stats.entries.iter().enumerate() {
		left_count += entry.count;
		left_sum_targets += entry.sum_targets;
		// The left child holds exactly the examples counted in bins 0 through `bin_index`.
		let (left, right) = rearrange_examples_index(&binned_feature, bin_index, &examples_index);
		assert_eq!(left.len(), left_count);
		assert_eq!(right.len(), bin_stats.count - left_count);
		assert_eq!(
			crate::bin_stats::compute_sum_targets(&targets, &left),
			left_sum_targets
		);
	}
	// The last bin sends everything left.
	assert_eq!(left_count, examples_index.len());
}
