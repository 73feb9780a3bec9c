use crate::TrainTreeError;
use itertools::Itertools;

/**
This enum holds the binned values of a single feature.

A feature with `n_thresholds` thresholds has `n_thresholds + 1` bins, and each example's value is the index of the bin it fell into. For example, given the thresholds `[0.5, 1.5, 2]`, the bins will be:
0. (-infinity, 0.5]
1. (0.5, 1.5]
2. (1.5, 2]
3. (2, infinity)

Features with at most 256 bins are stored with one byte per example and larger features with two. `Empty` features hold no values, they are constant or unused and are never split on.
*/
#[derive(Clone, Debug)]
pub enum BinnedFeaturesColumn {
	Empty,
	U8 { n_thresholds: usize, values: Vec<u8> },
	U16 { n_thresholds: usize, values: Vec<u16> },
}

impl BinnedFeaturesColumn {
	pub fn n_thresholds(&self) -> usize {
		match self {
			Self::Empty => 0,
			Self::U8 { n_thresholds, .. } => *n_thresholds,
			Self::U16 { n_thresholds, .. } => *n_thresholds,
		}
	}

	pub fn n_bins(&self) -> usize {
		self.n_thresholds() + 1
	}

	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}

	/// Get the bin index for the example at `example_index`, or `None` if the feature is empty.
	pub fn bin_index(&self, example_index: usize) -> Option<usize> {
		match self {
			Self::Empty => None,
			Self::U8 { values, .. } => Some(values[example_index].into()),
			Self::U16 { values, .. } => Some(values[example_index].into()),
		}
	}

	/// The largest number of thresholds the column's value type can address.
	fn max_n_thresholds(&self) -> Option<usize> {
		match self {
			Self::Empty => None,
			Self::U8 { .. } => Some(usize::from(u8::MAX)),
			Self::U16 { .. } => Some(usize::from(u16::MAX)),
		}
	}

	fn n_values(&self) -> Option<usize> {
		match self {
			Self::Empty => None,
			Self::U8 { values, .. } => Some(values.len()),
			Self::U16 { values, .. } => Some(values.len()),
		}
	}

	fn find_bin_out_of_range(&self) -> Option<(usize, usize)> {
		let n_bins = self.n_bins();
		match self {
			Self::Empty => None,
			Self::U8 { values, .. } => values
				.iter()
				.map(|value| usize::from(*value))
				.find_position(|value| *value >= n_bins),
			Self::U16 { values, .. } => values
				.iter()
				.map(|value| usize::from(*value))
				.find_position(|value| *value >= n_bins),
		}
	}
}

/// The binned features of a dataset, one column per feature. This is shared read only by every tree trained on the dataset.
#[derive(Clone, Debug)]
pub struct BinnedFeatures {
	n_examples: usize,
	columns: Vec<BinnedFeaturesColumn>,
}

impl BinnedFeatures {
	/// Every non empty column must have `n_examples` values, each less than the column's number of bins, and no more bins than its value type can hold.
	pub fn new(
		n_examples: usize,
		columns: Vec<BinnedFeaturesColumn>,
	) -> Result<Self, TrainTreeError> {
		for (feature_index, column) in columns.iter().enumerate() {
			if let Some(max_n_thresholds) = column.max_n_thresholds() {
				if column.n_thresholds() > max_n_thresholds {
					return Err(TrainTreeError::TooManyBins {
						feature_index,
						n_thresholds: column.n_thresholds(),
						max_n_thresholds,
					});
				}
			}
			if let Some(n_values) = column.n_values() {
				if n_values != n_examples {
					return Err(TrainTreeError::ColumnLengthMismatch {
						feature_index,
						n_values,
						n_examples,
					});
				}
			}
			if let Some((example_index, bin_index)) = column.find_bin_out_of_range() {
				return Err(TrainTreeError::BinOutOfRange {
					feature_index,
					example_index,
					bin_index,
					n_bins: column.n_bins(),
				});
			}
		}
		Ok(Self {
			n_examples,
			columns,
		})
	}

	pub fn n_examples(&self) -> usize {
		self.n_examples
	}

	pub fn n_features(&self) -> usize {
		self.columns.len()
	}

	pub fn columns(&self) -> &[BinnedFeaturesColumn] {
		&self.columns
	}
}

#[test]
fn test_n_bins() {
	let column = BinnedFeaturesColumn::U8 {
		n_thresholds: 3,
		values: vec![0, 3],
	};
	assert_eq!(column.n_bins(), 4);
	assert_eq!(column.bin_index(1), Some(3));
	assert_eq!(BinnedFeaturesColumn::Empty.n_bins(), 1);
	assert_eq!(BinnedFeaturesColumn::Empty.bin_index(0), None);
	assert!(BinnedFeaturesColumn::Empty.is_empty());
}

#[test]
fn test_column_length_mismatch() {
	let result = BinnedFeatures::new(
		3,
		vec![
			BinnedFeaturesColumn::Empty,
			BinnedFeaturesColumn::U16 {
				n_thresholds: 1,
				values: vec![0, 1],
			},
		],
	);
	assert_eq!(
		result.unwrap_err(),
		TrainTreeError::ColumnLengthMismatch {
			feature_index: 1,
			n_values: 2,
			n_examples: 3,
		}
	);
}

#[test]
fn test_bin_out_of_range() {
	let result = BinnedFeatures::new(
		3,
		vec![BinnedFeaturesColumn::U8 {
			n_thresholds: 1,
			values: vec![0, 1, 2],
		}],
	);
	assert_eq!(
		result.unwrap_err(),
		TrainTreeError::BinOutOfRange {
			feature_index: 0,
			example_index: 2,
			bin_index: 2,
			n_bins: 2,
		}
	);
}

#[test]
fn test_too_many_bins() {
	let result = BinnedFeatures::new(
		1,
		vec![BinnedFeaturesColumn::U8 {
			n_thresholds: 100_000,
			values: vec![0],
		}],
	);
	assert_eq!(
		result.unwrap_err(),
		TrainTreeError::TooManyBins {
			feature_index: 0,
			n_thresholds: 100_000,
			max_n_thresholds: 255,
		}
	);
	// This would overflow when counting the bins.
	let result = BinnedFeatures::new(
		1,
		vec![
			BinnedFeaturesColumn::Empty,
			BinnedFeaturesColumn::U16 {
				n_thresholds: usize::MAX,
				values: vec![0],
			},
		],
	);
	assert_eq!(
		result.unwrap_err(),
		TrainTreeError::TooManyBins {
			feature_index: 1,
			n_thresholds: usize::MAX,
			max_n_thresholds: 65535,
		}
	);
	// Each value type can address every one of its bins.
	let binned_features = BinnedFeatures::new(
		1,
		vec![
			BinnedFeaturesColumn::U8 {
				n_thresholds: 255,
				values: vec![255],
			},
			BinnedFeaturesColumn::U16 {
				n_thresholds: 65535,
				values: vec![65535],
			},
		],
	)
	.unwrap();
	assert_eq!(binned_features.columns()[0].n_bins(), 256);
	assert_eq!(binned_features.columns()[1].n_bins(), 65536);
	let result = BinnedFeatures::new(
		1,
		vec![BinnedFeaturesColumn::U16 {
			n_thresholds: 65536,
			values: vec![0],
		}],
	);
	assert!(matches!(
		result,
		Err(TrainTreeError::TooManyBins {
			max_n_thresholds: 65535,
			..
		})
	));
}
