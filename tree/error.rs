use thiserror::Error;

/// The errors returned when a dataset or a call to train a tree is invalid. Nothing is trained when one of these is returned.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TrainTreeError {
	#[error("the number of leaves must be at least 1")]
	InvalidNumLeaves,
	#[error("{name} must be between 0 and 1, got {value}")]
	InvalidSamplingRate { name: &'static str, value: f64 },
	#[error("the minimum number of examples per leaf must be at least 1")]
	InvalidMinExamplesPerLeaf,
	#[error("expected {n_examples} targets, got {n_targets}")]
	TargetsLengthMismatch { n_targets: usize, n_examples: usize },
	#[error("expected {n_features} feature importances, got {n_feature_importances}")]
	FeatureImportancesLengthMismatch {
		n_feature_importances: usize,
		n_features: usize,
	},
	#[error("sampled {n_sampled} examples but at least {n_required} are required")]
	TooFewExamples { n_sampled: usize, n_required: usize },
	#[error("feature {feature_index} has {n_values} values but the dataset has {n_examples} examples")]
	ColumnLengthMismatch {
		feature_index: usize,
		n_values: usize,
		n_examples: usize,
	},
	#[error("feature {feature_index} has {n_thresholds} thresholds but its values can address at most {max_n_thresholds}")]
	TooManyBins {
		feature_index: usize,
		n_thresholds: usize,
		max_n_thresholds: usize,
	},
	#[error("feature {feature_index} has bin index {bin_index} for example {example_index} but only {n_bins} bins")]
	BinOutOfRange {
		feature_index: usize,
		example_index: usize,
		bin_index: usize,
		n_bins: usize,
	},
}
