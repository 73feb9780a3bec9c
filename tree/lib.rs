/*!
This crate grows a single regression tree for use as the base learner of a gradient boosting ensemble. Features are expected to be binned ahead of time into small integer codes. Given those binned features and a target value for each example, usually the residuals of the ensemble so far, [`TreeRegressor::train_tree`](struct.TreeRegressor.html#method.train_tree) grows a tree best first: the leaf whose best split has the highest gain is split next, until the requested number of leaves is reached or no leaf can be split with a positive gain.

```
use boosting_tree::{BinnedFeatures, BinnedFeaturesColumn, LeastSquares, TrainOptions, TreeRegressor};

let binned_features = BinnedFeatures::new(
	4,
	vec![BinnedFeaturesColumn::U8 {
		n_thresholds: 1,
		values: vec![0, 0, 1, 1],
	}],
)
.unwrap();
let targets = vec![1.0, 2.0, 3.0, 10.0];
let options = TrainOptions {
	min_examples_per_leaf: 1,
	..Default::default()
};
let mut regressor = TreeRegressor::new(&binned_features, &targets, LeastSquares, options).unwrap();
let mut feature_importances = vec![0.0; binned_features.n_features()];
let tree = regressor
	.train_tree(2, 1.0, 1.0, &mut feature_importances)
	.unwrap();
assert_eq!(tree.n_leaves(), 2);
assert_eq!(feature_importances, vec![25.0]);
```
*/

#![allow(clippy::tabs_in_doc_comments)]

mod bin_stats;
mod binning;
mod choose_best_split;
mod error;
mod examples_index;
mod export;
mod leaf_value;
mod sample;
mod split_nodes;
#[cfg(feature = "timing")]
mod timing;
mod train_tree;

pub use self::binning::{BinnedFeatures, BinnedFeaturesColumn};
pub use self::error::TrainTreeError;
pub use self::leaf_value::{LeafValue, LeastAbsoluteDeviation, LeastSquares};
pub use self::train_tree::TreeRegressor;
use ndarray::prelude::*;

/// These are the options passed to `TreeRegressor::new`. They apply to every tree the regressor trains.
#[derive(Clone, Debug)]
pub struct TrainOptions {
	/// A split will only be considered valid if the number of training examples sent to each of the resulting children is at least this value. This must be at least 1.
	pub min_examples_per_leaf: usize,
	/// The seed for sampling examples and features. If it is `None`, the sampler is seeded from the operating system and trees will differ from run to run whenever a sampling rate is below 1.
	pub seed: Option<u64>,
}

impl Default for TrainOptions {
	fn default() -> Self {
		Self {
			min_examples_per_leaf: 256,
			seed: None,
		}
	}
}

/// Trees are stored as a `Vec` of `Node`s. The root is always at index 0. Each branch in the tree has two indexes into the `Vec`, one for each of its children.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

impl Tree {
	/// Make a prediction for the example at `example_index` in `binned_features`.
	///
	/// `binned_features` must have the same columns, in the same order, as the dataset the tree was trained on. This function panics if it has fewer features than a branch's `feature_index` requires or fewer than `example_index + 1` examples. If a branch's feature is `Empty` in `binned_features`, the example is sent left without an error.
	pub fn predict(&self, binned_features: &BinnedFeatures, example_index: usize) -> f32 {
		// Start at the root node.
		let mut node_index = 0;
		// Traverse the tree until we get to a leaf.
		loop {
			match &self.nodes[node_index] {
				Node::Branch(BranchNode {
					feature_index,
					bin_index,
					left_child_index,
					right_child_index,
					..
				}) => {
					let example_bin_index = binned_features.columns()[*feature_index]
						.bin_index(example_index)
						.unwrap_or(0);
					node_index = if example_bin_index <= *bin_index {
						*left_child_index
					} else {
						*right_child_index
					};
				}
				// We made it to a leaf! The prediction is the leaf's value.
				Node::Leaf(LeafNode { value, .. }) => return *value,
			}
		}
	}

	/// Make a prediction for every example in `binned_features`. `predictions` must not be longer than the number of examples, and the same panics as `predict` apply.
	pub fn predict_many(&self, binned_features: &BinnedFeatures, mut predictions: ArrayViewMut1<f32>) {
		for (example_index, prediction) in predictions.iter_mut().enumerate() {
			*prediction = self.predict(binned_features, example_index);
		}
	}

	pub fn n_leaves(&self) -> usize {
		self.nodes
			.iter()
			.filter(|node| matches!(node, Node::Leaf(_)))
			.count()
	}

	pub fn n_branches(&self) -> usize {
		self.nodes.len() - self.n_leaves()
	}

	/// The number of edges on the longest path from the root to a leaf.
	pub fn depth(&self) -> usize {
		self.depth_from(0)
	}

	fn depth_from(&self, node_index: usize) -> usize {
		match &self.nodes[node_index] {
			Node::Branch(BranchNode {
				left_child_index,
				right_child_index,
				..
			}) => {
				1 + usize::max(
					self.depth_from(*left_child_index),
					self.depth_from(*right_child_index),
				)
			}
			Node::Leaf(_) => 0,
		}
	}
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

impl Node {
	pub fn as_branch_mut(&mut self) -> Option<&mut BranchNode> {
		match self {
			Node::Branch(branch) => Some(branch),
			_ => None,
		}
	}

	pub fn examples_count(&self) -> usize {
		match self {
			Self::Branch(BranchNode { examples_count, .. }) => *examples_count,
			Self::Leaf(LeafNode { examples_count, .. }) => *examples_count,
		}
	}
}

/// A `BranchNode` sends an example to its left child if the example's bin index for `feature_index` is <= `bin_index`, and to its right child otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchNode {
	/// This is the index of the feature to get the bin index for.
	pub feature_index: usize,
	/// This is the largest bin index sent to the left child.
	pub bin_index: usize,
	/// This is the value the node would output if it were a leaf. It is not used when making predictions.
	pub value: f32,
	/// This is the index in the tree's node vector for this node's left child.
	pub left_child_index: usize,
	/// This is the index in the tree's node vector for this node's right child.
	pub right_child_index: usize,
	/// The number of sampled training examples that passed through this node.
	pub examples_count: usize,
}

/// The leaves in a tree hold the values to output for examples that get sent to them.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafNode {
	/// This is the value to output.
	pub value: f32,
	/// The number of sampled training examples that were sent to this leaf.
	pub examples_count: usize,
}

#[cfg(test)]
fn test_tree() -> Tree {
	Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				feature_index: 1,
				bin_index: 0,
				value: 2.0,
				left_child_index: 1,
				right_child_index: 2,
				examples_count: 4,
			}),
			Node::Leaf(LeafNode {
				value: -1.0,
				examples_count: 2,
			}),
			Node::Leaf(LeafNode {
				value: 5.0,
				examples_count: 2,
			}),
		],
	}
}

#[test]
fn test_predict() {
	let binned_features = BinnedFeatures::new(
		4,
		vec![
			BinnedFeaturesColumn::Empty,
			BinnedFeaturesColumn::U16 {
				n_thresholds: 2,
				values: vec![0, 1, 2, 0],
			},
		],
	)
	.unwrap();
	let tree = test_tree();
	assert_eq!(tree.predict(&binned_features, 0), -1.0);
	assert_eq!(tree.predict(&binned_features, 1), 5.0);
	assert_eq!(tree.predict(&binned_features, 2), 5.0);
	let mut predictions: Array1<f32> = Array::zeros(4);
	tree.predict_many(&binned_features, predictions.view_mut());
	assert_eq!(predictions, arr1(&[-1.0, 5.0, 5.0, -1.0]));
}

#[test]
fn test_predict_empty_feature_goes_left() {
	let binned_features =
		BinnedFeatures::new(1, vec![BinnedFeaturesColumn::Empty, BinnedFeaturesColumn::Empty])
			.unwrap();
	assert_eq!(test_tree().predict(&binned_features, 0), -1.0);
}

#[test]
#[should_panic]
fn test_predict_too_few_features() {
	// The branch splits on feature 1, which this dataset does not have.
	let binned_features = BinnedFeatures::new(
		1,
		vec![BinnedFeaturesColumn::U8 {
			n_thresholds: 1,
			values: vec![0],
		}],
	)
	.unwrap();
	test_tree().predict(&binned_features, 0);
}

#[test]
fn test_tree_shape() {
	let tree = test_tree();
	assert_eq!(tree.n_leaves(), 2);
	assert_eq!(tree.n_branches(), 1);
	assert_eq!(tree.depth(), 1);
	assert_eq!(tree.nodes[0].examples_count(), 4);
	let leaf = Tree {
		nodes: vec![Node::Leaf(LeafNode {
			value: 0.0,
			examples_count: 10,
		})],
	};
	assert_eq!(leaf.depth(), 0);
	assert_eq!(leaf.n_branches(), 0);
}
