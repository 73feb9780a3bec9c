use crate::{
	choose_best_split::{choose_best_split, ChooseBestSplitOutput},
	examples_index::rearrange_examples_index,
	export::export_tree,
	sample::Sampler,
	split_nodes::{SplitNode, SplitNodeId, SplitNodes},
	BinnedFeatures, LeafValue, TrainOptions, TrainTreeError, Tree,
};

/// A `TreeRegressor` trains regression trees on a dataset of binned features and a vector of targets, usually the residuals of a boosting round. Each call to `train_tree` trains one tree on a fresh sample of the examples.
pub struct TreeRegressor<'a, L> {
	binned_features: &'a BinnedFeatures,
	targets: &'a [f32],
	leaf_value: L,
	options: TrainOptions,
	sampler: Sampler,
	#[cfg(feature = "timing")]
	timing: crate::timing::Timing,
}

impl<'a, L> TreeRegressor<'a, L>
where
	L: LeafValue,
{
	pub fn new(
		binned_features: &'a BinnedFeatures,
		targets: &'a [f32],
		leaf_value: L,
		options: TrainOptions,
	) -> Result<Self, TrainTreeError> {
		if targets.len() != binned_features.n_examples() {
			return Err(TrainTreeError::TargetsLengthMismatch {
				n_targets: targets.len(),
				n_examples: binned_features.n_examples(),
			});
		}
		if options.min_examples_per_leaf == 0 {
			return Err(TrainTreeError::InvalidMinExamplesPerLeaf);
		}
		let sampler = Sampler::new(options.seed);
		Ok(Self {
			binned_features,
			targets,
			leaf_value,
			options,
			sampler,
			#[cfg(feature = "timing")]
			timing: crate::timing::Timing::new(),
		})
	}

	/// Train a tree with at most `n_leaves` leaves.
	///
	/// Each example is used with probability `example_sampling_rate`, and each node considers each feature with probability `feature_sampling_rate`. The gain of every split in the tree is added to `feature_importances`, which must have one entry per feature and is not reset.
	///
	/// If `n_leaves` is 1 and the root has a split with a positive gain, the root is still split and the tree has two leaves.
	pub fn train_tree(
		&mut self,
		n_leaves: usize,
		example_sampling_rate: f64,
		feature_sampling_rate: f64,
		feature_importances: &mut [f64],
	) -> Result<Tree, TrainTreeError> {
		if n_leaves == 0 {
			return Err(TrainTreeError::InvalidNumLeaves);
		}
		check_sampling_rate("example_sampling_rate", example_sampling_rate)?;
		check_sampling_rate("feature_sampling_rate", feature_sampling_rate)?;
		if feature_importances.len() != self.binned_features.n_features() {
			return Err(TrainTreeError::FeatureImportancesLengthMismatch {
				n_feature_importances: feature_importances.len(),
				n_features: self.binned_features.n_features(),
			});
		}
		#[cfg(feature = "timing")]
		let train_tree_start = std::time::Instant::now();

		#[cfg(feature = "timing")]
		let start = std::time::Instant::now();
		let examples_index = self
			.sampler
			.sample_examples(self.binned_features.n_examples(), example_sampling_rate);
		#[cfg(feature = "timing")]
		self.timing.sample_examples.record_since(start);
		let n_required = self.options.min_examples_per_leaf.saturating_mul(n_leaves);
		log::debug!(
			"sampled {} of {} examples",
			examples_index.len(),
			self.binned_features.n_examples()
		);
		if examples_index.len() < n_required {
			return Err(TrainTreeError::TooFewExamples {
				n_sampled: examples_index.len(),
				n_required,
			});
		}

		let (split_nodes, root) = self.grow(examples_index, n_leaves - 1, feature_sampling_rate);

		#[cfg(feature = "timing")]
		let start = std::time::Instant::now();
		let tree = export_tree(
			&split_nodes,
			root,
			self.targets,
			&self.leaf_value,
			self.options.min_examples_per_leaf,
			feature_importances,
		);
		#[cfg(feature = "timing")]
		{
			self.timing.export_tree.record_since(start);
			self.timing.train_tree.record_since(train_tree_start);
			log::debug!("{:?}", self.timing);
		}
		Ok(tree)
	}

	/// Grow a tree best first from the examples in `examples_index`, splitting at most `n_splits` nodes, except that the root may be split when `n_splits` is 0. Return the arena holding every node created and the id of the root.
	fn grow(
		&mut self,
		examples_index: Vec<usize>,
		n_splits: usize,
		feature_sampling_rate: f64,
	) -> (SplitNodes, SplitNodeId) {
		let mut split_nodes = SplitNodes::new();
		// The frontier holds the leaves that may still be split, in the order they were created.
		let mut frontier: Vec<SplitNodeId> = Vec::new();
		let root = self.add_split_node(
			&mut split_nodes,
			&mut frontier,
			examples_index,
			feature_sampling_rate,
			false,
		);
		let mut n_selected = 0;
		loop {
			// Every split replaces one leaf in the frontier with two.
			assert_eq!(
				frontier.len(),
				n_selected + 1,
				"the frontier must have one more node than the number of splits"
			);

			// Find the node in the frontier whose split has the highest gain. Ties go to the node added to the frontier first.
			let mut best: Option<(usize, ChooseBestSplitOutput)> = None;
			for (position, id) in frontier.iter().enumerate() {
				if let Some(split) = split_nodes[*id].split {
					let best_gain = best.map_or(0.0, |(_, best_split)| best_split.gain);
					if split.gain > best_gain {
						best = Some((position, split));
					}
				}
			}
			// If no node in the frontier has a split with a positive gain, the tree is done.
			let (position, split) = match best {
				Some(best) => best,
				None => break,
			};
			let id = frontier.remove(position);
			n_selected += 1;
			log::debug!(
				"selected split {} of {}: feature {} at bin {}, gain: {}",
				n_selected,
				n_splits,
				split.feature_index,
				split.bin_index,
				split.gain,
			);

			#[cfg(feature = "timing")]
			let start = std::time::Instant::now();
			let (left_examples_index, right_examples_index) = rearrange_examples_index(
				&self.binned_features.columns()[split.feature_index],
				split.bin_index,
				&split_nodes[id].examples_index,
			);
			#[cfg(feature = "timing")]
			self.timing.rearrange_examples_index.record_since(start);

			// The children of the last allowed split are leaves and do not need splits of their own.
			let terminal = n_selected == n_splits;
			let left = self.add_split_node(
				&mut split_nodes,
				&mut frontier,
				left_examples_index,
				feature_sampling_rate,
				terminal,
			);
			let right = self.add_split_node(
				&mut split_nodes,
				&mut frontier,
				right_examples_index,
				feature_sampling_rate,
				terminal,
			);
			split_nodes.set_children(id, left, right);

			if n_selected >= n_splits {
				break;
			}
		}
		(split_nodes, root)
	}

	/// Create a node for the examples in `examples_index` and add it to the arena. Unless the node is `terminal`, find its best split over a fresh sample of the features and add it to the frontier.
	fn add_split_node(
		&mut self,
		split_nodes: &mut SplitNodes,
		frontier: &mut Vec<SplitNodeId>,
		examples_index: Vec<usize>,
		feature_sampling_rate: f64,
		terminal: bool,
	) -> SplitNodeId {
		if terminal {
			return split_nodes.push(SplitNode {
				examples_index,
				split: None,
				children: None,
			});
		}
		let feature_indexes = self
			.sampler
			.sample_features(self.binned_features.columns(), feature_sampling_rate);
		#[cfg(feature = "timing")]
		let start = std::time::Instant::now();
		let split = choose_best_split(
			self.binned_features,
			self.targets,
			&examples_index,
			&feature_indexes,
			self.options.min_examples_per_leaf,
			#[cfg(feature = "timing")]
			&self.timing,
		);
		#[cfg(feature = "timing")]
		self.timing.choose_best_split.record_since(start);
		let id = split_nodes.push(SplitNode {
			examples_index,
			split,
			children: None,
		});
		frontier.push(id);
		id
	}
}

fn check_sampling_rate(name: &'static str, value: f64) -> Result<(), TrainTreeError> {
	if (0.0..=1.0).contains(&value) {
		Ok(())
	} else {
		Err(TrainTreeError::InvalidSamplingRate { name, value })
	}
}

#[cfg(test)]
use crate::{BinnedFeaturesColumn, BranchNode, LeafNode, LeastSquares, Node};
#[cfg(test)]
use rand::{Rng, SeedableRng};
#[cfg(test)]
use rand_xoshiro::Xoshiro256Plus;

/// A single feature with four bins and two examples in each bin.
#[cfg(test)]
fn staircase() -> (BinnedFeatures, Vec<f32>) {
	let binned_features = BinnedFeatures::new(
		8,
		vec![BinnedFeaturesColumn::U8 {
			n_thresholds: 3,
			values: vec![0, 0, 1, 1, 2, 2, 3, 3],
		}],
	)
	.unwrap();
	let targets = vec![1.0, 1.0, 5.0, 5.0, 9.0, 9.0, 20.0, 20.0];
	(binned_features, targets)
}

#[cfg(test)]
fn staircase_options() -> TrainOptions {
	TrainOptions {
		min_examples_per_leaf: 2,
		seed: Some(0),
	}
}

/// A larger random dataset with an empty feature, a one byte feature and a two byte feature.
#[cfg(test)]
fn random_dataset(n_examples: usize, seed: u64) -> (BinnedFeatures, Vec<f32>) {
	let mut rng = Xoshiro256Plus::seed_from_u64(seed);
	let small: Vec<u8> = (0..n_examples).map(|_| rng.gen_range(0, 16)).collect();
	let large: Vec<u16> = (0..n_examples).map(|_| rng.gen_range(0, 300)).collect();
	let targets = small
		.iter()
		.zip(large.iter())
		.map(|(small, large)| {
			let step = if *small < 5 { -3.0 } else { 2.0 };
			let slope = f32::from(*large) / 100.0;
			step + slope + rng.gen_range(-0.5, 0.5)
		})
		.collect();
	let binned_features = BinnedFeatures::new(
		n_examples,
		vec![
			BinnedFeaturesColumn::Empty,
			BinnedFeaturesColumn::U8 {
				n_thresholds: 15,
				values: small,
			},
			BinnedFeaturesColumn::U16 {
				n_thresholds: 299,
				values: large,
			},
		],
	)
	.unwrap();
	(binned_features, targets)
}

#[test]
fn test_staircase_tree() {
	let (binned_features, targets) = staircase();
	let mut regressor =
		TreeRegressor::new(&binned_features, &targets, LeastSquares, staircase_options()).unwrap();
	let mut feature_importances = vec![0.0];
	let tree = regressor
		.train_tree(4, 1.0, 1.0, &mut feature_importances)
		.unwrap();
	insta::assert_debug_snapshot!(tree, @r###"
	Tree {
	    nodes: [
	        Branch(
	            BranchNode {
	                feature_index: 0,
	                bin_index: 2,
	                value: 8.75,
	                left_child_index: 1,
	                right_child_index: 6,
	                examples_count: 8,
	            },
	        ),
	        Branch(
	            BranchNode {
	                feature_index: 0,
	                bin_index: 0,
	                value: 5.0,
	                left_child_index: 2,
	                right_child_index: 3,
	                examples_count: 6,
	            },
	        ),
	        Leaf(
	            LeafNode {
	                value: 1.0,
	                examples_count: 2,
	            },
	        ),
	        Branch(
	            BranchNode {
	                feature_index: 0,
	                bin_index: 1,
	                value: 7.0,
	                left_child_index: 4,
	                right_child_index: 5,
	                examples_count: 4,
	            },
	        ),
	        Leaf(
	            LeafNode {
	                value: 5.0,
	                examples_count: 2,
	            },
	        ),
	        Leaf(
	            LeafNode {
	                value: 9.0,
	                examples_count: 2,
	            },
	        ),
	        Leaf(
	            LeafNode {
	                value: 20.0,
	                examples_count: 2,
	            },
	        ),
	    ],
	}
	"###);
	// The gains of the three splits are 337.5, 48 and 16.
	assert_eq!(feature_importances, vec![401.5]);
	for example_index in 0..8 {
		assert_eq!(
			tree.predict(&binned_features, example_index),
			targets[example_index]
		);
	}
}

#[test]
fn test_leaf_budget() {
	let (binned_features, targets) = staircase();
	let mut regressor =
		TreeRegressor::new(&binned_features, &targets, LeastSquares, staircase_options()).unwrap();
	for (n_leaves, expected_n_leaves) in &[(2, 2), (3, 3), (4, 4)] {
		let mut feature_importances = vec![0.0];
		let tree = regressor
			.train_tree(*n_leaves, 1.0, 1.0, &mut feature_importances)
			.unwrap();
		assert_eq!(tree.n_leaves(), *expected_n_leaves);
		assert_eq!(tree.n_branches(), tree.n_leaves() - 1);
	}
}

#[test]
fn test_one_leaf_still_splits_the_root() {
	let (binned_features, targets) = staircase();
	let mut regressor =
		TreeRegressor::new(&binned_features, &targets, LeastSquares, staircase_options()).unwrap();
	let mut feature_importances = vec![0.0];
	let tree = regressor
		.train_tree(1, 1.0, 1.0, &mut feature_importances)
		.unwrap();
	assert_eq!(
		tree,
		Tree {
			nodes: vec![
				Node::Branch(BranchNode {
					feature_index: 0,
					bin_index: 2,
					value: 8.75,
					left_child_index: 1,
					right_child_index: 2,
					examples_count: 8,
				}),
				Node::Leaf(LeafNode {
					value: 5.0,
					examples_count: 6,
				}),
				Node::Leaf(LeafNode {
					value: 20.0,
					examples_count: 2,
				}),
			],
		}
	);
	assert_eq!(feature_importances, vec![337.5]);
}

#[test]
fn test_no_positive_gain_is_a_single_leaf() {
	let (binned_features, _) = staircase();
	let targets = vec![1.0; 8];
	let mut regressor =
		TreeRegressor::new(&binned_features, &targets, LeastSquares, staircase_options()).unwrap();
	let mut feature_importances = vec![0.0];
	let tree = regressor
		.train_tree(4, 1.0, 1.0, &mut feature_importances)
		.unwrap();
	assert_eq!(
		tree,
		Tree {
			nodes: vec![Node::Leaf(LeafNode {
				value: 1.0,
				examples_count: 8,
			})],
		}
	);
	assert_eq!(feature_importances, vec![0.0]);
}

#[test]
fn test_no_sampled_features_is_a_single_leaf() {
	let (binned_features, targets) = staircase();
	let mut regressor =
		TreeRegressor::new(&binned_features, &targets, LeastSquares, staircase_options()).unwrap();
	let mut feature_importances = vec![0.0];
	let tree = regressor
		.train_tree(4, 1.0, 0.0, &mut feature_importances)
		.unwrap();
	assert_eq!(tree.n_leaves(), 1);
	assert_eq!(tree.nodes[0].examples_count(), 8);
}

#[test]
fn test_feature_importances_accumulate() {
	let (binned_features, targets) = staircase();
	let mut regressor =
		TreeRegressor::new(&binned_features, &targets, LeastSquares, staircase_options()).unwrap();
	let mut feature_importances = vec![100.0];
	regressor
		.train_tree(2, 1.0, 1.0, &mut feature_importances)
		.unwrap();
	regressor
		.train_tree(2, 1.0, 1.0, &mut feature_importances)
		.unwrap();
	assert_eq!(feature_importances, vec![775.0]);
}

#[test]
fn test_partition_laws() {
	let (binned_features, targets) = random_dataset(2000, 0);
	let options = TrainOptions {
		min_examples_per_leaf: 50,
		seed: Some(42),
	};
	let mut regressor =
		TreeRegressor::new(&binned_features, &targets, LeastSquares, options).unwrap();
	let examples_index = regressor.sampler.sample_examples(2000, 0.8);
	let n_sampled = examples_index.len();
	let (split_nodes, root) = regressor.grow(examples_index, 7, 0.8);
	let mut n_leaves = 0;
	let mut n_branches = 0;
	let mut n_leaf_examples = 0;
	let mut stack = vec![root];
	while let Some(id) = stack.pop() {
		let node = &split_nodes[id];
		match node.children {
			Some((left, right)) => {
				n_branches += 1;
				let left_node = &split_nodes[left];
				let right_node = &split_nodes[right];
				assert!(left_node.examples_index.len() >= 50);
				assert!(right_node.examples_index.len() >= 50);
				let mut children_examples_index = left_node.examples_index.clone();
				children_examples_index.extend(right_node.examples_index.iter());
				children_examples_index.sort_unstable();
				let mut examples_index = node.examples_index.clone();
				examples_index.sort_unstable();
				assert_eq!(children_examples_index, examples_index);
				stack.push(left);
				stack.push(right);
			}
			None => {
				n_leaves += 1;
				n_leaf_examples += node.examples_index.len();
			}
		}
	}
	assert!(n_leaves <= 8);
	assert_eq!(n_branches, n_leaves - 1);
	assert_eq!(n_leaf_examples, n_sampled);
}

#[test]
fn test_full_sampling_is_deterministic() {
	let (binned_features, targets) = random_dataset(1000, 1);
	let train = |seed| {
		let options = TrainOptions {
			min_examples_per_leaf: 20,
			seed: Some(seed),
		};
		let mut regressor =
			TreeRegressor::new(&binned_features, &targets, LeastSquares, options).unwrap();
		let mut feature_importances = vec![0.0; 3];
		let tree = regressor
			.train_tree(16, 1.0, 1.0, &mut feature_importances)
			.unwrap();
		(tree, feature_importances)
	};
	let (a, a_feature_importances) = train(1);
	let (b, b_feature_importances) = train(2);
	assert_eq!(a, b);
	assert_eq!(a_feature_importances, b_feature_importances);
	assert_eq!(a_feature_importances[0], 0.0);
	assert!(a.n_leaves() <= 16);
	assert_eq!(a.n_branches(), a.n_leaves() - 1);
}

#[test]
fn test_seeded_sampling_is_reproducible() {
	let (binned_features, targets) = random_dataset(1000, 2);
	let train = || {
		let options = TrainOptions {
			min_examples_per_leaf: 20,
			seed: Some(3),
		};
		let mut regressor =
			TreeRegressor::new(&binned_features, &targets, LeastSquares, options).unwrap();
		let mut feature_importances = vec![0.0; 3];
		regressor
			.train_tree(8, 0.5, 0.5, &mut feature_importances)
			.unwrap()
	};
	assert_eq!(train(), train());
}

#[test]
fn test_too_few_examples() {
	let (binned_features, targets) = staircase();
	let mut regressor =
		TreeRegressor::new(&binned_features, &targets, LeastSquares, staircase_options()).unwrap();
	let mut feature_importances = vec![0.0];
	assert_eq!(
		regressor.train_tree(5, 1.0, 1.0, &mut feature_importances),
		Err(TrainTreeError::TooFewExamples {
			n_sampled: 8,
			n_required: 10,
		})
	);
	assert_eq!(
		regressor.train_tree(1, 0.0, 1.0, &mut feature_importances),
		Err(TrainTreeError::TooFewExamples {
			n_sampled: 0,
			n_required: 2,
		})
	);
	assert_eq!(feature_importances, vec![0.0]);
}

#[test]
fn test_invalid_arguments() {
	let (binned_features, targets) = staircase();
	let mut regressor =
		TreeRegressor::new(&binned_features, &targets, LeastSquares, staircase_options()).unwrap();
	let mut feature_importances = vec![0.0];
	assert_eq!(
		regressor.train_tree(0, 1.0, 1.0, &mut feature_importances),
		Err(TrainTreeError::InvalidNumLeaves)
	);
	assert_eq!(
		regressor.train_tree(2, 1.5, 1.0, &mut feature_importances),
		Err(TrainTreeError::InvalidSamplingRate {
			name: "example_sampling_rate",
			value: 1.5,
		})
	);
	assert_eq!(
		regressor.train_tree(2, 1.0, -0.1, &mut feature_importances),
		Err(TrainTreeError::InvalidSamplingRate {
			name: "feature_sampling_rate",
			value: -0.1,
		})
	);
	assert!(matches!(
		regressor.train_tree(2, f64::NAN, 1.0, &mut feature_importances),
		Err(TrainTreeError::InvalidSamplingRate { .. })
	));
	assert_eq!(
		regressor.train_tree(2, 1.0, 1.0, &mut []),
		Err(TrainTreeError::FeatureImportancesLengthMismatch {
			n_feature_importances: 0,
			n_features: 1,
		})
	);
}

#[test]
fn test_invalid_regressor() {
	let (binned_features, targets) = staircase();
	assert!(matches!(
		TreeRegressor::new(&binned_features, &targets[0..4], LeastSquares, staircase_options()),
		Err(TrainTreeError::TargetsLengthMismatch {
			n_targets: 4,
			n_examples: 8,
		})
	));
	let options = TrainOptions {
		min_examples_per_leaf: 0,
		seed: None,
	};
	assert!(matches!(
		TreeRegressor::new(&binned_features, &targets, LeastSquares, options),
		Err(TrainTreeError::InvalidMinExamplesPerLeaf)
	));
}

#[test]
fn test_features_are_sampled_per_node() {
	// Three identical features with a split of positive gain in every node. Ties go to the lowest feature index, so every branch of a tree splits on the same feature unless the nodes sample their features independently.
	let values: Vec<u8> = (0..32).map(|example_index| (example_index / 2) as u8).collect();
	let column = BinnedFeaturesColumn::U8 {
		n_thresholds: 15,
		values,
	};
	let binned_features =
		BinnedFeatures::new(32, vec![column.clone(), column.clone(), column]).unwrap();
	let targets: Vec<f32> = (0..32)
		.map(|example_index| ((example_index / 2) * (example_index / 2)) as f32)
		.collect();
	let n_trees_with_mixed_features = (0..20)
		.filter(|seed| {
			let mut tree_regressor = TreeRegressor::new(
				&binned_features,
				&targets,
				LeastSquares,
				TrainOptions {
					min_examples_per_leaf: 1,
					seed: Some(*seed),
				},
			)
			.unwrap();
			let mut feature_importances = vec![0.0; 3];
			let tree = tree_regressor
				.train_tree(8, 1.0, 0.5, &mut feature_importances)
				.unwrap();
			let split_features: std::collections::BTreeSet<usize> = tree
				.nodes
				.iter()
				.filter_map(|node| match node {
					Node::Branch(branch) => Some(branch.feature_index),
					Node::Leaf(_) => None,
				})
				.collect();
			split_features.len() > 1
		})
		.count();
	assert!(n_trees_with_mixed_features > 0);
}
