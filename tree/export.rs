use crate::{
	split_nodes::{SplitNodeId, SplitNodes},
	BranchNode, LeafNode, LeafValue, Node, Tree,
};

/// Convert the split nodes reachable from `root` into a `Tree`, adding the gain of every split to `feature_importances` at the index of the feature it splits on. `feature_importances` is not reset, so importances accumulate over calls.
pub fn export_tree<L>(
	split_nodes: &SplitNodes,
	root: SplitNodeId,
	targets: &[f32],
	leaf_value: &L,
	min_examples_per_leaf: usize,
	feature_importances: &mut [f64],
) -> Tree
where
	L: LeafValue,
{
	let mut exporter = Exporter {
		split_nodes,
		targets,
		leaf_value,
		min_examples_per_leaf,
		feature_importances,
		nodes: Vec::new(),
	};
	exporter.export_node(root);
	Tree {
		nodes: exporter.nodes,
	}
}

struct Exporter<'a, L> {
	split_nodes: &'a SplitNodes,
	targets: &'a [f32],
	leaf_value: &'a L,
	min_examples_per_leaf: usize,
	feature_importances: &'a mut [f64],
	nodes: Vec<Node>,
}

impl<'a, L> Exporter<'a, L>
where
	L: LeafValue,
{
	/// Export the node and its descendants in pre-order and return the node's index in the tree.
	fn export_node(&mut self, id: SplitNodeId) -> usize {
		let split_nodes = self.split_nodes;
		let split_node = &split_nodes[id];
		let examples_index = split_node.examples_index.as_slice();
		let value = self
			.leaf_value
			.compute_leaf_value(examples_index, self.targets);
		let node_index = self.nodes.len();
		match (split_node.split, split_node.children) {
			(Some(split), Some((left, right))) => {
				log::info!(
					"split on feature {} at bin {}, gain: {}, examples: {}, smaller child examples: {}",
					split.feature_index,
					split.bin_index,
					split.gain,
					examples_index.len(),
					usize::min(
						split_nodes[left].examples_index.len(),
						split_nodes[right].examples_index.len(),
					),
				);
				self.feature_importances[split.feature_index] += split.gain;
				self.nodes.push(Node::Branch(BranchNode {
					feature_index: split.feature_index,
					bin_index: split.bin_index,
					value,
					left_child_index: 0,
					right_child_index: 0,
					examples_count: examples_index.len(),
				}));
				let left_child_index = self.export_node(left);
				let right_child_index = self.export_node(right);
				// Set the branch's child indexes now that the children have been added.
				if let Some(branch) = self.nodes[node_index].as_branch_mut() {
					branch.left_child_index = left_child_index;
					branch.right_child_index = right_child_index;
				}
			}
			_ => {
				log::info!("leaf: {}, examples: {}", value, examples_index.len());
				assert!(
					examples_index.len() >= self.min_examples_per_leaf,
					"a leaf has {} examples but the minimum is {}",
					examples_index.len(),
					self.min_examples_per_leaf,
				);
				self.nodes.push(Node::Leaf(LeafNode {
					value,
					examples_count: examples_index.len(),
				}));
			}
		}
		node_index
	}
}

#[cfg(test)]
use crate::{
	choose_best_split::ChooseBestSplitOutput, split_nodes::SplitNode, LeastSquares,
};

#[test]
fn test_export_tree() {
	let targets = [1.0, 2.0, 3.0, 10.0];
	let mut split_nodes = SplitNodes::new();
	let root = split_nodes.push(SplitNode {
		examples_index: vec![0, 1, 2, 3],
		split: Some(ChooseBestSplitOutput {
			feature_index: 1,
			bin_index: 0,
			gain: 25.0,
		}),
		children: None,
	});
	let left = split_nodes.push(SplitNode {
		examples_index: vec![0, 1],
		split: None,
		children: None,
	});
	// An unselected node with a split is still exported as a leaf.
	let right = split_nodes.push(SplitNode {
		examples_index: vec![2, 3],
		split: Some(ChooseBestSplitOutput {
			feature_index: 0,
			bin_index: 4,
			gain: 24.5,
		}),
		children: None,
	});
	split_nodes.set_children(root, left, right);
	let mut feature_importances = vec![1.0, 2.0];
	let tree = export_tree(
		&split_nodes,
		root,
		&targets,
		&LeastSquares,
		1,
		&mut feature_importances,
	);
	assert_eq!(
		tree,
		Tree {
			nodes: vec![
				Node::Branch(BranchNode {
					feature_index: 1,
					bin_index: 0,
					value: 4.0,
					left_child_index: 1,
					right_child_index: 2,
					examples_count: 4,
				}),
				Node::Leaf(LeafNode {
					value: 1.5,
					examples_count: 2,
				}),
				Node::Leaf(LeafNode {
					value: 6.5,
					examples_count: 2,
				}),
			],
		}
	);
	assert_eq!(feature_importances, vec![1.0, 27.0]);
}

#[test]
#[should_panic(expected = "a leaf has 2 examples but the minimum is 3")]
fn test_export_small_leaf() {
	let mut split_nodes = SplitNodes::new();
	let root = split_nodes.push(SplitNode {
		examples_index: vec![0, 1],
		split: None,
		children: None,
	});
	export_tree(&split_nodes, root, &[0.0, 0.0], &LeastSquares, 3, &mut []);
}
