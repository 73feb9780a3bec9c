use crate::choose_best_split::ChooseBestSplitOutput;
use std::ops::Index;

/// A handle to a `SplitNode` in a `SplitNodes` arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SplitNodeId(usize);

/// A node created while growing a tree. Every node starts out as a leaf with the best split found for it, if any. A node becomes a branch when it is selected for splitting and its children are attached.
#[derive(Debug)]
pub struct SplitNode {
	/// The indexes of the sampled examples that reach this node.
	pub examples_index: Vec<usize>,
	/// This is `None` if the node was forced to be a leaf or no split has a positive gain.
	pub split: Option<ChooseBestSplitOutput>,
	/// The left and right children, set once when the node is selected.
	pub children: Option<(SplitNodeId, SplitNodeId)>,
}

/// `SplitNodes` owns every node created while growing one tree. Parents refer to their children and the frontier refers to its nodes by `SplitNodeId`, and all of the nodes are dropped together with the arena.
#[derive(Debug, Default)]
pub struct SplitNodes {
	nodes: Vec<SplitNode>,
}

impl SplitNodes {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, node: SplitNode) -> SplitNodeId {
		let id = SplitNodeId(self.nodes.len());
		self.nodes.push(node);
		id
	}

	/// Attach the children of a node that was selected for splitting.
	pub fn set_children(&mut self, id: SplitNodeId, left: SplitNodeId, right: SplitNodeId) {
		let node = &mut self.nodes[id.0];
		assert!(node.split.is_some(), "only a node with a split can have children");
		assert!(node.children.is_none(), "a node can only be selected once");
		node.children = Some((left, right));
	}
}

impl Index<SplitNodeId> for SplitNodes {
	type Output = SplitNode;
	fn index(&self, id: SplitNodeId) -> &SplitNode {
		&self.nodes[id.0]
	}
}

#[cfg(test)]
fn test_split() -> Option<ChooseBestSplitOutput> {
	Some(ChooseBestSplitOutput {
		feature_index: 0,
		bin_index: 3,
		gain: 1.5,
	})
}

#[test]
fn test_split_nodes() {
	let mut split_nodes = SplitNodes::new();
	let root = split_nodes.push(SplitNode {
		examples_index: vec![0, 1, 2, 3],
		split: test_split(),
		children: None,
	});
	let left = split_nodes.push(SplitNode {
		examples_index: vec![0, 1],
		split: None,
		children: None,
	});
	let right = split_nodes.push(SplitNode {
		examples_index: vec![2, 3],
		split: None,
		children: None,
	});
	assert_eq!(split_nodes[root].children, None);
	assert_eq!(split_nodes[root].split, test_split());
	assert_eq!(split_nodes[left].split, None);
	split_nodes.set_children(root, left, right);
	assert_eq!(split_nodes[root].children, Some((left, right)));
	assert_eq!(split_nodes[right].examples_index, vec![2, 3]);
}

#[test]
#[should_panic(expected = "a node can only be selected once")]
fn test_select_twice() {
	let mut split_nodes = SplitNodes::new();
	let root = split_nodes.push(SplitNode {
		examples_index: vec![0, 1],
		split: test_split(),
		children: None,
	});
	split_nodes.set_children(root, root, root);
	split_nodes.set_children(root, root, root);
}
