use num_traits::ToPrimitive;
use std::cmp::Ordering;

/// A `LeafValue` computes the value a node outputs from the targets of the examples that reach it. The value of a leaf is the tree's prediction for those examples. Branches compute a value too, which is kept for inspection.
pub trait LeafValue {
	fn compute_leaf_value(&self, examples_index: &[usize], targets: &[f32]) -> f32;
}

impl<F> LeafValue for F
where
	F: Fn(&[usize], &[f32]) -> f32,
{
	fn compute_leaf_value(&self, examples_index: &[usize], targets: &[f32]) -> f32 {
		self(examples_index, targets)
	}
}

/// The leaf value that minimizes the squared error: the mean of the targets.
#[derive(Clone, Copy, Debug, Default)]
pub struct LeastSquares;

impl LeafValue for LeastSquares {
	fn compute_leaf_value(&self, examples_index: &[usize], targets: &[f32]) -> f32 {
		let sum_targets: f64 = examples_index
			.iter()
			.map(|example_index| targets[*example_index].to_f64().unwrap())
			.sum();
		(sum_targets / examples_index.len().to_f64().unwrap())
			.to_f32()
			.unwrap()
	}
}

/// The leaf value that minimizes the absolute error: the median of the targets. An even number of targets takes the mean of the two middle targets.
#[derive(Clone, Copy, Debug, Default)]
pub struct LeastAbsoluteDeviation;

impl LeafValue for LeastAbsoluteDeviation {
	fn compute_leaf_value(&self, examples_index: &[usize], targets: &[f32]) -> f32 {
		let mut node_targets: Vec<f32> = examples_index
			.iter()
			.map(|example_index| targets[*example_index])
			.collect();
		node_targets.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
		let middle = node_targets.len() / 2;
		if node_targets.len() % 2 == 1 {
			node_targets[middle]
		} else {
			(node_targets[middle - 1] + node_targets[middle]) / 2.0
		}
	}
}

#[test]
fn test_least_squares() {
	let targets = [1.0, 2.0, 3.0, 10.0];
	assert_eq!(LeastSquares.compute_leaf_value(&[0, 1, 2, 3], &targets), 4.0);
	assert_eq!(LeastSquares.compute_leaf_value(&[2, 3], &targets), 6.5);
}

#[test]
fn test_least_absolute_deviation() {
	let targets = [10.0, 1.0, 3.0, 2.0];
	assert_eq!(
		LeastAbsoluteDeviation.compute_leaf_value(&[0, 1, 2], &targets),
		3.0
	);
	assert_eq!(
		LeastAbsoluteDeviation.compute_leaf_value(&[0, 1, 2, 3], &targets),
		2.5
	);
}

#[test]
fn test_closure_leaf_value() {
	let count = |examples_index: &[usize], _: &[f32]| examples_index.len() as f32;
	assert_eq!(count.compute_leaf_value(&[4, 5, 6], &[]), 3.0);
}
