//! Weighted quadtree for Barnes-Hut charge approximation.

use super::super::types::Point;

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug)]
pub(super) struct QuadBounds {
	pub(super) center: Point,
	pub(super) half_extent: f64,
}

impl QuadBounds {
	fn from_points(points: &[Point]) -> Option<Self> {
		let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
		let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
		for p in points {
			min_x = min_x.min(p.x);
			min_y = min_y.min(p.y);
			max_x = max_x.max(p.x);
			max_y = max_y.max(p.y);
		}
		if !min_x.is_finite() || !min_y.is_finite() || !max_x.is_finite() || !max_y.is_finite() {
			return None;
		}

		let span = (max_x - min_x).max(max_y - min_y).max(1.0);
		Some(Self {
			center: Point::new((min_x + max_x) * 0.5, (min_y + max_y) * 0.5),
			half_extent: span * 0.5 + 1.0,
		})
	}

	fn child(self, quadrant: usize) -> Self {
		let quarter = self.half_extent * 0.5;
		let (ox, oy) = match quadrant {
			0 => (-quarter, -quarter),
			1 => (quarter, -quarter),
			2 => (-quarter, quarter),
			_ => (quarter, quarter),
		};
		Self {
			center: Point::new(self.center.x + ox, self.center.y + oy),
			half_extent: quarter,
		}
	}

	fn quadrant_for(self, p: Point) -> usize {
		match (p.x >= self.center.x, p.y >= self.center.y) {
			(false, false) => 0,
			(true, false) => 1,
			(false, true) => 2,
			(true, true) => 3,
		}
	}

	pub(super) fn side_length(self) -> f64 {
		self.half_extent * 2.0
	}
}

/// A cell aggregating the summed strength of the points below it, located at
/// their strength-weighted centre.
pub(super) struct QuadNode {
	pub(super) bounds: QuadBounds,
	pub(super) center: Point,
	pub(super) strength: f64,
	pub(super) indices: Vec<usize>,
	pub(super) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
	pub(super) fn build(positions: &[Point], strengths: &[f64]) -> Option<Self> {
		let bounds = QuadBounds::from_points(positions)?;
		let indices = (0..positions.len()).collect();
		Some(Self::build_node(bounds, indices, positions, strengths, 0))
	}

	fn build_node(
		bounds: QuadBounds,
		indices: Vec<usize>,
		positions: &[Point],
		strengths: &[f64],
		depth: usize,
	) -> Self {
		let (mut weight, mut strength, mut cx, mut cy) = (0.0, 0.0, 0.0, 0.0);
		for &i in &indices {
			let w = strengths[i].abs();
			weight += w;
			strength += strengths[i];
			cx += positions[i].x * w;
			cy += positions[i].y * w;
		}
		let center = if weight > 0.0 {
			Point::new(cx / weight, cy / weight)
		} else {
			bounds.center
		};

		let mut node = Self {
			bounds,
			center,
			strength,
			indices,
			children: std::array::from_fn(|_| None),
		};

		if depth >= MAX_DEPTH || node.indices.len() <= LEAF_CAPACITY {
			return node;
		}

		let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
		for &i in &node.indices {
			buckets[bounds.quadrant_for(positions[i])].push(i);
		}
		if buckets.iter().filter(|b| !b.is_empty()).count() <= 1 {
			return node;
		}

		for (quadrant, bucket) in buckets.into_iter().enumerate() {
			if bucket.is_empty() {
				continue;
			}
			node.children[quadrant] = Some(Box::new(Self::build_node(
				bounds.child(quadrant),
				bucket,
				positions,
				strengths,
				depth + 1,
			)));
		}
		node.indices.clear();
		node
	}

	pub(super) fn is_leaf(&self) -> bool {
		self.children.iter().all(Option::is_none)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn aggregates_strength_and_centre() {
		let positions = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
		let strengths = vec![-100.0, -300.0];
		let root = QuadNode::build(&positions, &strengths).unwrap();
		assert_eq!(root.strength, -400.0);
		assert!((root.center.x - 7.5).abs() < 1e-9);
		assert!(root.is_leaf());
	}

	#[test]
	fn splits_large_sets() {
		let positions: Vec<Point> = (0..64)
			.map(|i| Point::new((i % 8) as f64 * 10.0, (i / 8) as f64 * 10.0))
			.collect();
		let strengths = vec![-1.0; 64];
		let root = QuadNode::build(&positions, &strengths).unwrap();
		assert!(!root.is_leaf());
		assert_eq!(root.strength, -64.0);
	}

	#[test]
	fn empty_input_has_no_tree() {
		assert!(QuadNode::build(&[], &[]).is_none());
	}
}
