//! Individual forces, each writing into node velocities.

use rand::Rng;
use rand::rngs::StdRng;

use super::quadtree::QuadNode;
use super::{BoundLink, SimNode};
use super::super::types::Point;

/// Minimum squared distance used for charge, to keep close pairs finite.
const CHARGE_DISTANCE_MIN_SQ: f64 = 1.0;

fn jiggle(rng: &mut StdRng) -> f64 {
	(rng.random::<f64>() - 0.5) * 1e-6
}

/// Springs every bound link towards its target distance.
pub(super) fn apply_link(nodes: &mut [SimNode], links: &[BoundLink], alpha: f64, rng: &mut StdRng) {
	for link in links {
		let (s, t) = (link.source, link.target);
		if s == t {
			continue;
		}

		let mut x = nodes[t].x + nodes[t].vx - nodes[s].x - nodes[s].vx;
		let mut y = nodes[t].y + nodes[t].vy - nodes[s].y - nodes[s].vy;
		if x == 0.0 {
			x = jiggle(rng);
		}
		if y == 0.0 {
			y = jiggle(rng);
		}

		let l = (x * x + y * y).sqrt();
		let k = (l - link.distance) / l * alpha * link.strength;
		x *= k;
		y *= k;

		nodes[t].vx -= x * link.bias;
		nodes[t].vy -= y * link.bias;
		nodes[s].vx += x * (1.0 - link.bias);
		nodes[s].vy += y * (1.0 - link.bias);
	}
}

/// Many-body repulsion with Barnes-Hut approximation.
pub(super) fn apply_charge(nodes: &mut [SimNode], alpha: f64, theta: f64, rng: &mut StdRng) {
	let positions: Vec<Point> = nodes.iter().map(|n| Point::new(n.x, n.y)).collect();
	let strengths: Vec<f64> = nodes.iter().map(|n| n.charge).collect();
	let Some(tree) = QuadNode::build(&positions, &strengths) else {
		return;
	};

	let theta_sq = theta * theta;
	for (index, node) in nodes.iter_mut().enumerate() {
		let (mut dvx, mut dvy) = (0.0, 0.0);
		accumulate_charge(
			&tree,
			index,
			&positions,
			&strengths,
			theta_sq,
			rng,
			&mut dvx,
			&mut dvy,
		);
		node.vx += dvx * alpha;
		node.vy += dvy * alpha;
	}
}

#[allow(clippy::too_many_arguments)]
fn accumulate_charge(
	cell: &QuadNode,
	index: usize,
	positions: &[Point],
	strengths: &[f64],
	theta_sq: f64,
	rng: &mut StdRng,
	dvx: &mut f64,
	dvy: &mut f64,
) {
	if cell.strength == 0.0 {
		return;
	}
	let p = positions[index];

	if !cell.is_leaf() {
		let (dx, dy) = (cell.center.x - p.x, cell.center.y - p.y);
		let dist_sq = dx * dx + dy * dy;
		let w = cell.bounds.side_length();
		if w * w / theta_sq < dist_sq {
			push_charge(dx, dy, cell.strength, rng, dvx, dvy);
			return;
		}
		for child in cell.children.iter().flatten() {
			accumulate_charge(child, index, positions, strengths, theta_sq, rng, dvx, dvy);
		}
		return;
	}

	for &other in &cell.indices {
		if other == index {
			continue;
		}
		let q = positions[other];
		push_charge(q.x - p.x, q.y - p.y, strengths[other], rng, dvx, dvy);
	}
}

fn push_charge(mut dx: f64, mut dy: f64, strength: f64, rng: &mut StdRng, dvx: &mut f64, dvy: &mut f64) {
	if dx == 0.0 {
		dx = jiggle(rng);
	}
	if dy == 0.0 {
		dy = jiggle(rng);
	}
	let mut l = dx * dx + dy * dy;
	if l < CHARGE_DISTANCE_MIN_SQ {
		l = (CHARGE_DISTANCE_MIN_SQ * l).sqrt();
	}
	*dvx += dx * strength / l;
	*dvy += dy * strength / l;
}

/// Translates every node so the system's mean sits on `center`.
pub(super) fn apply_center(nodes: &mut [SimNode], center: Point) {
	if nodes.is_empty() {
		return;
	}
	let n = nodes.len() as f64;
	let sx = nodes.iter().map(|node| node.x).sum::<f64>() / n - center.x;
	let sy = nodes.iter().map(|node| node.y).sum::<f64>() / n - center.y;
	for node in nodes {
		node.x -= sx;
		node.y -= sy;
	}
}

/// Pushes overlapping pairs apart on their predicted positions. Not scaled by
/// alpha, so overlap keeps resolving after the layout cools.
pub(super) fn apply_collide(nodes: &mut [SimNode], strength: f64, rng: &mut StdRng) {
	let count = nodes.len();
	for i in 0..count {
		let ri = nodes[i].radius;
		let ri_sq = ri * ri;
		let xi = nodes[i].x + nodes[i].vx;
		let yi = nodes[i].y + nodes[i].vy;

		for j in (i + 1)..count {
			let rj = nodes[j].radius;
			let r = ri + rj;
			let mut x = xi - nodes[j].x - nodes[j].vx;
			let mut y = yi - nodes[j].y - nodes[j].vy;
			let mut l = x * x + y * y;
			if l >= r * r {
				continue;
			}

			if x == 0.0 {
				x = jiggle(rng);
				l += x * x;
			}
			if y == 0.0 {
				y = jiggle(rng);
				l += y * y;
			}
			let d = l.sqrt();
			let k = (r - d) / d * strength;
			x *= k;
			y *= k;

			let rj_sq = rj * rj;
			let share = rj_sq / (ri_sq + rj_sq);
			nodes[i].vx += x * share;
			nodes[i].vy += y * share;
			nodes[j].vx -= x * (1.0 - share);
			nodes[j].vy -= y * (1.0 - share);
		}
	}
}
