//! Size and force formulas derived from node/link metrics.
//!
//! Shared by the simulation (collision radius, charge, link distance) and the
//! renderer (drawn radius, edge width) so both agree on what a node weighs.

use super::types::{GraphLink, GraphNode, NodeKind};

/// Label threshold: nodes larger than this always show their caption.
pub const LABEL_MIN_RADIUS: f64 = 25.0;
/// Nodes above this value glow even when not active.
pub const GLOW_VALUE_THRESHOLD: f64 = 50.0;

const TOKEN_BASE_RADIUS: f64 = 20.0;
const KOL_BASE_RADIUS: f64 = 14.0;
const TOKEN_MAX_RADIUS: f64 = 50.0;
const KOL_MAX_RADIUS: f64 = 40.0;

/// Drawn radius in graph units.
pub fn node_radius(node: &GraphNode) -> f64 {
	match node.kind {
		NodeKind::Token => (TOKEN_BASE_RADIUS
			+ (node.connections as f64).sqrt() * 6.0
			+ (node.total_volume.max(0.0) + 1.0).ln() * 2.0)
			.min(TOKEN_MAX_RADIUS),
		NodeKind::Kol => (KOL_BASE_RADIUS
			+ node.influence_score.max(0.0).sqrt() * 2.2
			+ (node.trade_count as f64).sqrt() * 1.5)
			.min(KOL_MAX_RADIUS),
	}
}

/// Exclusion radius used by the collision force, including padding.
pub fn collision_radius(node: &GraphNode, padding: f64) -> f64 {
	let body = match node.kind {
		NodeKind::Token => TOKEN_BASE_RADIUS + (node.connections as f64).sqrt() * 7.0,
		NodeKind::Kol => KOL_BASE_RADIUS + node.influence_score.max(0.0).sqrt() * 2.2,
	};
	body + padding
}

/// Many-body strength; negative values repel. Hubs repel harder.
pub fn charge_strength(node: &GraphNode, base: f64) -> f64 {
	let bonus = match node.kind {
		NodeKind::Token => (node.connections as f64 * 5.0).min(50.0),
		NodeKind::Kol => (node.influence_score.max(0.0) / 2.0).min(30.0),
	};
	base - bonus
}

/// Target length of a link. Heavily traded pairs sit closer together.
///
/// With the default base of 120 this spans 80..=120.
pub fn link_distance(link: &GraphLink, base: f64) -> f64 {
	let weight = (link.trade_count as f64 + 1.0).ln() * 0.5 + (link.volume.max(0.0) + 1.0).ln() * 0.5;
	base - (weight / 10.0).min(1.0) * (base / 3.0)
}

/// Edge stroke width, emphasised or not.
pub fn link_width(link: &GraphLink, emphasised: bool) -> f64 {
	let t = (link.trade_count as f64).sqrt();
	if emphasised {
		(t * 1.5).max(3.0)
	} else {
		(t * 0.8).max(1.5)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn token_radius_grows_and_caps() {
		let mut t = GraphNode::token("t");
		assert_eq!(node_radius(&t), 20.0);
		t.connections = 4;
		assert!((node_radius(&t) - 32.0).abs() < 1e-9);
		t.connections = 400;
		t.total_volume = 1e9;
		assert_eq!(node_radius(&t), 50.0);
	}

	#[test]
	fn kol_radius_grows_and_caps() {
		let mut k = GraphNode::kol("k");
		k.influence_score = 100.0;
		k.trade_count = 4;
		assert!((node_radius(&k) - (14.0 + 22.0 + 3.0)).abs() < 1e-9);
		k.influence_score = 10_000.0;
		assert_eq!(node_radius(&k), 40.0);
	}

	#[test]
	fn collision_radius_includes_padding() {
		let mut t = GraphNode::token("t");
		t.connections = 4;
		assert!((collision_radius(&t, 15.0) - 49.0).abs() < 1e-9);
		let mut k = GraphNode::kol("k");
		k.influence_score = 25.0;
		assert!((collision_radius(&k, 15.0) - 40.0).abs() < 1e-9);
	}

	#[test]
	fn charge_bonus_is_capped() {
		let mut t = GraphNode::token("t");
		t.connections = 3;
		assert_eq!(charge_strength(&t, -400.0), -415.0);
		t.connections = 100;
		assert_eq!(charge_strength(&t, -400.0), -450.0);
		let mut k = GraphNode::kol("k");
		k.influence_score = 40.0;
		assert_eq!(charge_strength(&k, -400.0), -420.0);
		k.influence_score = 1000.0;
		assert_eq!(charge_strength(&k, -400.0), -430.0);
	}

	#[test]
	fn link_distance_range() {
		let quiet = GraphLink::new("a", "b");
		assert_eq!(link_distance(&quiet, 120.0), 120.0);
		let mut busy = GraphLink::new("a", "b");
		busy.trade_count = 1_000_000;
		busy.volume = 1e12;
		assert_eq!(link_distance(&busy, 120.0), 80.0);
	}

	#[test]
	fn hovered_width_for_twelve_trades() {
		let mut l = GraphLink::new("SOL", "kolA");
		l.trade_count = 12;
		assert!((link_width(&l, true) - 12f64.sqrt() * 1.5).abs() < 1e-9);
		assert!((link_width(&l, true) - 5.196).abs() < 1e-3);
		assert_eq!(link_width(&GraphLink::new("a", "b"), false), 1.5);
	}
}
