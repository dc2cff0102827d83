//! Fingerprint of the simulation-relevant parts of a snapshot.
//!
//! Two snapshots with the same hash position identically under the force
//! model, so a data refresh that keeps the hash only needs a visual refresh.
//! Cosmetic fields (labels, names, images) never contribute.

use super::types::{GraphLink, GraphNode};

/// Computes the composite topology key for a node/link snapshot.
///
/// Per-item strings are sorted so that input order does not matter, and item
/// counts prefix each segment so additions and removals always change the key.
pub fn topology_hash(nodes: &[GraphNode], links: &[GraphLink]) -> String {
	let mut node_keys: Vec<String> = nodes
		.iter()
		.map(|n| {
			format!(
				"{}:{}:{}:{:.2}",
				n.id, n.value, n.connections, n.influence_score
			)
		})
		.collect();
	node_keys.sort_unstable();

	let mut link_keys: Vec<String> = links
		.iter()
		.map(|l| {
			// Half-up, so x.5 always lands on the next integer.
			let volume = (l.volume + 0.5).floor();
			format!("{}-{}:{}:{}", l.source, l.target, l.trade_count, volume)
		})
		.collect();
	link_keys.sort_unstable();

	format!(
		"n{}[{}]|l{}[{}]",
		node_keys.len(),
		node_keys.join(","),
		link_keys.len(),
		link_keys.join(",")
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn snapshot() -> (Vec<GraphNode>, Vec<GraphLink>) {
		let mut sol = GraphNode::token("SOL");
		sol.connections = 3;
		sol.value = 60.0;
		let mut kol = GraphNode::kol("kolA");
		kol.influence_score = 80.0;
		kol.trade_count = 12;
		let mut bonk = GraphNode::token("BONK");
		bonk.connections = 1;
		let mut ab = GraphLink::new("SOL", "kolA");
		ab.trade_count = 12;
		ab.volume = 5.2;
		let mut bc = GraphLink::new("BONK", "kolA");
		bc.trade_count = 2;
		bc.volume = 0.4;
		(vec![sol, kol, bonk], vec![ab, bc])
	}

	#[test]
	fn stable_and_order_independent() {
		let (nodes, links) = snapshot();
		let first = topology_hash(&nodes, &links);
		assert_eq!(first, topology_hash(&nodes, &links));

		let mut rev_nodes = nodes.clone();
		rev_nodes.reverse();
		let mut rev_links = links.clone();
		rev_links.reverse();
		assert_eq!(first, topology_hash(&rev_nodes, &rev_links));
	}

	#[test]
	fn cosmetic_changes_keep_hash() {
		let (mut nodes, links) = snapshot();
		let before = topology_hash(&nodes, &links);
		nodes[0].label = Some("Solana".into());
		nodes[1].display_image = Some("https://example.com/a.png".into());
		nodes[1].display_name = Some("Trader A".into());
		nodes[2].x = Some(10.0);
		assert_eq!(before, topology_hash(&nodes, &links));
	}

	#[test]
	fn structural_changes_alter_hash() {
		let (nodes, links) = snapshot();
		let base = topology_hash(&nodes, &links);

		let mut n = nodes.clone();
		n[0].connections = 4;
		assert_ne!(base, topology_hash(&n, &links));

		let mut n = nodes.clone();
		n[1].influence_score = 80.5;
		assert_ne!(base, topology_hash(&n, &links));

		let mut l = links.clone();
		l[0].trade_count = 13;
		assert_ne!(base, topology_hash(&nodes, &l));

		let mut l = links.clone();
		l[1].volume = 7.0;
		assert_ne!(base, topology_hash(&nodes, &l));

		let mut n = nodes.clone();
		n.push(GraphNode::token("WIF"));
		assert_ne!(base, topology_hash(&n, &links));

		let l = links[..1].to_vec();
		assert_ne!(base, topology_hash(&nodes, &l));
	}

	#[test]
	fn volume_rounds_half_up() {
		let (nodes, mut links) = snapshot();
		let hash_at = |links: &mut Vec<GraphLink>, volume: f64| {
			links[0].volume = volume;
			topology_hash(&nodes, links)
		};
		assert_eq!(hash_at(&mut links, 2.5), hash_at(&mut links, 3.0));
		assert_eq!(hash_at(&mut links, 3.4), hash_at(&mut links, 3.0));
		assert_ne!(hash_at(&mut links, 2.4), hash_at(&mut links, 2.5));
		assert_ne!(hash_at(&mut links, 3.5), hash_at(&mut links, 3.0));
		assert!(hash_at(&mut links, 0.5).ends_with("SOL-kolA:12:1]"));
	}

	#[test]
	fn empty_snapshot_hashes() {
		assert_eq!(topology_hash(&[], &[]), "n0[]|l0[]");
	}
}
