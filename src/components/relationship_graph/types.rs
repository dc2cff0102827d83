//! Graph data structures for input to the relationship graph.
//!
//! Snapshots arrive as JSON with camelCase field names. Every update is a full
//! node array plus a full link array; nothing is patched in place.

use serde::{Deserialize, Serialize};

/// Which side of the trading relationship a node represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	/// A tradable asset, keyed by its mint address.
	#[default]
	Token,
	/// A key opinion leader, keyed by wallet address.
	Kol,
}

/// A 2-D point in untransformed graph space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate.
	pub y: f64,
}

impl Point {
	/// Point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Both coordinates are finite numbers.
	pub fn is_finite(&self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}
}

/// A token or KOL node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphNode {
	/// Unique identifier (mint or wallet address). Used to reference nodes in links.
	pub id: String,
	/// Token or KOL; serialized as `type`.
	#[serde(rename = "type")]
	pub kind: NodeKind,
	/// Importance metric driving glow.
	pub value: f64,
	/// Number of distinct links touching this node.
	pub connections: u32,
	/// KOL influence, 0 to 100. Sizes KOL nodes.
	pub influence_score: f64,
	/// Trades made by this KOL.
	pub trade_count: u32,
	/// Traded volume across all of the node's links.
	pub total_volume: f64,
	/// Overrides the color scale with the primary accent.
	pub is_trending: bool,
	/// Verified nodes get the bright border.
	pub is_verified: bool,
	/// Avatar or token logo URL.
	pub display_image: Option<String>,
	/// Preferred caption.
	pub display_name: Option<String>,
	/// Fallback caption when there is no display name.
	pub label: Option<String>,
	/// Position as last reported by the simulation. `None` until the first tick.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub x: Option<f64>,
	/// See [`GraphNode::x`].
	#[serde(skip_serializing_if = "Option::is_none")]
	pub y: Option<f64>,
}

impl GraphNode {
	/// Bare token node with default metrics.
	pub fn token(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			kind: NodeKind::Token,
			..Self::default()
		}
	}

	/// Bare KOL node with default metrics.
	pub fn kol(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			kind: NodeKind::Kol,
			..Self::default()
		}
	}

	/// Resolved position, if the simulation has placed this node.
	pub fn position(&self) -> Option<Point> {
		match (self.x, self.y) {
			(Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Point { x, y }),
			_ => None,
		}
	}

	/// Records a simulated position.
	pub fn set_position(&mut self, p: Point) {
		self.x = Some(p.x);
		self.y = Some(p.y);
	}

	/// Text shown under the node: display name, then label, then a shortened id.
	pub fn caption(&self) -> String {
		if let Some(name) = self.display_name.as_deref().filter(|s| !s.is_empty()) {
			return name.to_string();
		}
		if let Some(label) = self.label.as_deref().filter(|s| !s.is_empty()) {
			return label.to_string();
		}
		let chars: Vec<char> = self.id.chars().collect();
		if chars.len() <= 10 {
			self.id.clone()
		} else {
			let head: String = chars[..4].iter().collect();
			let tail: String = chars[chars.len() - 4..].iter().collect();
			format!("{head}…{tail}")
		}
	}
}

/// An undirected trading relationship between two nodes, referenced by id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphLink {
	/// Source node ID.
	pub source: String,
	/// Target node ID.
	pub target: String,
	/// Trades between the two ends; drives width and distance.
	pub trade_count: u32,
	/// Volume traded between the two ends.
	pub volume: f64,
}

impl GraphLink {
	/// Untraded link between two ids.
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			..Self::default()
		}
	}

	/// Order-independent key for this link.
	pub fn key(&self) -> LinkKey {
		LinkKey::new(&self.source, &self.target)
	}

	/// Either end is `id`.
	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

/// Order-independent identity of a link, used for hover tracking.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LinkKey {
	/// Lesser endpoint id.
	pub a: String,
	/// Greater endpoint id.
	pub b: String,
}

impl LinkKey {
	/// Normalises the endpoint order.
	pub fn new(source: &str, target: &str) -> Self {
		if source <= target {
			Self {
				a: source.to_string(),
				b: target.to_string(),
			}
		} else {
			Self {
				a: target.to_string(),
				b: source.to_string(),
			}
		}
	}
}

/// Complete graph snapshot: nodes and links.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	/// Every node in the snapshot.
	pub nodes: Vec<GraphNode>,
	/// Every link; ends that name no node are dropped downstream.
	pub links: Vec<GraphLink>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deserializes_camel_case_snapshot() {
		let json = r#"{
			"nodes": [
				{"id": "SOL", "type": "token", "connections": 3, "value": 60, "totalVolume": 12.5},
				{"id": "kolA", "type": "kol", "influenceScore": 80, "tradeCount": 12,
				 "displayImage": "https://img/a.png", "isTrending": true}
			],
			"links": [{"source": "SOL", "target": "kolA", "tradeCount": 12, "volume": 5.2}]
		}"#;
		let data: GraphData = serde_json::from_str(json).unwrap();
		assert_eq!(data.nodes[0].kind, NodeKind::Token);
		assert_eq!(data.nodes[0].connections, 3);
		assert_eq!(data.nodes[1].kind, NodeKind::Kol);
		assert_eq!(data.nodes[1].influence_score, 80.0);
		assert!(data.nodes[1].is_trending);
		assert_eq!(data.nodes[1].display_image.as_deref(), Some("https://img/a.png"));
		assert_eq!(data.links[0].trade_count, 12);
		assert!(data.nodes[0].position().is_none());
	}

	#[test]
	fn caption_prefers_display_name_then_label_then_short_id() {
		let mut node = GraphNode::kol("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
		assert_eq!(node.caption(), "7xKX…gAsU");
		node.label = Some("label".into());
		assert_eq!(node.caption(), "label");
		node.display_name = Some("Ansem".into());
		assert_eq!(node.caption(), "Ansem");
	}

	#[test]
	fn link_key_ignores_direction() {
		assert_eq!(GraphLink::new("a", "b").key(), GraphLink::new("b", "a").key());
	}

	#[test]
	fn non_finite_position_is_unresolved() {
		let mut node = GraphNode::token("t");
		node.x = Some(f64::NAN);
		node.y = Some(1.0);
		assert!(node.position().is_none());
	}
}
