//! Force-directed layout state.
//!
//! A [`SimulationState`] is the single owner of node positions and velocities
//! while the layout runs. It is built by `INIT` and mutated only through the
//! message handlers in [`super::worker::Engine`]. The integrator is the usual
//! cooling scheme: an `alpha` energy that decays towards `alpha_target`, forces
//! that write into velocities, and a velocity decay applied on integration.

mod forces;
mod quadtree;

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::metrics;
use super::topology::topology_hash;
use super::types::{GraphLink, GraphNode, Point};

/// Tuning for the layout. Defaults match the dashboard's force model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationParams {
	/// Below this energy the layout is at rest and stops ticking.
	pub alpha_min: f64,
	/// Per-tick pull of alpha towards its target.
	pub alpha_decay: f64,
	/// Fraction of velocity removed each tick.
	pub velocity_decay: f64,
	/// Energy applied when a data update changes the topology.
	pub reheat_alpha: f64,
	/// Additional energy, scaled by the share of nodes added or removed.
	pub reheat_extra: f64,
	/// Energy applied on a resize that keeps the tuning.
	pub resize_alpha: f64,
	/// Energy floor held while a node is being dragged.
	pub drag_alpha_target: f64,
	/// Length of an untraded link; heavy links shorten by up to a third.
	pub link_distance: f64,
	/// Many-body strength of a minimal node.
	pub charge_base: f64,
	/// Extra clearance added to every node radius.
	pub collision_padding: f64,
	/// How much of an overlap is resolved per tick.
	pub collision_strength: f64,
	/// Barnes-Hut opening angle.
	pub theta: f64,
	/// Wall-clock spacing of ticks on the threaded host.
	pub tick_interval_ms: u64,
	/// Seed for the jitter used to separate coincident nodes.
	pub seed: u64,
}

impl Default for SimulationParams {
	fn default() -> Self {
		let alpha_min = 0.001;
		Self {
			alpha_min,
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			velocity_decay: 0.4,
			reheat_alpha: 0.3,
			reheat_extra: 0.2,
			resize_alpha: 0.1,
			drag_alpha_target: 0.3,
			link_distance: 120.0,
			charge_base: -400.0,
			collision_padding: 15.0,
			collision_strength: 1.0,
			theta: 0.9,
			tick_interval_ms: 16,
			seed: 0x5eed,
		}
	}
}

/// Per-node physics record. Index-addressed inside the state's arena.
#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
	/// Node id from the snapshot.
	pub id: String,
	/// Current position.
	pub x: f64,
	/// See [`SimNode::x`].
	pub y: f64,
	/// Current velocity.
	pub vx: f64,
	/// See [`SimNode::vx`].
	pub vy: f64,
	/// Pinned position, set only while dragged.
	pub fx: Option<f64>,
	/// See [`SimNode::fx`].
	pub fy: Option<f64>,
	/// Collision exclusion radius.
	pub radius: f64,
	/// Many-body strength (negative repels).
	pub charge: f64,
}

/// A link whose endpoints have been resolved to arena indices.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundLink {
	/// Arena index of the source node.
	pub source: usize,
	/// Arena index of the target node.
	pub target: usize,
	/// Rest length.
	pub distance: f64,
	/// Spring stiffness, `1 / min(degree)` of the ends.
	pub strength: f64,
	/// Share of the correction applied to the target.
	pub bias: f64,
}

/// Resolves id-addressed links against the node index. Links naming unknown
/// ids are dropped; they have no physical effect.
pub fn bind_links(
	index: &HashMap<String, usize>,
	links: &[GraphLink],
	distance_base: f64,
) -> Vec<BoundLink> {
	let resolved: Vec<(usize, usize, f64)> = links
		.iter()
		.filter_map(|link| {
			let source = *index.get(&link.source)?;
			let target = *index.get(&link.target)?;
			Some((source, target, metrics::link_distance(link, distance_base)))
		})
		.collect();

	let mut degree: HashMap<usize, usize> = HashMap::new();
	for &(s, t, _) in &resolved {
		*degree.entry(s).or_insert(0) += 1;
		*degree.entry(t).or_insert(0) += 1;
	}

	resolved
		.into_iter()
		.map(|(source, target, distance)| {
			let ds = degree[&source] as f64;
			let dt = degree[&target] as f64;
			BoundLink {
				source,
				target,
				distance,
				strength: 1.0 / ds.min(dt),
				bias: ds / (ds + dt),
			}
		})
		.collect()
}

/// Authoritative layout state for one graph.
pub struct SimulationState {
	params: SimulationParams,
	nodes: Vec<SimNode>,
	index: HashMap<String, usize>,
	links: Vec<BoundLink>,
	center: Point,
	alpha: f64,
	alpha_target: f64,
	running: bool,
	topology: String,
	dragging: Option<String>,
	rng: StdRng,
	/// Last snapshot as received, kept so new params can re-derive forces.
	source: (Vec<GraphNode>, Vec<GraphLink>),
}

impl SimulationState {
	/// Builds a cold-start layout: every node without a carried position is
	/// seeded on a spiral around the centre and the energy starts at 1.
	pub fn new(
		nodes: &[GraphNode],
		links: &[GraphLink],
		width: f64,
		height: f64,
		params: SimulationParams,
	) -> Self {
		let mut state = Self {
			rng: StdRng::seed_from_u64(params.seed),
			params,
			nodes: Vec::new(),
			index: HashMap::new(),
			links: Vec::new(),
			center: Point::new(width / 2.0, height / 2.0),
			alpha: 1.0,
			alpha_target: 0.0,
			running: true,
			topology: topology_hash(nodes, links),
			dragging: None,
			source: (nodes.to_vec(), links.to_vec()),
		};
		state.install(nodes, links, &HashMap::new());
		debug!(
			"simulation: init with {} nodes, {} links",
			state.nodes.len(),
			state.links.len()
		);
		state
	}

	/// Swaps in a new snapshot while carrying positions and velocities over by id.
	///
	/// An unchanged topology keeps the current energy; a changed one reheats in
	/// proportion to how many nodes came or went.
	pub fn update_data(&mut self, nodes: &[GraphNode], links: &[GraphLink]) {
		let previous: HashMap<String, SimNode> = self
			.nodes
			.drain(..)
			.map(|node| (node.id.clone(), node))
			.collect();
		let hash = topology_hash(nodes, links);
		let changed = hash != self.topology;

		let incoming: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
		let added = incoming.iter().filter(|id| !previous.contains_key(**id)).count();
		let removed = previous.keys().filter(|id| !incoming.contains(id.as_str())).count();

		self.install(nodes, links, &previous);
		self.topology = hash;
		self.source = (nodes.to_vec(), links.to_vec());

		if let Some(id) = self.dragging.clone() {
			if !self.index.contains_key(&id) {
				self.dragging = None;
				self.alpha_target = 0.0;
			}
		}

		if changed {
			let span = previous.len().max(nodes.len()).max(1) as f64;
			let delta = ((added + removed) as f64 / span).min(1.0);
			let energy = self.params.reheat_alpha + self.params.reheat_extra * delta;
			self.alpha = self.alpha.max(energy);
			self.running = true;
			debug!(
				"simulation: topology changed (+{added}/-{removed}), reheat to {:.3}",
				self.alpha
			);
		}
	}

	/// Moves the centring target; positions are left to the forces.
	///
	/// New `params` (e.g. a shorter link distance after a breakpoint change)
	/// re-derive every node and link force in place and reheat like a
	/// topology change.
	pub fn update_dimensions(&mut self, width: f64, height: f64, params: Option<SimulationParams>) {
		self.center = Point::new(width / 2.0, height / 2.0);
		let mut energy = self.params.resize_alpha;
		if let Some(params) = params.filter(|p| *p != self.params) {
			self.set_params(params);
			energy = energy.max(self.params.reheat_alpha);
		}
		self.alpha = self.alpha.max(energy);
		self.running = true;
	}

	fn set_params(&mut self, params: SimulationParams) {
		debug!(
			"simulation: params changed, link distance {} -> {}",
			self.params.link_distance, params.link_distance
		);
		self.params = params;
		let previous: HashMap<String, SimNode> = self
			.nodes
			.drain(..)
			.map(|node| (node.id.clone(), node))
			.collect();
		let (nodes, links) = std::mem::take(&mut self.source);
		self.install(&nodes, &links, &previous);
		self.source = (nodes, links);
	}

	/// Pins `id` at the pointer and holds the energy up so neighbours follow.
	pub fn drag_start(&mut self, id: &str, x: f64, y: f64) {
		let Some(&i) = self.index.get(id) else {
			return;
		};
		self.nodes[i].fx = Some(x);
		self.nodes[i].fy = Some(y);
		self.dragging = Some(id.to_string());
		self.alpha_target = self.params.drag_alpha_target;
		self.running = true;
	}

	/// Moves the pin. Ignored unless `id` is being dragged.
	pub fn drag_move(&mut self, id: &str, x: f64, y: f64) {
		let Some(&i) = self.index.get(id) else {
			return;
		};
		self.nodes[i].fx = Some(x);
		self.nodes[i].fy = Some(y);
		self.running = true;
	}

	/// Releases the pin and lets the energy decay back to rest.
	pub fn drag_end(&mut self, id: &str) {
		if let Some(&i) = self.index.get(id) {
			self.nodes[i].fx = None;
			self.nodes[i].fy = None;
		}
		if self.dragging.as_deref() == Some(id) {
			self.dragging = None;
		}
		self.alpha_target = 0.0;
	}

	/// Advances the layout by one tick. Returns whether it is still running.
	pub fn tick(&mut self) -> bool {
		if !self.running {
			return false;
		}

		self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
		let alpha = self.alpha;

		forces::apply_link(&mut self.nodes, &self.links, alpha, &mut self.rng);
		forces::apply_charge(&mut self.nodes, alpha, self.params.theta, &mut self.rng);
		forces::apply_center(&mut self.nodes, self.center);
		forces::apply_collide(
			&mut self.nodes,
			self.params.collision_strength,
			&mut self.rng,
		);

		let keep = 1.0 - self.params.velocity_decay;
		for node in &mut self.nodes {
			match node.fx {
				Some(fx) => {
					node.x = fx;
					node.vx = 0.0;
				}
				None => {
					node.vx *= keep;
					node.x += node.vx;
				}
			}
			match node.fy {
				Some(fy) => {
					node.y = fy;
					node.vy = 0.0;
				}
				None => {
					node.vy *= keep;
					node.y += node.vy;
				}
			}
		}

		if self.alpha < self.params.alpha_min {
			self.running = false;
		}
		self.running
	}

	/// `(id, position)` for every node with finite coordinates.
	pub fn positions(&self) -> Vec<(String, Point)> {
		self.nodes
			.iter()
			.filter(|n| n.x.is_finite() && n.y.is_finite())
			.map(|n| (n.id.clone(), Point::new(n.x, n.y)))
			.collect()
	}

	/// Still ticking; false once alpha drops below `alpha_min`.
	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Current energy.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Energy the layout is cooling towards; raised while dragging.
	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	/// Tuning in effect.
	pub fn params(&self) -> &SimulationParams {
		&self.params
	}

	/// Physics record for `id`.
	pub fn node(&self, id: &str) -> Option<&SimNode> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	/// Nodes in snapshot order.
	pub fn nodes(&self) -> &[SimNode] {
		&self.nodes
	}

	/// Links whose ends both resolved.
	pub fn links(&self) -> &[BoundLink] {
		&self.links
	}

	fn install(&mut self, nodes: &[GraphNode], links: &[GraphLink], previous: &HashMap<String, SimNode>) {
		let params = &self.params;
		self.nodes = nodes
			.iter()
			.map(|node| {
				let mut sim = SimNode {
					id: node.id.clone(),
					x: f64::NAN,
					y: f64::NAN,
					vx: 0.0,
					vy: 0.0,
					fx: None,
					fy: None,
					radius: metrics::collision_radius(node, params.collision_padding),
					charge: metrics::charge_strength(node, params.charge_base),
				};
				if let Some(old) = previous.get(&node.id) {
					sim.x = old.x;
					sim.y = old.y;
					sim.vx = old.vx;
					sim.vy = old.vy;
					if self.dragging.as_deref() == Some(node.id.as_str()) {
						sim.fx = old.fx;
						sim.fy = old.fy;
					}
				} else if let Some(p) = node.position() {
					sim.x = p.x;
					sim.y = p.y;
				}
				sim
			})
			.collect();
		self.index = self
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.clone(), i))
			.collect();
		self.links = bind_links(&self.index, links, self.params.link_distance);
		self.seed_unplaced();
	}

	/// Places nodes that have no position yet. A newcomer linked to a placed
	/// node starts next to it; anything else goes on the golden-angle spiral.
	fn seed_unplaced(&mut self) {
		let golden = PI * (3.0 - 5f64.sqrt());
		let mut neighbour: HashMap<usize, usize> = HashMap::new();
		for link in &self.links {
			neighbour.entry(link.source).or_insert(link.target);
			neighbour.entry(link.target).or_insert(link.source);
		}

		for i in 0..self.nodes.len() {
			if self.nodes[i].x.is_finite() && self.nodes[i].y.is_finite() {
				continue;
			}
			let angle = i as f64 * golden;
			let anchor = neighbour
				.get(&i)
				.map(|&j| &self.nodes[j])
				.filter(|n| n.x.is_finite() && n.y.is_finite())
				.map(|n| (Point::new(n.x, n.y), self.nodes[i].radius + n.radius));

			let (origin, radius) = match anchor {
				Some((p, r)) => (p, r),
				None => (self.center, 10.0 * (0.5 + i as f64).sqrt()),
			};
			self.nodes[i].x = origin.x + radius * angle.cos();
			self.nodes[i].y = origin.y + radius * angle.sin();
			self.nodes[i].vx = 0.0;
			self.nodes[i].vy = 0.0;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use super::super::types::NodeKind;

	fn token(id: &str, connections: u32) -> GraphNode {
		let mut n = GraphNode::token(id);
		n.connections = connections;
		n
	}

	fn link(s: &str, t: &str, trades: u32, volume: f64) -> GraphLink {
		let mut l = GraphLink::new(s, t);
		l.trade_count = trades;
		l.volume = volume;
		l
	}

	fn settle(state: &mut SimulationState, max_ticks: usize) {
		for _ in 0..max_ticks {
			if !state.tick() {
				break;
			}
		}
	}

	fn complete_graph(n: usize) -> (Vec<GraphNode>, Vec<GraphLink>) {
		let nodes: Vec<GraphNode> = (0..n)
			.map(|i| token(&format!("t{i}"), (n - 1) as u32))
			.collect();
		let mut links = Vec::new();
		for i in 0..n {
			for j in (i + 1)..n {
				links.push(link(&format!("t{i}"), &format!("t{j}"), 5, 10.0));
			}
		}
		(nodes, links)
	}

	#[test]
	fn binding_drops_unknown_endpoints_and_weights_by_degree() {
		let index: HashMap<String, usize> =
			[("a".to_string(), 0), ("b".to_string(), 1), ("c".to_string(), 2)].into();
		let links = vec![
			GraphLink::new("a", "b"),
			GraphLink::new("a", "c"),
			GraphLink::new("a", "ghost"),
		];
		let bound = bind_links(&index, &links, 120.0);
		assert_eq!(bound.len(), 2);
		assert_eq!(bound[0].strength, 1.0);
		assert!((bound[0].bias - 2.0 / 3.0).abs() < 1e-9);
	}

	#[test]
	fn init_places_every_node_finitely() {
		let (nodes, links) = complete_graph(4);
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		assert_eq!(state.positions().len(), 4);
		for _ in 0..10 {
			state.tick();
		}
		for (_, p) in state.positions() {
			assert!(p.is_finite());
		}
	}

	#[test]
	fn empty_graph_ticks_cleanly() {
		let mut state = SimulationState::new(&[], &[], 800.0, 600.0, SimulationParams::default());
		settle(&mut state, 1000);
		assert!(state.positions().is_empty());
		assert!(!state.is_running());
	}

	#[test]
	fn settles_without_overlap() {
		let (mut nodes, links) = complete_graph(5);
		nodes[4].kind = NodeKind::Kol;
		nodes[4].influence_score = 64.0;
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		settle(&mut state, 2000);
		assert!(!state.is_running());

		let sim = state.nodes();
		for i in 0..sim.len() {
			for j in (i + 1)..sim.len() {
				let d = ((sim[i].x - sim[j].x).powi(2) + (sim[i].y - sim[j].y).powi(2)).sqrt();
				assert!(
					d >= sim[i].radius + sim[j].radius - 1.5,
					"{} and {} overlap: {d}",
					sim[i].id,
					sim[j].id
				);
			}
		}
	}

	#[test]
	fn update_data_carries_position_by_id() {
		let (nodes, links) = complete_graph(3);
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		for _ in 0..20 {
			state.tick();
		}
		let before = state.node("t1").cloned().unwrap();

		let mut refreshed = nodes.clone();
		refreshed[1].label = Some("renamed".into());
		refreshed.reverse();
		state.update_data(&refreshed, &links);

		let after = state.node("t1").unwrap();
		assert_eq!((after.x, after.y), (before.x, before.y));
		assert_eq!((after.vx, after.vy), (before.vx, before.vy));
	}

	#[test]
	fn cosmetic_update_does_not_reheat() {
		let (nodes, links) = complete_graph(3);
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		settle(&mut state, 2000);
		let alpha = state.alpha();

		let mut refreshed = nodes.clone();
		refreshed[0].display_name = Some("Solana".into());
		state.update_data(&refreshed, &links);
		assert_eq!(state.alpha(), alpha);
		assert!(!state.is_running());
	}

	#[test]
	fn structural_update_reheats_by_delta() {
		let (nodes, links) = complete_graph(4);
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		settle(&mut state, 2000);

		let mut changed = nodes.clone();
		changed[0].connections += 1;
		state.update_data(&changed, &links);
		assert!((state.alpha() - 0.3).abs() < 1e-9);
		assert!(state.is_running());

		settle(&mut state, 2000);
		let mut grown = changed.clone();
		grown.push(token("t4", 0));
		grown.push(token("t5", 0));
		state.update_data(&grown, &links);
		let expected = 0.3 + 0.2 * (2.0 / 6.0);
		assert!((state.alpha() - expected).abs() < 1e-9);
		assert!(state.node("t5").unwrap().x.is_finite());
	}

	#[test]
	fn newcomer_seeds_next_to_linked_neighbour() {
		let nodes = vec![token("a", 0)];
		let mut state = SimulationState::new(&nodes, &[], 800.0, 600.0, SimulationParams::default());
		settle(&mut state, 2000);
		let a = state.node("a").cloned().unwrap();

		let nodes = vec![token("a", 1), token("b", 1)];
		let links = vec![link("a", "b", 1, 1.0)];
		state.update_data(&nodes, &links);
		let a_now = state.node("a").unwrap();
		let b = state.node("b").unwrap();
		assert_eq!((a_now.x, a_now.y), (a.x, a.y));
		let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
		assert!((d - (a_now.radius + b.radius)).abs() < 1e-6);
	}

	#[test]
	fn drag_pins_exactly_then_releases() {
		let (nodes, links) = complete_graph(4);
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		settle(&mut state, 2000);

		state.drag_start("t2", 50.0, 60.0);
		assert!(state.is_running());
		state.tick();
		let pos: HashMap<String, Point> = state.positions().into_iter().collect();
		assert_eq!(pos["t2"], Point::new(50.0, 60.0));

		for step in 0..5 {
			let (x, y) = (70.0 + step as f64, 80.0 - step as f64);
			state.drag_move("t2", x, y);
			state.tick();
			let pos: HashMap<String, Point> = state.positions().into_iter().collect();
			assert_eq!(pos["t2"], Point::new(x, y));
		}
		assert!(state.alpha() > state.params().alpha_min);

		state.drag_end("t2");
		let node = state.node("t2").unwrap();
		assert_eq!((node.fx, node.fy), (None, None));
		assert_eq!(state.alpha_target(), 0.0);
		for _ in 0..5 {
			state.tick();
		}
		assert_ne!(state.node("t2").unwrap().x, 74.0);
	}

	#[test]
	fn drag_pin_survives_data_refresh() {
		let (nodes, links) = complete_graph(3);
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		state.drag_start("t0", 10.0, 10.0);
		state.update_data(&nodes, &links);
		assert_eq!(state.node("t0").unwrap().fx, Some(10.0));
	}

	#[test]
	fn resize_moves_centre_and_reheats() {
		let (nodes, links) = complete_graph(3);
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		settle(&mut state, 2000);
		state.update_dimensions(400.0, 300.0, None);
		assert!(state.is_running());
		assert!((state.alpha() - 0.1).abs() < 1e-9);
		settle(&mut state, 2000);
		let n = state.nodes().len() as f64;
		let mx = state.nodes().iter().map(|n| n.x).sum::<f64>() / n;
		assert!((mx - 200.0).abs() < 5.0);
	}

	#[test]
	fn resize_with_new_params_rebinds_links_in_place() {
		let (nodes, links) = complete_graph(3);
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		settle(&mut state, 2000);
		let before = state.positions();
		let long = state.links()[0].distance;

		let params = SimulationParams {
			link_distance: 80.0,
			..SimulationParams::default()
		};
		state.update_dimensions(800.0, 600.0, Some(params));
		assert_eq!(state.params().link_distance, 80.0);
		assert!(state.links()[0].distance < long);
		assert_eq!(state.positions(), before);
		assert!(state.alpha() >= 0.3 - 1e-9);

		let settled = |s: &SimulationState| {
			let (a, b) = (&s.nodes()[0], &s.nodes()[1]);
			(a.x - b.x).hypot(a.y - b.y)
		};
		let wide = settled(&state);
		settle(&mut state, 2000);
		assert!(settled(&state) < wide);
	}

	#[test]
	fn resize_with_same_params_only_reheats_gently() {
		let (nodes, links) = complete_graph(3);
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		settle(&mut state, 2000);
		state.update_dimensions(800.0, 600.0, Some(SimulationParams::default()));
		assert!((state.alpha() - 0.1).abs() < 1e-9);
	}

	#[test]
	fn dangling_links_are_inert() {
		let nodes = vec![token("a", 1)];
		let links = vec![link("a", "missing", 3, 3.0)];
		let mut state = SimulationState::new(&nodes, &links, 800.0, 600.0, SimulationParams::default());
		assert!(state.links().is_empty());
		state.tick();
		assert!(state.positions()[0].1.is_finite());
	}
}
