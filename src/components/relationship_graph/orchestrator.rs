//! Coordinates data, the simulation worker, user input and the renderer.
//!
//! The orchestrator is the only piece that talks to both sides: it forwards
//! snapshots, resizes and drags to the engine as protocol messages, folds
//! `TICK` positions into its copy of the nodes, and owns hover, selection and
//! the pan/zoom transform. Frames are requested through a dirty flag that the
//! canvas component samples once per animation frame.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::debug;

use super::image_cache::ImageLoader;
use super::metrics;
use super::protocol::{SimCommand, SimEvent};
use super::render::{CanvasRenderer, DrawContext, Interaction, ViewTransform};
use super::responsive::{DeviceProfile, ResponsiveConfig};
use super::simulation::SimulationParams;
use super::theme::Theme;
use super::topology::topology_hash;
use super::types::{GraphData, GraphLink, GraphNode, LinkKey, Point};
use super::worker::SimulationWorker;

/// Zoom bounds for wheel, pinch and double tap.
pub const MIN_ZOOM: f64 = 0.1;
/// See [`MIN_ZOOM`].
pub const MAX_ZOOM: f64 = 8.0;
/// Edge hit tolerance in screen pixels.
pub const LINK_HIT_PX: f64 = 6.0;
/// Pointer travel below which a press counts as a click.
const CLICK_SLOP_PX: f64 = 4.0;
const DOUBLE_TAP_MS: f64 = 300.0;
const DOUBLE_TAP_PX: f64 = 30.0;
const DOUBLE_TAP_ZOOM: f64 = 2.0;
/// Ticks it takes to cool when animations are reduced.
const REDUCED_MOTION_TICKS: f64 = 100.0;

/// In-progress pointer gesture.
#[derive(Clone, Debug, Default, PartialEq)]
enum Gesture {
	#[default]
	Idle,
	Drag {
		id: String,
		start: (f64, f64),
		moved: bool,
	},
	Pan {
		start: (f64, f64),
		origin: (f64, f64),
		moved: bool,
	},
}

impl Gesture {
	fn travelled(start: (f64, f64), x: f64, y: f64) -> bool {
		(x - start.0).hypot(y - start.1) > CLICK_SLOP_PX
	}
}

/// Drops dangling links and trims the snapshot to the device limits.
///
/// Over-budget nodes are cut by value, then connections, then id; links are
/// then capped by trade count. Kept items stay in their original order.
pub fn sanitize(data: GraphData, max_nodes: usize, max_edges: usize) -> GraphData {
	let GraphData { nodes, links } = data;

	let mut seen = HashSet::new();
	let mut nodes: Vec<GraphNode> = nodes
		.into_iter()
		.filter(|n| seen.insert(n.id.clone()))
		.collect();

	if nodes.len() > max_nodes {
		let mut ranked: Vec<usize> = (0..nodes.len()).collect();
		ranked.sort_by(|&a, &b| {
			let (na, nb) = (&nodes[a], &nodes[b]);
			nb.value
				.total_cmp(&na.value)
				.then(nb.connections.cmp(&na.connections))
				.then(na.id.cmp(&nb.id))
		});
		let keep: HashSet<usize> = ranked.into_iter().take(max_nodes).collect();
		let mut i = 0;
		nodes.retain(|_| {
			let kept = keep.contains(&i);
			i += 1;
			kept
		});
	}

	let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
	let mut links: Vec<GraphLink> = links
		.into_iter()
		.filter(|l| ids.contains(l.source.as_str()) && ids.contains(l.target.as_str()))
		.collect();

	if links.len() > max_edges {
		let mut ranked: Vec<usize> = (0..links.len()).collect();
		ranked.sort_by(|&a, &b| links[b].trade_count.cmp(&links[a].trade_count));
		let keep: HashSet<usize> = ranked.into_iter().take(max_edges).collect();
		let mut i = 0;
		links.retain(|_| {
			let kept = keep.contains(&i);
			i += 1;
			kept
		});
	}

	GraphData { nodes, links }
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len2 = dx * dx + dy * dy;
	let t = if len2 > 0.0 {
		(((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
	} else {
		0.0
	};
	(p.x - (a.x + t * dx)).hypot(p.y - (a.y + t * dy))
}

/// Owns everything between inbound data and painted frames.
pub struct GraphOrchestrator<L: ImageLoader> {
	worker: SimulationWorker,
	renderer: CanvasRenderer<L>,
	config: ResponsiveConfig,
	/// Caller tuning before device adjustments; `params` is derived from it.
	base_params: SimulationParams,
	params: SimulationParams,
	nodes: Vec<GraphNode>,
	links: Vec<GraphLink>,
	positions: HashMap<String, Point>,
	topology: Option<String>,
	pending: Option<GraphData>,
	/// Last flushed snapshot before trimming, re-trimmed when limits change.
	last_snapshot: Option<GraphData>,
	last_flush_ms: Option<f64>,
	interaction: Interaction,
	transform: ViewTransform,
	gesture: Gesture,
	last_tap: Option<(f64, f64, f64)>,
	dirty: Rc<Cell<bool>>,
	stopped: bool,
}

impl<L: ImageLoader> GraphOrchestrator<L> {
	/// Idle orchestrator; nothing reaches the engine until the first snapshot.
	pub fn new(worker: SimulationWorker, loader: L, theme: Theme, config: ResponsiveConfig) -> Self {
		let mut renderer = CanvasRenderer::new(loader, theme);
		renderer.options.enable_glow = config.enable_glow;
		let dirty = Rc::new(Cell::new(true));
		let flag = dirty.clone();
		renderer.images().set_on_ready(move || flag.set(true));

		let base_params = SimulationParams::default();
		let params = Self::params_for(&config, &base_params);
		Self {
			worker,
			renderer,
			config,
			base_params,
			params,
			nodes: Vec::new(),
			links: Vec::new(),
			positions: HashMap::new(),
			topology: None,
			pending: None,
			last_snapshot: None,
			last_flush_ms: None,
			interaction: Interaction::default(),
			transform: ViewTransform::default(),
			gesture: Gesture::Idle,
			last_tap: None,
			dirty,
			stopped: false,
		}
	}

	/// Starts from an explicit base, e.g. to override the tick rate.
	pub fn with_params(mut self, params: SimulationParams) -> Self {
		self.params = Self::params_for(&self.config, &params);
		self.base_params = params;
		self
	}

	fn params_for(config: &ResponsiveConfig, base: &SimulationParams) -> SimulationParams {
		let mut params = base.clone();
		params.link_distance = config.link_distance;
		if !config.enable_animations {
			params.alpha_decay = 1.0 - params.alpha_min.powf(1.0 / REDUCED_MOTION_TICKS);
		}
		params
	}

	/// Accepts a full snapshot. The first one goes out at once; later ones are
	/// held until the throttle interval has passed, newest first.
	pub fn submit_data(&mut self, data: GraphData, now_ms: f64) {
		if self.stopped {
			return;
		}
		let due = self
			.last_flush_ms
			.is_none_or(|last| now_ms - last >= self.config.data_throttle_ms);
		if due {
			self.pending = None;
			self.flush(data, now_ms);
		} else {
			self.pending = Some(data);
		}
	}

	fn flush(&mut self, data: GraphData, now_ms: f64) {
		self.last_snapshot = Some(data.clone());
		let GraphData { mut nodes, links } = sanitize(data, self.config.max_nodes, self.config.max_edges);
		self.last_flush_ms = Some(now_ms);

		let hash = topology_hash(&nodes, &links);
		{
			let present: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
			self.positions.retain(|id, _| present.contains(id.as_str()));
			if self.topology.as_deref() != Some(hash.as_str()) {
				debug!(
					"orchestrator: topology changed ({} nodes, {} links)",
					nodes.len(),
					links.len()
				);
				self.prune_interaction(&present, &links);
			}
		}
		for node in &mut nodes {
			match self.positions.get(&node.id) {
				Some(p) => node.set_position(*p),
				None => {
					if let Some(p) = node.position() {
						self.positions.insert(node.id.clone(), p);
					}
				}
			}
		}

		let cmd = if self.topology.is_none() {
			SimCommand::Init {
				nodes: nodes.clone(),
				links: links.clone(),
				width: self.config.canvas_width,
				height: self.config.canvas_height,
				params: self.params.clone(),
			}
		} else {
			SimCommand::UpdateData {
				nodes: nodes.clone(),
				links: links.clone(),
			}
		};
		self.worker.post(cmd);

		self.nodes = nodes;
		self.links = links;
		self.topology = Some(hash);
		self.dirty.set(true);
	}

	fn prune_interaction(&mut self, present: &HashSet<&str>, links: &[GraphLink]) {
		let gone = |id: &Option<String>| id.as_deref().is_some_and(|id| !present.contains(id));
		if gone(&self.interaction.hovered_node) {
			self.interaction.hovered_node = None;
		}
		if gone(&self.interaction.selected_node) {
			self.interaction.selected_node = None;
		}
		if let Some(key) = &self.interaction.hovered_link {
			if !links.iter().any(|l| l.key() == *key) {
				self.interaction.hovered_link = None;
			}
		}
		if let Gesture::Drag { id, .. } = &self.gesture {
			if !present.contains(id.as_str()) {
				self.gesture = Gesture::Idle;
			}
		}
	}

	/// Flushes a due snapshot and folds in worker ticks. Only the newest tick
	/// matters since each carries every position. Returns whether a frame is
	/// needed.
	pub fn pump(&mut self, now_ms: f64) -> bool {
		if self.stopped {
			return false;
		}
		if let Some(last) = self.last_flush_ms {
			if now_ms - last >= self.config.data_throttle_ms {
				if let Some(data) = self.pending.take() {
					self.flush(data, now_ms);
				}
			}
		}

		let latest = self
			.worker
			.poll()
			.into_iter()
			.last()
			.map(|SimEvent::Tick { positions }| positions);
		if let Some(positions) = latest {
			self.apply_positions(positions);
		}
		self.dirty.get()
	}

	fn apply_positions(&mut self, positions: Vec<(String, Point)>) {
		let dragged = match &self.gesture {
			Gesture::Drag { id, .. } => Some(id.as_str()),
			_ => None,
		};
		for (id, p) in positions {
			// The local pin is newer than anything the engine has reported.
			if dragged == Some(id.as_str()) || !p.is_finite() {
				continue;
			}
			self.positions.insert(id, p);
		}
		for node in &mut self.nodes {
			if let Some(p) = self.positions.get(&node.id) {
				node.set_position(*p);
			}
		}
		self.dirty.set(true);
	}

	/// Re-derives the device config and hands the new size and tuning to the
	/// engine. If the node or edge limits moved, the newest snapshot is
	/// trimmed again and flushed straight away.
	pub fn resize(&mut self, profile: &DeviceProfile) {
		if self.stopped {
			return;
		}
		let previous = std::mem::replace(&mut self.config, ResponsiveConfig::derive(profile));
		self.renderer.options.enable_glow = self.config.enable_glow;
		self.params = Self::params_for(&self.config, &self.base_params);
		if self.topology.is_some() {
			self.worker.post(SimCommand::UpdateDimensions {
				width: self.config.canvas_width,
				height: self.config.canvas_height,
				params: Some(self.params.clone()),
			});
		}

		let limits_changed =
			previous.max_nodes != self.config.max_nodes || previous.max_edges != self.config.max_edges;
		if limits_changed {
			if let Some(data) = self.pending.take().or_else(|| self.last_snapshot.take()) {
				debug!(
					"orchestrator: limits now {} nodes / {} edges, re-flushing",
					self.config.max_nodes, self.config.max_edges
				);
				self.flush(data, self.last_flush_ms.unwrap_or(0.0));
			}
		}
		self.dirty.set(true);
	}

	/// Topmost node under a screen point. Hovered and selected nodes are
	/// painted last, so they win ties.
	pub fn node_at(&self, sx: f64, sy: f64) -> Option<&GraphNode> {
		let p = self.transform.screen_to_graph(sx, sy);
		let active = |n: &GraphNode| {
			self.interaction.hovered_node.as_deref() == Some(n.id.as_str())
				|| self.interaction.selected_node.as_deref() == Some(n.id.as_str())
		};
		self.nodes
			.iter()
			.enumerate()
			.filter(|(_, n)| {
				n.position()
					.is_some_and(|c| (c.x - p.x).hypot(c.y - p.y) <= metrics::node_radius(n))
			})
			.max_by_key(|(i, n)| (active(*n), *i))
			.map(|(_, n)| n)
	}

	/// Closest link within [`LINK_HIT_PX`] of a screen point.
	pub fn link_at(&self, sx: f64, sy: f64) -> Option<&GraphLink> {
		let p = self.transform.screen_to_graph(sx, sy);
		let tolerance = LINK_HIT_PX / self.transform.k;
		self.links
			.iter()
			.filter_map(|link| {
				let a = self.positions.get(&link.source)?;
				let b = self.positions.get(&link.target)?;
				let d = segment_distance(p, *a, *b);
				(d <= tolerance).then_some((d, link))
			})
			.min_by(|(a, _), (b, _)| a.total_cmp(b))
			.map(|(_, link)| link)
	}

	/// Press: starts a node drag when over a node, a pan otherwise.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		if self.stopped {
			return;
		}
		match self.node_at(sx, sy).map(|n| n.id.clone()) {
			Some(id) => {
				let p = self.transform.screen_to_graph(sx, sy);
				self.worker.post(SimCommand::DragStart {
					id: id.clone(),
					x: p.x,
					y: p.y,
				});
				self.pin(&id, p);
				self.interaction.hovered_node = Some(id.clone());
				self.gesture = Gesture::Drag {
					id,
					start: (sx, sy),
					moved: false,
				};
			}
			None => {
				self.gesture = Gesture::Pan {
					start: (sx, sy),
					origin: (self.transform.x, self.transform.y),
					moved: false,
				};
			}
		}
		self.dirty.set(true);
	}

	/// Continues a gesture, or updates hover when none is active.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if self.stopped {
			return;
		}
		if self.gesture == Gesture::Idle {
			self.update_hover(sx, sy);
			return;
		}
		match &mut self.gesture {
			Gesture::Drag { id, start, moved } => {
				*moved |= Gesture::travelled(*start, sx, sy);
				let id = id.clone();
				let p = self.transform.screen_to_graph(sx, sy);
				self.worker.post(SimCommand::DragMove {
					id: id.clone(),
					x: p.x,
					y: p.y,
				});
				self.pin(&id, p);
			}
			Gesture::Pan { start, origin, moved } => {
				*moved |= Gesture::travelled(*start, sx, sy);
				self.transform.x = origin.0 + (sx - start.0);
				self.transform.y = origin.1 + (sy - start.1);
				self.dirty.set(true);
			}
			Gesture::Idle => {}
		}
	}

	fn update_hover(&mut self, sx: f64, sy: f64) {
		let hovered_node = self.node_at(sx, sy).map(|n| n.id.clone());
		let hovered_link = match hovered_node {
			Some(_) => None,
			None => self.link_at(sx, sy).map(GraphLink::key),
		};
		if hovered_node != self.interaction.hovered_node || hovered_link != self.interaction.hovered_link {
			self.interaction.hovered_node = hovered_node;
			self.interaction.hovered_link = hovered_link;
			self.dirty.set(true);
		}
	}

	/// Ends the current gesture. A press that never moved is a click: on a
	/// node it toggles selection, on the background it clears it (or zooms,
	/// on a double tap where enabled).
	pub fn pointer_up(&mut self, sx: f64, sy: f64, now_ms: f64) {
		if self.stopped {
			return;
		}
		match std::mem::take(&mut self.gesture) {
			Gesture::Drag { id, moved, .. } => {
				self.worker.post(SimCommand::DragEnd { id: id.clone() });
				if !moved {
					self.toggle_selection(id);
				}
			}
			Gesture::Pan { moved: false, .. } => {
				if self.is_double_tap(sx, sy, now_ms) {
					self.zoom_at(sx, sy, DOUBLE_TAP_ZOOM);
				} else if self.interaction.selected_node.take().is_some() {
					self.dirty.set(true);
				}
			}
			Gesture::Pan { .. } | Gesture::Idle => {}
		}
		self.dirty.set(true);
	}

	fn is_double_tap(&mut self, sx: f64, sy: f64, now_ms: f64) -> bool {
		if !self.config.double_tap_zoom {
			return false;
		}
		let hit = self.last_tap.is_some_and(|(t, x, y)| {
			now_ms - t <= DOUBLE_TAP_MS && (sx - x).hypot(sy - y) <= DOUBLE_TAP_PX
		});
		self.last_tap = if hit { None } else { Some((now_ms, sx, sy)) };
		hit
	}

	/// Pointer left the canvas: drop hover and finish any gesture.
	pub fn pointer_leave(&mut self) {
		if let Gesture::Drag { id, .. } = std::mem::take(&mut self.gesture) {
			self.worker.post(SimCommand::DragEnd { id });
		}
		self.interaction.hovered_node = None;
		self.interaction.hovered_link = None;
		self.dirty.set(true);
	}

	/// Wheel zoom around the pointer.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.zoom_at(sx, sy, factor);
	}

	/// Scales the view by `factor`, keeping the graph point under `(sx, sy)` fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = k;
		self.dirty.set(true);
	}

	fn toggle_selection(&mut self, id: String) {
		self.interaction.selected_node = match self.interaction.selected_node.take() {
			Some(current) if current == id => None,
			_ => Some(id),
		};
		self.dirty.set(true);
	}

	fn pin(&mut self, id: &str, p: Point) {
		self.positions.insert(id.to_string(), p);
		if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
			node.set_position(p);
		}
		self.dirty.set(true);
	}

	/// Clears the dirty flag, reporting whether a frame was wanted.
	pub fn take_redraw(&self) -> bool {
		self.dirty.replace(false)
	}

	/// Forces the next frame to paint.
	pub fn request_redraw(&self) {
		self.dirty.set(true);
	}

	/// Paints the current state.
	pub fn render<C>(&self, ctx: &C)
	where
		C: DrawContext<Image = L::Image>,
	{
		self.renderer.render(
			ctx,
			&self.nodes,
			&self.links,
			self.config.canvas_width,
			self.config.canvas_height,
			&self.transform,
			&self.interaction,
		);
	}

	/// Stops the engine and releases cached images. Idempotent.
	pub fn stop(&mut self) {
		if self.stopped {
			return;
		}
		self.stopped = true;
		self.worker.stop();
		self.renderer.release();
		self.pending = None;
		debug!("orchestrator: stopped");
	}

	/// Nodes as last flushed, with the latest known positions.
	pub fn nodes(&self) -> &[GraphNode] {
		&self.nodes
	}

	/// Links as last flushed.
	pub fn links(&self) -> &[GraphLink] {
		&self.links
	}

	/// Latest position of `id`, local drag pin included.
	pub fn position(&self, id: &str) -> Option<Point> {
		self.positions.get(id).copied()
	}

	/// Hover and selection.
	pub fn interaction(&self) -> &Interaction {
		&self.interaction
	}

	/// Edge under the pointer.
	pub fn hovered_link(&self) -> Option<&LinkKey> {
		self.interaction.hovered_link.as_ref()
	}

	/// Current pan and zoom.
	pub fn transform(&self) -> &ViewTransform {
		&self.transform
	}

	/// Device config in effect.
	pub fn config(&self) -> &ResponsiveConfig {
		&self.config
	}

	/// Tuning sent to the engine, after device adjustments.
	pub fn params(&self) -> &SimulationParams {
		&self.params
	}

	/// The renderer and its image cache.
	pub fn renderer(&self) -> &CanvasRenderer<L> {
		&self.renderer
	}

	/// Topology hash of the last flushed snapshot.
	pub fn topology(&self) -> Option<&str> {
		self.topology.as_deref()
	}

	/// A throttled snapshot is waiting to be flushed.
	pub fn has_pending_data(&self) -> bool {
		self.pending.is_some()
	}

	/// A node is pinned under the pointer.
	pub fn is_dragging(&self) -> bool {
		matches!(self.gesture, Gesture::Drag { .. })
	}

	/// [`GraphOrchestrator::stop`] has run.
	pub fn is_stopped(&self) -> bool {
		self.stopped
	}
}

impl<L: ImageLoader> Drop for GraphOrchestrator<L> {
	fn drop(&mut self) {
		self.stop();
	}
}
