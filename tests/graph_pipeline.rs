//! Drives data, worker, layout and renderer together through the public API.

#![allow(unused_crate_dependencies)]

use std::cell::RefCell;
use std::thread;
use std::time::{Duration, Instant};

use trade_graph::components::relationship_graph::image_cache::NoImages;
use trade_graph::components::relationship_graph::protocol::{SimCommand, SimEvent};
use trade_graph::components::relationship_graph::render::{self, DrawContext, NODE_OPACITY_DIMMED, RenderOptions};
use trade_graph::components::relationship_graph::worker::{Engine, SimulationWorker};
use trade_graph::components::relationship_graph::{
	GraphOrchestrator, NodeKind, Point, ResponsiveConfig, Theme,
};
use trade_graph::{GraphData, GraphLink, GraphNode, parse_snapshot};

#[derive(Clone, Debug, PartialEq)]
enum Op {
	LineWidth(f64),
	MoveTo(f64, f64),
	Arc(f64, f64, f64),
}

#[derive(Default)]
struct Recorder {
	ops: RefCell<Vec<Op>>,
}

impl Recorder {
	fn edge_widths(&self) -> Vec<f64> {
		let ops = self.ops.borrow();
		let mut width = 0.0;
		let mut widths = Vec::new();
		for op in ops.iter() {
			match op {
				Op::LineWidth(w) => width = *w,
				Op::MoveTo(..) => widths.push(width),
				Op::Arc(..) => {}
			}
		}
		widths
	}

	fn arcs(&self) -> usize {
		self.ops.borrow().iter().filter(|op| matches!(op, Op::Arc(..))).count()
	}
}

impl DrawContext for Recorder {
	type Image = ();

	fn save(&self) {}
	fn restore(&self) {}
	fn clear_rect(&self, _: f64, _: f64, _: f64, _: f64) {}
	fn fill_rect(&self, _: f64, _: f64, _: f64, _: f64) {}
	fn translate(&self, _: f64, _: f64) {}
	fn scale(&self, _: f64) {}
	fn set_global_alpha(&self, _: f64) {}
	fn set_fill_style(&self, _: &str) {}
	fn set_stroke_style(&self, _: &str) {}
	fn set_stroke_gradient(&self, _: f64, _: f64, _: f64, _: f64, _: &[(f64, String)]) {}
	fn set_line_width(&self, width: f64) {
		self.ops.borrow_mut().push(Op::LineWidth(width));
	}
	fn set_line_dash(&self, _: &[f64]) {}
	fn set_shadow(&self, _: f64, _: &str) {}
	fn begin_path(&self) {}
	fn move_to(&self, x: f64, y: f64) {
		self.ops.borrow_mut().push(Op::MoveTo(x, y));
	}
	fn line_to(&self, _: f64, _: f64) {}
	fn arc(&self, x: f64, y: f64, radius: f64) {
		self.ops.borrow_mut().push(Op::Arc(x, y, radius));
	}
	fn stroke(&self) {}
	fn fill(&self) {}
	fn clip(&self) {}
	fn set_font(&self, _: &str) {}
	fn set_text_align(&self, _: &str) {}
	fn stroke_text(&self, _: &str, _: f64, _: f64) {}
	fn fill_text(&self, _: &str, _: f64, _: f64) {}
	fn draw_image(&self, _: &(), _: f64, _: f64, _: f64, _: f64) {}
}

const SNAPSHOT: &str = r#"{
	"nodes": [
		{"id": "SOL", "type": "token", "connections": 3, "value": 60},
		{"id": "kolA", "type": "kol", "influenceScore": 80, "tradeCount": 12}
	],
	"links": [{"source": "SOL", "target": "kolA", "tradeCount": 12, "volume": 5.2}]
}"#;

fn orchestrator(worker: SimulationWorker) -> GraphOrchestrator<NoImages> {
	GraphOrchestrator::new(worker, NoImages, Theme::default(), ResponsiveConfig::default())
}

fn run(o: &mut GraphOrchestrator<NoImages>, frames: usize) {
	for _ in 0..frames {
		o.pump(0.0);
	}
}

fn finite(p: Option<Point>) -> bool {
	p.is_some_and(|p| p.is_finite())
}

#[test]
fn hovered_edge_renders_between_placed_nodes() {
	let data = parse_snapshot(SNAPSHOT).unwrap();
	assert_eq!(data.nodes[1].kind, NodeKind::Kol);

	let mut o = orchestrator(SimulationWorker::inline());
	o.submit_data(data, 0.0);
	run(&mut o, 10);
	assert!(finite(o.position("SOL")));
	assert!(finite(o.position("kolA")));

	let (x, y) = o.transform().graph_to_screen(o.position("SOL").unwrap());
	o.pointer_move(x, y);
	assert_eq!(o.interaction().hovered_node.as_deref(), Some("SOL"));

	let ctx = Recorder::default();
	o.render(&ctx);
	let widths = ctx.edge_widths();
	assert_eq!(widths.len(), 1);
	assert!((widths[0] - 12f64.sqrt() * 1.5).abs() < 1e-9);
	assert!((widths[0] - 5.196).abs() < 1e-3);
	assert!(ctx.arcs() > 0);
}

#[test]
fn structural_update_keeps_existing_positions() {
	let mut o = orchestrator(SimulationWorker::inline());
	o.submit_data(parse_snapshot(SNAPSHOT).unwrap(), 0.0);
	run(&mut o, 15);
	let sol = o.position("SOL").unwrap();
	let hash = o.topology().map(str::to_owned);

	let mut grown = parse_snapshot(SNAPSHOT).unwrap();
	grown.nodes.push(GraphNode::token("BONK"));
	grown.links.push(GraphLink::new("BONK", "kolA"));
	o.submit_data(grown, 10_000.0);

	assert_ne!(o.topology().map(str::to_owned), hash);
	let merged = o.nodes().iter().find(|n| n.id == "SOL").unwrap();
	assert_eq!(merged.position(), Some(sol));

	run(&mut o, 5);
	assert!(finite(o.position("BONK")));
}

#[test]
fn hover_dims_only_unrelated_nodes() {
	let mut data = parse_snapshot(SNAPSHOT).unwrap();
	data.nodes.push(GraphNode::kol("loner"));
	let mut o = orchestrator(SimulationWorker::inline());
	o.submit_data(data, 0.0);
	run(&mut o, 20);

	let (x, y) = o.transform().graph_to_screen(o.position("kolA").unwrap());
	o.pointer_move(x, y);
	let plan = render::plan_frame(
		o.nodes(),
		o.links(),
		o.interaction(),
		&Theme::default(),
		&RenderOptions::default(),
	);
	assert_eq!(plan.node("kolA").unwrap().opacity, 1.0);
	assert_eq!(plan.node("SOL").unwrap().opacity, 1.0);
	assert_eq!(plan.node("loner").unwrap().opacity, NODE_OPACITY_DIMMED);
}

#[test]
fn dragged_node_follows_pointer_exactly() {
	let mut o = orchestrator(SimulationWorker::inline());
	o.submit_data(parse_snapshot(SNAPSHOT).unwrap(), 0.0);
	run(&mut o, 10);

	let (x, y) = o.transform().graph_to_screen(o.position("kolA").unwrap());
	o.pointer_down(x, y);
	for step in 1..=5 {
		let (sx, sy) = (x + step as f64 * 10.0, y - step as f64 * 4.0);
		o.pointer_move(sx, sy);
		o.pump(0.0);
		assert_eq!(o.position("kolA"), Some(o.transform().screen_to_graph(sx, sy)));
	}
	o.pointer_up(x + 50.0, y - 20.0, 100.0);
	assert!(!o.is_dragging());
}

#[test]
fn threaded_worker_feeds_the_orchestrator() {
	let worker = SimulationWorker::try_spawn().unwrap();
	let mut o = orchestrator(worker);
	o.submit_data(parse_snapshot(SNAPSHOT).unwrap(), 0.0);

	let deadline = Instant::now() + Duration::from_secs(5);
	while !finite(o.position("kolA")) && Instant::now() < deadline {
		o.pump(0.0);
		thread::sleep(Duration::from_millis(5));
	}
	assert!(finite(o.position("SOL")));
	assert!(finite(o.position("kolA")));
	o.stop();
	assert!(o.is_stopped());
}

#[test]
fn protocol_survives_a_json_boundary() {
	let data: GraphData = parse_snapshot(SNAPSHOT).unwrap();
	let init = SimCommand::Init {
		nodes: data.nodes,
		links: data.links,
		width: 800.0,
		height: 600.0,
		params: Default::default(),
	};
	let wire = serde_json::to_string(&init).unwrap();
	let mut engine = Engine::new();
	engine.handle(serde_json::from_str(&wire).unwrap());

	let tick = engine.step().unwrap();
	let json = serde_json::to_value(&tick).unwrap();
	assert_eq!(json["type"], "TICK");
	let back: SimEvent = serde_json::from_value(json).unwrap();
	let SimEvent::Tick { positions } = back;
	assert_eq!(positions.len(), 2);
	assert!(positions.iter().all(|(_, p)| p.is_finite()));
}

#[test]
fn empty_snapshot_is_a_quiet_steady_state() {
	let mut o = orchestrator(SimulationWorker::inline());
	o.submit_data(GraphData::default(), 0.0);
	run(&mut o, 3);
	let ctx = Recorder::default();
	o.render(&ctx);
	assert_eq!(ctx.arcs(), 0);
	assert!(ctx.edge_widths().is_empty());
}
