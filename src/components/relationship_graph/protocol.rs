//! Messages exchanged between the orchestrator and the simulation engine.
//!
//! Every message is a plain owned value with a `type` discriminant on the
//! wire, so the same protocol works across a thread, a worker boundary, or an
//! in-process call.

use serde::{Deserialize, Serialize};

use super::simulation::SimulationParams;
use super::types::{GraphLink, GraphNode, Point};

/// Orchestrator to engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimCommand {
	/// Cold start, replacing any existing layout.
	Init {
		/// Sanitized nodes, with carried positions where known.
		nodes: Vec<GraphNode>,
		/// Links between the given nodes.
		links: Vec<GraphLink>,
		/// Canvas width in CSS pixels.
		width: f64,
		/// Canvas height in CSS pixels.
		height: f64,
		/// Tuning; defaults when omitted.
		#[serde(default)]
		params: SimulationParams,
	},
	/// Soft update: positions carry over by id.
	UpdateData {
		/// Full node array.
		nodes: Vec<GraphNode>,
		/// Full link array.
		links: Vec<GraphLink>,
	},
	/// New canvas size. `params`, when present, replaces the engine's tuning
	/// in place (e.g. after a breakpoint change).
	UpdateDimensions {
		/// Canvas width in CSS pixels.
		width: f64,
		/// Canvas height in CSS pixels.
		height: f64,
		/// Replacement tuning.
		#[serde(default)]
		params: Option<SimulationParams>,
	},
	/// Pins a node at the pointer.
	DragStart {
		/// Dragged node.
		id: String,
		/// Pointer x in graph space.
		x: f64,
		/// Pointer y in graph space.
		y: f64,
	},
	/// Moves the pinned node.
	DragMove {
		/// Dragged node.
		id: String,
		/// Pointer x in graph space.
		x: f64,
		/// Pointer y in graph space.
		y: f64,
	},
	/// Releases the pin.
	DragEnd {
		/// Released node.
		id: String,
	},
	/// Halts the tick loop for good.
	Stop,
}

/// Engine to orchestrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimEvent {
	/// Positions after one tick.
	Tick {
		/// `(id, position)` for every placed node.
		positions: Vec<(String, Point)>,
	},
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn commands_use_type_tags() {
		let cmd = SimCommand::DragStart {
			id: "SOL".into(),
			x: 1.0,
			y: 2.0,
		};
		let json = serde_json::to_value(&cmd).unwrap();
		assert_eq!(json["type"], "DRAG_START");
		assert_eq!(json["id"], "SOL");

		let stop = serde_json::to_string(&SimCommand::Stop).unwrap();
		assert_eq!(stop, r#"{"type":"STOP"}"#);

		let dims = serde_json::to_value(SimCommand::UpdateDimensions {
			width: 10.0,
			height: 20.0,
			params: None,
		})
		.unwrap();
		assert_eq!(dims["type"], "UPDATE_DIMENSIONS");
	}

	#[test]
	fn dimension_params_are_optional() {
		let json = r#"{"type":"UPDATE_DIMENSIONS","width":390,"height":500}"#;
		let cmd: SimCommand = serde_json::from_str(json).unwrap();
		assert_eq!(
			cmd,
			SimCommand::UpdateDimensions {
				width: 390.0,
				height: 500.0,
				params: None,
			}
		);

		let json = r#"{"type":"UPDATE_DIMENSIONS","width":390,"height":500,"params":{"linkDistance":80}}"#;
		match serde_json::from_str(json).unwrap() {
			SimCommand::UpdateDimensions { params: Some(p), .. } => {
				assert_eq!(p.link_distance, 80.0);
				assert_eq!(p.velocity_decay, SimulationParams::default().velocity_decay);
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn init_params_default_when_absent() {
		let json = r#"{"type":"INIT","nodes":[],"links":[],"width":800,"height":600}"#;
		let cmd: SimCommand = serde_json::from_str(json).unwrap();
		match cmd {
			SimCommand::Init { params, width, .. } => {
				assert_eq!(params, SimulationParams::default());
				assert_eq!(width, 800.0);
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn tick_positions_are_id_point_pairs() {
		let tick = SimEvent::Tick {
			positions: vec![("SOL".into(), Point::new(1.5, -2.0))],
		};
		assert_eq!(
			serde_json::to_string(&tick).unwrap(),
			r#"{"type":"TICK","positions":[["SOL",{"x":1.5,"y":-2.0}]]}"#
		);
	}
}
