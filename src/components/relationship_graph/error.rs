//! Errors raised at the edges of the graph engine.
//!
//! The engine itself never fails: bad links are inert and failed images fall
//! back to placeholders. These variants cover the host boundary only.

use thiserror::Error;

/// Failure at the host boundary (threads, DOM, inbound JSON).
#[derive(Debug, Error)]
pub enum GraphError {
	/// The OS refused a simulation thread.
	#[error("failed to spawn simulation thread: {0}")]
	WorkerSpawn(#[from] std::io::Error),
	/// Inbound JSON did not match the snapshot shape.
	#[error("invalid graph snapshot: {0}")]
	Snapshot(#[from] serde_json::Error),
	/// A required DOM element was not found.
	#[error("missing DOM element `{0}`")]
	MissingElement(String),
	/// The canvas would not hand out a 2-D context.
	#[error("canvas 2d context unavailable: {0}")]
	CanvasContext(String),
	/// A `graph-update` event carried no usable detail.
	#[error("unreadable event detail: {0}")]
	EventDetail(String),
}
