//! trade-graph: Real-time token/KOL relationship graph.
//!
//! This crate provides a WASM-based visualization of trading relationships
//! between tokens and key opinion leaders, with an off-thread force layout,
//! pan/zoom, drag, and hover focus.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, Event, HtmlScriptElement};

pub mod components;

pub use components::relationship_graph::{
	GraphData, GraphError, GraphLink, GraphNode, RelationshipGraphCanvas,
};

/// DOM event carrying a fresh snapshot in its `detail`.
pub const UPDATE_EVENT: &str = "graph-update";

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("trade-graph: logging initialized");
}

/// Parses a JSON snapshot: `{ nodes: [...], links: [...] }`.
pub fn parse_snapshot(json: &str) -> Result<GraphData, GraphError> {
	Ok(serde_json::from_str(json)?)
}

/// Load the initial snapshot from a script element with id="graph-data".
fn load_graph_data() -> Result<GraphData, GraphError> {
	let missing = || GraphError::MissingElement("script#graph-data".into());
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| GraphError::MissingElement("document".into()))?;
	let script: HtmlScriptElement = document
		.get_element_by_id("graph-data")
		.ok_or_else(missing)?
		.dyn_into()
		.map_err(|_| missing())?;
	let json_text = script.text().map_err(|_| missing())?;

	let data = parse_snapshot(&json_text)?;
	info!(
		"trade-graph: loaded {} nodes, {} links",
		data.nodes.len(),
		data.links.len()
	);
	Ok(data)
}

/// A `graph-update` detail may be a JSON string or a plain object.
fn snapshot_from_event(event: &CustomEvent) -> Result<GraphData, GraphError> {
	let detail = event.detail();
	let json = match detail.as_string() {
		Some(text) => text,
		None => js_sys::JSON::stringify(&detail)
			.map(String::from)
			.map_err(|e| GraphError::EventDetail(format!("{e:?}")))?,
	};
	parse_snapshot(&json)
}

/// Feeds `graph-update` events into the data signal for the page's lifetime.
fn listen_for_updates(set_graph: WriteSignal<GraphData>) {
	let Some(window) = web_sys::window() else {
		return;
	};
	let on_update = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
		let Some(ev) = ev.dyn_ref::<CustomEvent>() else {
			return;
		};
		match snapshot_from_event(ev) {
			Ok(data) => {
				debug!(
					"trade-graph: update with {} nodes, {} links",
					data.nodes.len(),
					data.links.len()
				);
				set_graph.set(data);
			}
			Err(e) => warn!("trade-graph: ignoring update: {e}"),
		}
	});
	let _ = window.add_event_listener_with_callback(UPDATE_EVENT, on_update.as_ref().unchecked_ref());
	on_update.forget();
}

/// Main application component.
/// Loads the initial snapshot from the DOM and renders the live graph.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let initial = load_graph_data().unwrap_or_else(|e| {
		warn!("trade-graph: {e}; starting empty");
		GraphData::default()
	});
	let (graph, set_graph) = signal(initial);
	listen_for_updates(set_graph);

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="KOL Trade Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<RelationshipGraphCanvas data=graph fullscreen=true />
			<div class="graph-overlay">
				<h1>"KOL Trade Graph"</h1>
				<p class="subtitle">"Drag nodes to reposition. Scroll or double-tap to zoom. Click to focus."</p>
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_snapshot_json() {
		let data = parse_snapshot(r#"{"nodes":[{"id":"SOL","type":"token"}],"links":[]}"#).unwrap();
		assert_eq!(data.nodes.len(), 1);
	}

	#[test]
	fn bad_snapshot_is_an_error() {
		assert!(matches!(parse_snapshot("{nodes:"), Err(GraphError::Snapshot(_))));
	}
}
