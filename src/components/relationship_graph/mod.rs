//! Real-time token/KOL relationship graph.
//!
//! Renders trading relationships between tokens and key opinion leaders on an
//! HTML canvas with:
//! - Force-directed layout on its own thread, driven by a message protocol
//! - Soft data updates that keep positions and skip reheats for cosmetic changes
//! - Pan, zoom, drag, hover focus and click selection
//! - Device-aware limits and effects
//!
//! # Example
//!
//! ```ignore
//! use trade_graph::{GraphData, GraphLink, GraphNode, RelationshipGraphCanvas};
//!
//! let data = GraphData {
//!     nodes: vec![GraphNode::token("SOL"), GraphNode::kol("kolA")],
//!     links: vec![GraphLink::new("SOL", "kolA")],
//! };
//!
//! view! { <RelationshipGraphCanvas data=Signal::derive(move || data.clone()) fullscreen=true /> }
//! ```

pub mod canvas;
mod component;
pub mod error;
pub mod image_cache;
pub mod metrics;
pub mod orchestrator;
pub mod protocol;
pub mod render;
pub mod responsive;
pub mod simulation;
pub mod theme;
pub mod topology;
mod types;
pub mod worker;

pub use component::RelationshipGraphCanvas;
pub use error::GraphError;
pub use orchestrator::GraphOrchestrator;
pub use responsive::{DeviceProfile, ResponsiveConfig};
pub use theme::Theme;
pub use topology::topology_hash;
pub use types::{GraphData, GraphLink, GraphNode, LinkKey, NodeKind, Point};
