//! Canvas rendering for the relationship graph.
//!
//! A frame is produced in two steps. [`plan_frame`] resolves node positions,
//! styles every edge and node from the interaction state and orders them for
//! z-ordering; [`CanvasRenderer::paint`] then draws it:
//! 1. Clear, then pan and zoom (world space)
//! 2. Edges, with hovered/connected edges on top
//! 3. Nodes (glow, fill, image or placeholder ring, border, label), with
//!    hovered/selected nodes on top
//!
//! The renderer keeps no position state of its own; only the image cache
//! persists between frames.

use std::collections::{HashMap, HashSet};

use super::image_cache::{ImageCache, ImageLoader};
use super::metrics::{self, GLOW_VALUE_THRESHOLD, LABEL_MIN_RADIUS};
use super::theme::{Color, Theme};
use super::types::{GraphLink, GraphNode, LinkKey, NodeKind, Point};

/// Resting edge opacity.
pub const EDGE_OPACITY: f64 = 0.15;
/// Edges touching the focused node.
pub const EDGE_OPACITY_ACTIVE: f64 = 0.8;
/// Edges away from the focused node.
pub const EDGE_OPACITY_FADED: f64 = 0.05;
/// Nodes that are neither focused nor adjacent to the focus.
pub const NODE_OPACITY_DIMMED: f64 = 0.3;
const GLOW_ACTIVE: f64 = 20.0;
const GLOW_AMBIENT: f64 = 10.0;
const IMAGE_SCALE: f64 = 0.85;
const PLACEHOLDER_SCALE: f64 = 0.6;
const LABEL_GAP: f64 = 14.0;

/// The subset of the 2-D canvas API the renderer draws with.
///
/// Methods take `&self` like the browser context they mirror.
pub trait DrawContext {
	/// Decoded image type accepted by [`DrawContext::draw_image`].
	type Image;

	/// Pushes the drawing state.
	fn save(&self);
	/// Pops the drawing state.
	fn restore(&self);
	/// Clears to transparent.
	fn clear_rect(&self, x: f64, y: f64, w: f64, h: f64);
	/// Fills a rectangle with the fill style.
	fn fill_rect(&self, x: f64, y: f64, w: f64, h: f64);
	/// Moves the origin.
	fn translate(&self, x: f64, y: f64);
	/// Uniform scale.
	fn scale(&self, k: f64);
	/// Opacity applied to everything drawn next.
	fn set_global_alpha(&self, alpha: f64);
	/// CSS color for fills.
	fn set_fill_style(&self, css: &str);
	/// CSS color for strokes.
	fn set_stroke_style(&self, css: &str);
	/// Linear gradient stroke from `(x0, y0)` to `(x1, y1)`.
	fn set_stroke_gradient(&self, x0: f64, y0: f64, x1: f64, y1: f64, stops: &[(f64, String)]);
	/// Stroke width in current units.
	fn set_line_width(&self, width: f64);
	/// Empty `segments` draws solid lines.
	fn set_line_dash(&self, segments: &[f64]);
	/// `blur == 0` disables the shadow.
	fn set_shadow(&self, blur: f64, css: &str);
	/// Starts a new path.
	fn begin_path(&self);
	/// Starts a sub-path.
	fn move_to(&self, x: f64, y: f64);
	/// Adds a straight segment.
	fn line_to(&self, x: f64, y: f64);
	/// Full circle.
	fn arc(&self, x: f64, y: f64, radius: f64);
	/// Strokes the current path.
	fn stroke(&self);
	/// Fills the current path.
	fn fill(&self);
	/// Clips to the current path until the next `restore`.
	fn clip(&self);
	/// CSS font shorthand.
	fn set_font(&self, font: &str);
	/// `left`, `center` or `right`.
	fn set_text_align(&self, align: &str);
	/// Outlines text.
	fn stroke_text(&self, text: &str, x: f64, y: f64);
	/// Fills text.
	fn fill_text(&self, text: &str, x: f64, y: f64);
	/// Draws `image` scaled into the given box.
	fn draw_image(&self, image: &Self::Image, x: f64, y: f64, w: f64, h: f64);
}

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal pan in screen pixels.
	pub x: f64,
	/// Vertical pan in screen pixels.
	pub y: f64,
	/// Zoom factor (1.0 = 100%).
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	/// Canvas pixel to graph space.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		Point::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Graph space to canvas pixel.
	pub fn graph_to_screen(&self, p: Point) -> (f64, f64) {
		(p.x * self.k + self.x, p.y * self.k + self.y)
	}
}

/// Hover and selection state, owned by the orchestrator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Interaction {
	/// Node under the pointer.
	pub hovered_node: Option<String>,
	/// Clicked node; takes precedence over hover for focus.
	pub selected_node: Option<String>,
	/// Edge under the pointer.
	pub hovered_link: Option<LinkKey>,
}

/// Feature toggles from the responsive configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
	/// Shadow glow around active and high-value nodes.
	pub enable_glow: bool,
}

impl Default for RenderOptions {
	fn default() -> Self {
		Self { enable_glow: true }
	}
}

/// A styled, resolved edge ready to paint.
#[derive(Clone, Debug)]
pub struct EdgeDraw<'a> {
	/// Source link.
	pub link: &'a GraphLink,
	/// Resolved source position.
	pub from: Point,
	/// Resolved target position.
	pub to: Point,
	/// Global alpha for the stroke.
	pub opacity: f64,
	/// Stroke width.
	pub width: f64,
	/// Touches the focused node.
	pub emphasised: bool,
}

/// A styled, resolved node ready to paint.
#[derive(Clone, Debug)]
pub struct NodeDraw<'a> {
	/// Source node.
	pub node: &'a GraphNode,
	/// Resolved position.
	pub at: Point,
	/// Screen-independent radius in graph units.
	pub radius: f64,
	/// Fill color before opacity.
	pub fill: Color,
	/// Global alpha, dimmed away from the focus.
	pub opacity: f64,
	/// Shadow blur, when the node glows.
	pub glow: Option<f64>,
	/// Hovered or selected.
	pub active: bool,
	/// Verified or active.
	pub bright_border: bool,
	/// Caption, drawn for active or well-connected nodes only.
	pub label: Option<String>,
}

/// Draw order for one frame: edges first, then nodes, each back to front.
#[derive(Clone, Debug, Default)]
pub struct FramePlan<'a> {
	/// Edges, painted first.
	pub edges: Vec<EdgeDraw<'a>>,
	/// Nodes, with active ones last.
	pub nodes: Vec<NodeDraw<'a>>,
}

impl<'a> FramePlan<'a> {
	/// Planned draw for `id`, if it is drawn at all.
	pub fn node(&self, id: &str) -> Option<&NodeDraw<'a>> {
		self.nodes.iter().find(|n| n.node.id == id)
	}
}

fn node_fill(node: &GraphNode, theme: &Theme) -> Color {
	if node.is_trending {
		return theme.accent_primary;
	}
	match node.kind {
		NodeKind::Token => theme.token_scale.color(node.connections as f64),
		NodeKind::Kol => theme.kol_scale.color(node.influence_score),
	}
}

/// Resolves and styles everything drawable. Nodes without a position, and
/// links touching them or naming unknown ids, are left out.
pub fn plan_frame<'a>(
	nodes: &'a [GraphNode],
	links: &'a [GraphLink],
	interaction: &Interaction,
	theme: &Theme,
	options: &RenderOptions,
) -> FramePlan<'a> {
	let by_id: HashMap<&str, &GraphNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
	let hovered = interaction.hovered_node.as_deref();
	let selected = interaction.selected_node.as_deref();

	let focus: Option<HashSet<&str>> = hovered.map(|h| {
		let mut set: HashSet<&str> = HashSet::from([h]);
		for link in links.iter().filter(|l| l.touches(h)) {
			set.insert(link.source.as_str());
			set.insert(link.target.as_str());
		}
		set
	});

	let mut edges: Vec<EdgeDraw<'a>> = links
		.iter()
		.filter_map(|link| {
			let from = by_id.get(link.source.as_str())?.position()?;
			let to = by_id.get(link.target.as_str())?.position()?;
			let connected = hovered.is_some_and(|h| link.touches(h));
			let is_hovered = interaction
				.hovered_link
				.as_ref()
				.is_some_and(|k| *k == link.key());
			let emphasised = connected || is_hovered;
			let opacity = if emphasised {
				EDGE_OPACITY_ACTIVE
			} else if hovered.is_some() {
				EDGE_OPACITY_FADED
			} else {
				EDGE_OPACITY
			};
			Some(EdgeDraw {
				link,
				from,
				to,
				opacity,
				width: metrics::link_width(link, emphasised),
				emphasised,
			})
		})
		.collect();
	edges.sort_by_key(|e| e.emphasised);

	let mut drawn: Vec<NodeDraw<'a>> = nodes
		.iter()
		.filter_map(|node| {
			let at = node.position()?;
			let id = node.id.as_str();
			let active = hovered == Some(id) || selected == Some(id);
			let radius = metrics::node_radius(node);
			let opacity = match &focus {
				Some(set) if !set.contains(id) => NODE_OPACITY_DIMMED,
				_ => 1.0,
			};
			let glow = if !options.enable_glow {
				None
			} else if active {
				Some(GLOW_ACTIVE)
			} else if node.value > GLOW_VALUE_THRESHOLD {
				Some(GLOW_AMBIENT)
			} else {
				None
			};
			Some(NodeDraw {
				node,
				at,
				radius,
				fill: node_fill(node, theme),
				opacity,
				glow,
				active,
				bright_border: active || node.is_verified,
				label: (active || radius > LABEL_MIN_RADIUS).then(|| node.caption()),
			})
		})
		.collect();
	drawn.sort_by_key(|n| n.active);

	FramePlan {
		edges,
		nodes: drawn,
	}
}

/// Per-frame draw routine plus the image cache it owns.
pub struct CanvasRenderer<L: ImageLoader> {
	images: ImageCache<L>,
	/// Colors and fonts.
	pub theme: Theme,
	/// Effects enabled for this device.
	pub options: RenderOptions,
}

impl<L: ImageLoader> CanvasRenderer<L> {
	/// Renderer with an empty image cache.
	pub fn new(loader: L, theme: Theme) -> Self {
		Self {
			images: ImageCache::new(loader),
			theme,
			options: RenderOptions::default(),
		}
	}

	/// The avatar cache, e.g. to hook its ready callback.
	pub fn images(&self) -> &ImageCache<L> {
		&self.images
	}

	/// Releases every cached image.
	pub fn release(&self) {
		self.images.clear();
	}

	/// Paints one frame. Empty inputs clear the canvas and draw nothing else.
	#[allow(clippy::too_many_arguments)]
	pub fn render<C>(
		&self,
		ctx: &C,
		nodes: &[GraphNode],
		links: &[GraphLink],
		width: f64,
		height: f64,
		transform: &ViewTransform,
		interaction: &Interaction,
	) where
		C: DrawContext<Image = L::Image>,
	{
		let plan = plan_frame(nodes, links, interaction, &self.theme, &self.options);
		self.paint(ctx, &plan, width, height, transform);
	}

	/// Draws a prepared plan.
	pub fn paint<C>(&self, ctx: &C, plan: &FramePlan<'_>, width: f64, height: f64, transform: &ViewTransform)
	where
		C: DrawContext<Image = L::Image>,
	{
		ctx.save();
		ctx.clear_rect(0.0, 0.0, width, height);
		if let Some(bg) = self.theme.background {
			ctx.set_fill_style(&bg.to_css());
			ctx.fill_rect(0.0, 0.0, width, height);
		}
		ctx.translate(transform.x, transform.y);
		ctx.scale(transform.k);

		for edge in &plan.edges {
			self.draw_edge(ctx, edge);
		}
		for node in &plan.nodes {
			self.draw_node(ctx, node);
		}

		ctx.set_global_alpha(1.0);
		ctx.restore();
	}

	fn draw_edge<C: DrawContext>(&self, ctx: &C, edge: &EdgeDraw<'_>) {
		let stops = [
			(0.0, self.theme.accent_primary.to_css()),
			(1.0, self.theme.accent_secondary.to_css()),
		];
		ctx.set_global_alpha(edge.opacity);
		ctx.set_stroke_gradient(edge.from.x, edge.from.y, edge.to.x, edge.to.y, &stops);
		ctx.set_line_width(edge.width);
		ctx.begin_path();
		ctx.move_to(edge.from.x, edge.from.y);
		ctx.line_to(edge.to.x, edge.to.y);
		ctx.stroke();
	}

	fn draw_node<C>(&self, ctx: &C, draw: &NodeDraw<'_>)
	where
		C: DrawContext<Image = L::Image>,
	{
		let theme = &self.theme;
		let Point { x, y } = draw.at;
		let r = draw.radius;
		ctx.set_global_alpha(draw.opacity);

		if let Some(blur) = draw.glow {
			let color = if draw.active {
				theme.glow
			} else {
				draw.fill.lighten(0.2).with_alpha(0.8)
			};
			ctx.set_shadow(blur, &color.to_css());
		}
		ctx.begin_path();
		ctx.arc(x, y, r);
		ctx.set_fill_style(&draw.fill.to_css());
		ctx.fill();
		if draw.glow.is_some() {
			ctx.set_shadow(0.0, "transparent");
		}

		let image = draw
			.node
			.display_image
			.as_deref()
			.filter(|url| !url.is_empty())
			.and_then(|url| self.images.get(url));
		match image {
			Some(image) => {
				let ir = r * IMAGE_SCALE;
				ctx.save();
				ctx.begin_path();
				ctx.arc(x, y, ir);
				ctx.clip();
				ctx.draw_image(&image, x - ir, y - ir, ir * 2.0, ir * 2.0);
				ctx.restore();
			}
			None => {
				ctx.set_line_dash(&[3.0, 3.0]);
				ctx.begin_path();
				ctx.arc(x, y, r * PLACEHOLDER_SCALE);
				ctx.set_stroke_style(&theme.placeholder_ring.to_css());
				ctx.set_line_width(1.5);
				ctx.stroke();
				ctx.set_line_dash(&[]);
			}
		}

		ctx.begin_path();
		ctx.arc(x, y, r);
		if draw.bright_border {
			ctx.set_stroke_style(&theme.border_active.to_css());
			ctx.set_line_width(3.0);
		} else {
			ctx.set_stroke_style(&theme.border.to_css());
			ctx.set_line_width(1.5);
		}
		ctx.stroke();

		if let Some(label) = &draw.label {
			let ly = y + r + LABEL_GAP;
			ctx.set_font(theme.label_font);
			ctx.set_text_align("center");
			ctx.set_line_width(3.0);
			ctx.set_stroke_style(&theme.label_outline.to_css());
			ctx.stroke_text(label, x, ly);
			ctx.set_fill_style(&theme.label_fill.to_css());
			ctx.fill_text(label, x, ly);
		}
	}
}
