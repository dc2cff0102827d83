//! Leptos component wrapping the relationship graph canvas.
//!
//! The component creates an HTML canvas element and wires pointer and wheel
//! handlers into the [`GraphOrchestrator`]. A `requestAnimationFrame` loop
//! pumps simulation ticks and repaints whenever the orchestrator is dirty, so
//! paint runs at display rate no matter how fast ticks arrive.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent, Window};

use super::canvas::{self, HtmlImageLoader};
use super::orchestrator::GraphOrchestrator;
use super::responsive::{DeviceProfile, ResponsiveConfig};
use super::theme::Theme;
use super::types::GraphData;
use super::worker::SimulationWorker;

/// Orchestrator plus the canvas it paints into.
struct GraphContext {
	orchestrator: GraphOrchestrator<HtmlImageLoader>,
	canvas: HtmlCanvasElement,
	ctx: CanvasRenderingContext2d,
}

impl GraphContext {
	/// Sizes the backing store to the configured CSS size times the pixel ratio.
	fn size_canvas(&self) {
		let config = self.orchestrator.config();
		let dpr = config.pixel_ratio;
		self.canvas.set_width((config.canvas_width * dpr) as u32);
		self.canvas.set_height((config.canvas_height * dpr) as u32);
		// `leptos::prelude` brings a builder `style()` into scope; name the DOM one.
		let style = web_sys::HtmlElement::style(&self.canvas);
		let _ = style.set_property("width", &format!("{}px", config.canvas_width));
		let _ = style.set_property("height", &format!("{}px", config.canvas_height));
		self.orchestrator.request_redraw();
	}

	fn frame(&mut self, now: f64) {
		self.orchestrator.pump(now);
		if self.orchestrator.take_redraw() {
			let dpr = self.orchestrator.config().pixel_ratio;
			let _ = self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
			self.orchestrator.render(&self.ctx);
		}
	}
}

type Shared<T> = Rc<RefCell<Option<T>>>;

fn local_point(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

fn read_profile(window: &Window, canvas: &HtmlCanvasElement, fullscreen: bool) -> DeviceProfile {
	let parent = if fullscreen { None } else { canvas.parent_element() };
	canvas::device_profile(window, parent.as_ref(), fullscreen)
}

/// Renders the live token/KOL relationship graph on a canvas element.
///
/// Pass snapshots via the reactive `data` signal; every change is forwarded
/// to the layout as a soft update. The canvas sizes itself to its parent
/// container, or to the viewport when `fullscreen = true`, and follows window
/// resizes and orientation changes.
#[component]
pub fn RelationshipGraphCanvas(
	/// Latest snapshot; each change is submitted as a soft update.
	#[prop(into)]
	data: Signal<GraphData>,
	/// Size to the viewport instead of the parent element.
	#[prop(default = false)]
	fullscreen: bool,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let context: Shared<GraphContext> = Rc::new(RefCell::new(None));
	let animate: Shared<Closure<dyn FnMut()>> = Rc::new(RefCell::new(None));
	let resize_cb: Shared<Closure<dyn FnMut()>> = Rc::new(RefCell::new(None));
	let (context_init, animate_init, resize_cb_init) =
		(context.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let snapshot = data.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let now = canvas::now_ms();
		if let Some(c) = context_init.borrow_mut().as_mut() {
			c.orchestrator.submit_data(snapshot, now);
			return;
		}

		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let ctx = match canvas::context_2d(&canvas) {
			Ok(ctx) => ctx,
			Err(e) => {
				warn!("relationship graph: {e}");
				return;
			}
		};

		let config = ResponsiveConfig::derive(&read_profile(&window, &canvas, fullscreen));
		info!(
			"relationship graph: {:?} / {:?}, {}x{}",
			config.breakpoint, config.tier, config.canvas_width, config.canvas_height
		);
		let mut orchestrator =
			GraphOrchestrator::new(SimulationWorker::spawn(), HtmlImageLoader, Theme::default(), config);
		orchestrator.submit_data(snapshot, now);
		let graph = GraphContext {
			orchestrator,
			canvas: canvas.clone(),
			ctx,
		};
		graph.size_canvas();
		*context_init.borrow_mut() = Some(graph);

		// Orientation changes also arrive as resize events.
		let context_resize = context_init.clone();
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let Some(win) = web_sys::window() else {
				return;
			};
			if let Some(c) = context_resize.borrow_mut().as_mut() {
				c.orchestrator.resize(&read_profile(&win, &c.canvas, fullscreen));
				c.size_canvas();
			}
		}));
		if let Some(cb) = resize_cb_init.borrow().as_ref() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (context_anim, animate_inner) = (context_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let alive = match context_anim.borrow_mut().as_mut() {
				Some(c) => {
					c.frame(canvas::now_ms());
					true
				}
				None => false,
			};
			// Unmounted: let the loop lapse.
			if !alive {
				return;
			}
			if let (Some(win), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(cb) = animate_init.borrow().as_ref() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let teardown = StoredValue::new_local((context.clone(), resize_cb.clone()));
	on_cleanup(move || {
		teardown.try_with_value(|(context, resize_cb)| {
			if let Some(mut c) = context.borrow_mut().take() {
				c.orchestrator.stop();
			}
			if let (Some(win), Some(cb)) = (web_sys::window(), resize_cb.borrow_mut().take()) {
				let _ = win.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		});
	});

	let context_pd = context.clone();
	let on_pointerdown = move |ev: PointerEvent| {
		if let Some(c) = context_pd.borrow_mut().as_mut() {
			let (x, y) = local_point(&c.canvas, &ev);
			let _ = c.canvas.set_pointer_capture(ev.pointer_id());
			c.orchestrator.pointer_down(x, y);
		}
	};

	let context_pm = context.clone();
	let on_pointermove = move |ev: PointerEvent| {
		if let Some(c) = context_pm.borrow_mut().as_mut() {
			let (x, y) = local_point(&c.canvas, &ev);
			c.orchestrator.pointer_move(x, y);
		}
	};

	let context_pu = context.clone();
	let on_pointerup = move |ev: PointerEvent| {
		if let Some(c) = context_pu.borrow_mut().as_mut() {
			let (x, y) = local_point(&c.canvas, &ev);
			c.orchestrator.pointer_up(x, y, canvas::now_ms());
		}
	};

	let context_pl = context.clone();
	let on_pointerleave = move |_: PointerEvent| {
		if let Some(c) = context_pl.borrow_mut().as_mut() {
			c.orchestrator.pointer_leave();
		}
	};

	let context_wh = context.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some(c) = context_wh.borrow_mut().as_mut() {
			let (x, y) = local_point(&c.canvas, &ev);
			c.orchestrator.wheel(x, y, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="relationship-graph-canvas"
			on:pointerdown=on_pointerdown
			on:pointermove=on_pointermove
			on:pointerup=on_pointerup
			on:pointerleave=on_pointerleave
			on:pointercancel=move |_| {
				if let Some(c) = context.borrow_mut().as_mut() {
					c.orchestrator.pointer_leave();
				}
			}
			on:wheel=on_wheel
			style="display: block; cursor: grab; touch-action: none;"
		/>
	}
}
