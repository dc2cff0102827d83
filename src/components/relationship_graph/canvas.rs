//! Browser bindings: the 2-D canvas as a [`DrawContext`], `<img>` loading for
//! the image cache, and reading the device profile from `window`.

use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Element, HtmlCanvasElement, HtmlImageElement, Window};

use super::error::GraphError;
use super::image_cache::{ImageLoader, LoadDone};
use super::render::DrawContext;
use super::responsive::DeviceProfile;

impl DrawContext for CanvasRenderingContext2d {
	type Image = HtmlImageElement;

	fn save(&self) {
		CanvasRenderingContext2d::save(self);
	}

	fn restore(&self) {
		CanvasRenderingContext2d::restore(self);
	}

	fn clear_rect(&self, x: f64, y: f64, w: f64, h: f64) {
		CanvasRenderingContext2d::clear_rect(self, x, y, w, h);
	}

	fn fill_rect(&self, x: f64, y: f64, w: f64, h: f64) {
		CanvasRenderingContext2d::fill_rect(self, x, y, w, h);
	}

	fn translate(&self, x: f64, y: f64) {
		let _ = CanvasRenderingContext2d::translate(self, x, y);
	}

	fn scale(&self, k: f64) {
		let _ = CanvasRenderingContext2d::scale(self, k, k);
	}

	fn set_global_alpha(&self, alpha: f64) {
		CanvasRenderingContext2d::set_global_alpha(self, alpha);
	}

	fn set_fill_style(&self, css: &str) {
		self.set_fill_style_str(css);
	}

	fn set_stroke_style(&self, css: &str) {
		self.set_stroke_style_str(css);
	}

	fn set_stroke_gradient(&self, x0: f64, y0: f64, x1: f64, y1: f64, stops: &[(f64, String)]) {
		let gradient = self.create_linear_gradient(x0, y0, x1, y1);
		for (offset, color) in stops {
			let _ = gradient.add_color_stop(*offset as f32, color);
		}
		self.set_stroke_style_canvas_gradient(&gradient);
	}

	fn set_line_width(&self, width: f64) {
		CanvasRenderingContext2d::set_line_width(self, width);
	}

	fn set_line_dash(&self, segments: &[f64]) {
		let dash: Array = segments.iter().map(|s| JsValue::from_f64(*s)).collect();
		let _ = CanvasRenderingContext2d::set_line_dash(self, &dash);
	}

	fn set_shadow(&self, blur: f64, css: &str) {
		self.set_shadow_blur(blur);
		self.set_shadow_color(css);
	}

	fn begin_path(&self) {
		CanvasRenderingContext2d::begin_path(self);
	}

	fn move_to(&self, x: f64, y: f64) {
		CanvasRenderingContext2d::move_to(self, x, y);
	}

	fn line_to(&self, x: f64, y: f64) {
		CanvasRenderingContext2d::line_to(self, x, y);
	}

	fn arc(&self, x: f64, y: f64, radius: f64) {
		let _ = CanvasRenderingContext2d::arc(self, x, y, radius, 0.0, TAU);
	}

	fn stroke(&self) {
		CanvasRenderingContext2d::stroke(self);
	}

	fn fill(&self) {
		CanvasRenderingContext2d::fill(self);
	}

	fn clip(&self) {
		CanvasRenderingContext2d::clip(self);
	}

	fn set_font(&self, font: &str) {
		CanvasRenderingContext2d::set_font(self, font);
	}

	fn set_text_align(&self, align: &str) {
		CanvasRenderingContext2d::set_text_align(self, align);
	}

	fn stroke_text(&self, text: &str, x: f64, y: f64) {
		let _ = CanvasRenderingContext2d::stroke_text(self, text, x, y);
	}

	fn fill_text(&self, text: &str, x: f64, y: f64) {
		let _ = CanvasRenderingContext2d::fill_text(self, text, x, y);
	}

	fn draw_image(&self, image: &HtmlImageElement, x: f64, y: f64, w: f64, h: f64) {
		let _ = self.draw_image_with_html_image_element_and_dw_and_dh(image, x, y, w, h);
	}
}

/// Loads node avatars through detached `<img>` elements.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlImageLoader;

impl ImageLoader for HtmlImageLoader {
	type Image = HtmlImageElement;

	fn load(&self, url: &str, done: LoadDone<HtmlImageElement>) {
		let Ok(image) = HtmlImageElement::new() else {
			done(None);
			return;
		};
		// Whichever of load/error fires first resolves the request.
		let done = Rc::new(RefCell::new(Some(done)));

		let (on_done, loaded) = (done.clone(), image.clone());
		let onload = Closure::once_into_js(move || {
			if let Some(done) = on_done.borrow_mut().take() {
				done(Some(loaded));
			}
		});
		let onerror = Closure::once_into_js(move || {
			if let Some(done) = done.borrow_mut().take() {
				done(None);
			}
		});

		image.set_cross_origin(Some("anonymous"));
		image.set_onload(Some(onload.unchecked_ref::<Function>()));
		image.set_onerror(Some(onerror.unchecked_ref::<Function>()));
		image.set_src(url);
	}
}

/// The canvas' 2-D drawing context.
pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, GraphError> {
	canvas
		.get_context("2d")
		.map_err(|e| GraphError::CanvasContext(format!("{e:?}")))?
		.ok_or_else(|| GraphError::CanvasContext("getContext(\"2d\") returned null".into()))?
		.dyn_into::<CanvasRenderingContext2d>()
		.map_err(|_| GraphError::CanvasContext("unexpected context type".into()))
}

/// Milliseconds from `performance.now()`, or 0 where unavailable.
pub fn now_ms() -> f64 {
	web_sys::window()
		.and_then(|w| w.performance())
		.map_or(0.0, |p| p.now())
}

/// Reads the viewport, pointer and hardware hints the browser exposes.
///
/// With a `container`, its client box sizes the canvas; otherwise the
/// viewport does, using the full viewport height when `fill_viewport` is set.
pub fn device_profile(window: &Window, container: Option<&Element>, fill_viewport: bool) -> DeviceProfile {
	let defaults = DeviceProfile::default();
	let viewport_width = window
		.inner_width()
		.ok()
		.and_then(|v| v.as_f64())
		.unwrap_or(defaults.viewport_width);
	let viewport_height = window
		.inner_height()
		.ok()
		.and_then(|v| v.as_f64())
		.unwrap_or(defaults.viewport_height);

	let navigator = window.navigator();
	let cores = navigator.hardware_concurrency();
	// `deviceMemory` is Chromium-only and absent from the typed bindings.
	let device_memory_gb = Reflect::get(&navigator, &JsValue::from_str("deviceMemory"))
		.ok()
		.and_then(|v| v.as_f64());
	let coarse_pointer = window
		.match_media("(pointer: coarse)")
		.ok()
		.flatten()
		.is_some_and(|m| m.matches());

	let (container_width, container_height) = match container {
		Some(el) => {
			let positive = |v: i32| (v > 0).then_some(v as f64);
			(positive(el.client_width()), positive(el.client_height()))
		}
		None if fill_viewport => (None, Some(viewport_height)),
		None => (None, None),
	};

	DeviceProfile {
		viewport_width,
		viewport_height,
		container_width,
		container_height,
		device_pixel_ratio: window.device_pixel_ratio(),
		coarse_pointer,
		hardware_concurrency: if cores >= 1.0 {
			cores as u32
		} else {
			defaults.hardware_concurrency
		},
		device_memory_gb,
	}
}
