//! Device-aware tuning for the graph.
//!
//! A [`DeviceProfile`] describes what the browser reports about the screen,
//! pointer and hardware; [`ResponsiveConfig::derive`] turns it into the knobs the
//! orchestrator and renderer read. Derivation is pure and is simply rerun on
//! resize or orientation change.

use serde::{Deserialize, Serialize};

/// What the host knows about the current device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceProfile {
	/// `window.innerWidth`.
	pub viewport_width: f64,
	/// `window.innerHeight`.
	pub viewport_height: f64,
	/// Width of the element hosting the canvas, if known.
	pub container_width: Option<f64>,
	/// Fixed height of the host element; overrides the breakpoint height.
	pub container_height: Option<f64>,
	/// `window.devicePixelRatio`.
	pub device_pixel_ratio: f64,
	/// Touch-first device (`(pointer: coarse)`).
	pub coarse_pointer: bool,
	/// Logical cores (`navigator.hardwareConcurrency`).
	pub hardware_concurrency: u32,
	/// `navigator.deviceMemory`, where the browser exposes it.
	pub device_memory_gb: Option<f64>,
}

impl Default for DeviceProfile {
	fn default() -> Self {
		Self {
			viewport_width: 1280.0,
			viewport_height: 800.0,
			container_width: None,
			container_height: None,
			device_pixel_ratio: 1.0,
			coarse_pointer: false,
			hardware_concurrency: 4,
			device_memory_gb: None,
		}
	}
}

/// Layout breakpoint by viewport width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Breakpoint {
	/// Narrower than 640 px.
	Mobile,
	/// 640 to 1023 px.
	Tablet,
	/// 1024 px and up.
	Desktop,
}

impl Breakpoint {
	/// Breakpoint for a viewport `width` in CSS pixels.
	pub fn for_width(width: f64) -> Self {
		if width < 640.0 {
			Self::Mobile
		} else if width < 1024.0 {
			Self::Tablet
		} else {
			Self::Desktop
		}
	}
}

/// Rough capability class used to scale workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerformanceTier {
	/// Few cores, little memory, or a modest touch device.
	Low,
	/// Everything in between.
	Medium,
	/// Eight or more cores and no sign of low memory.
	High,
}

impl PerformanceTier {
	/// Best guess from cores, memory and pointer type.
	pub fn estimate(profile: &DeviceProfile) -> Self {
		let cores = profile.hardware_concurrency;
		let memory = profile.device_memory_gb;
		if cores <= 2 || memory.is_some_and(|m| m <= 2.0) {
			return Self::Low;
		}
		if profile.coarse_pointer && cores <= 4 {
			return Self::Low;
		}
		if cores >= 8 && memory.is_none_or(|m| m >= 8.0) {
			return Self::High;
		}
		Self::Medium
	}
}

/// Tuning knobs derived from a [`DeviceProfile`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveConfig {
	/// Width class of the viewport.
	pub breakpoint: Breakpoint,
	/// Estimated device capability.
	pub tier: PerformanceTier,
	/// CSS width of the canvas.
	pub canvas_width: f64,
	/// CSS height of the canvas.
	pub canvas_height: f64,
	/// Backing-store scale, capped to keep fill cost bounded.
	pub pixel_ratio: f64,
	/// Base length of an untraded link.
	pub link_distance: f64,
	/// Snapshots larger than this are down-sampled by value.
	pub max_nodes: usize,
	/// Links beyond this are cut, lightest first.
	pub max_edges: usize,
	/// Canvas shadows around active and high-value nodes.
	pub enable_glow: bool,
	/// Full-length layout cooling. When off, the layout settles in about a
	/// third of the ticks.
	pub enable_animations: bool,
	/// Minimum spacing between bulk data flushes to the engine.
	pub data_throttle_ms: f64,
	/// Double tap zooms in; on for coarse pointers.
	pub double_tap_zoom: bool,
}

impl ResponsiveConfig {
	/// Derives every knob from `profile`.
	pub fn derive(profile: &DeviceProfile) -> Self {
		let breakpoint = Breakpoint::for_width(profile.viewport_width);
		let tier = PerformanceTier::estimate(profile);

		let canvas_width = profile
			.container_width
			.unwrap_or(profile.viewport_width)
			.max(1.0);
		let canvas_height = match (profile.container_height, breakpoint) {
			(Some(h), _) => h.max(1.0),
			(None, Breakpoint::Mobile) => (profile.viewport_height * 0.6).clamp(320.0, 520.0),
			(None, Breakpoint::Tablet) => (profile.viewport_height * 0.7).clamp(400.0, 700.0),
			(None, Breakpoint::Desktop) => (profile.viewport_height * 0.75).clamp(480.0, 900.0),
		};

		let link_distance = match breakpoint {
			Breakpoint::Mobile => 80.0,
			Breakpoint::Tablet => 100.0,
			Breakpoint::Desktop => 120.0,
		};

		let (mut max_nodes, mut max_edges) = match tier {
			PerformanceTier::Low => (50, 100),
			PerformanceTier::Medium => (100, 250),
			PerformanceTier::High => (200, 500),
		};
		if breakpoint == Breakpoint::Mobile {
			max_nodes /= 2;
			max_edges /= 2;
		}

		let data_throttle_ms = match tier {
			PerformanceTier::Low => 1000.0,
			PerformanceTier::Medium => 500.0,
			PerformanceTier::High => 250.0,
		};

		Self {
			breakpoint,
			tier,
			canvas_width,
			canvas_height,
			pixel_ratio: profile.device_pixel_ratio.clamp(1.0, 2.0),
			link_distance,
			max_nodes,
			max_edges,
			enable_glow: tier != PerformanceTier::Low,
			enable_animations: tier != PerformanceTier::Low || !profile.coarse_pointer,
			data_throttle_ms,
			double_tap_zoom: profile.coarse_pointer,
		}
	}
}

impl Default for ResponsiveConfig {
	fn default() -> Self {
		Self::derive(&DeviceProfile::default())
	}
}
