//! Visual theming for the relationship graph.
//!
//! Provides the accent colors, the sequential color scales that map token
//! connectivity and KOL influence to fills, and label/border styling.

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Opacity, 0.0 to 1.0.
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with explicit opacity.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same channels, new opacity.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Lighten the color by a factor (0.0 = unchanged, 1.0 = white)
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 + (255.0 - self.r as f64) * f) as u8,
			g: (self.g as f64 + (255.0 - self.g as f64) * f) as u8,
			b: (self.b as f64 + (255.0 - self.b as f64) * f) as u8,
			a: self.a,
		}
	}

	/// Linear interpolation between two colors
	pub fn lerp(self, other: Color, t: f64) -> Self {
		let t = t.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * (1.0 - t) + other.r as f64 * t).round() as u8,
			g: (self.g as f64 * (1.0 - t) + other.g as f64 * t).round() as u8,
			b: (self.b as f64 * (1.0 - t) + other.b as f64 * t).round() as u8,
			a: self.a * (1.0 - t) + other.a * t,
		}
	}

	/// Hex when opaque, `rgba(...)` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Linear sequential scale between two anchor colors over a clamped domain.
#[derive(Clone, Copy, Debug)]
pub struct ColorScale {
	/// Input range; values outside are clamped.
	pub domain: (f64, f64),
	/// Color at the low end.
	pub from: Color,
	/// Color at the high end.
	pub to: Color,
}

impl ColorScale {
	/// Maps `value` into the scale. Non-finite input gets the low end.
	pub fn color(&self, value: f64) -> Color {
		let (lo, hi) = self.domain;
		if !value.is_finite() || hi <= lo {
			return self.from;
		}
		self.from.lerp(self.to, (value - lo) / (hi - lo))
	}
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Trending fill and first edge gradient stop.
	pub accent_primary: Color,
	/// Second edge gradient stop.
	pub accent_secondary: Color,
	/// Token fill by connection count (domain 0..20).
	pub token_scale: ColorScale,
	/// KOL fill by influence score (domain 0..100).
	pub kol_scale: ColorScale,
	/// Default node border.
	pub border: Color,
	/// Border for verified, hovered or selected nodes.
	pub border_active: Color,
	/// Ring drawn while an avatar loads.
	pub placeholder_ring: Color,
	/// Caption text color.
	pub label_fill: Color,
	/// Caption halo, stroked under the text.
	pub label_outline: Color,
	/// CSS font shorthand for captions.
	pub label_font: &'static str,
	/// Shadow color around glowing nodes.
	pub glow: Color,
	/// Cleared to transparent when `None`, so the page shows through.
	pub background: Option<Color>,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			accent_primary: Color::rgb(20, 241, 149),
			accent_secondary: Color::rgb(153, 69, 255),
			token_scale: ColorScale {
				domain: (0.0, 20.0),
				from: Color::rgb(56, 189, 248),
				to: Color::rgb(20, 241, 149),
			},
			kol_scale: ColorScale {
				domain: (0.0, 100.0),
				from: Color::rgb(251, 191, 36),
				to: Color::rgb(239, 68, 68),
			},
			border: Color::rgba(255, 255, 255, 0.35),
			border_active: Color::rgba(255, 255, 255, 0.95),
			placeholder_ring: Color::rgba(255, 255, 255, 0.5),
			label_fill: Color::rgb(255, 255, 255),
			label_outline: Color::rgba(0, 0, 0, 0.85),
			label_font: "600 11px Inter, sans-serif",
			glow: Color::rgba(20, 241, 149, 0.6),
			background: None,
		}
	}
}
