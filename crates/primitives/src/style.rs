//! Colors and decoration styles requested from the host.

use std::fmt;

/// An RGBA color with an alpha channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f32,
}

impl Rgba {
	/// Creates a color, clamping alpha into `0.0..=1.0`.
	pub fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
		Self { r, g, b, a: a.clamp(0.0, 1.0) }
	}

	/// Same color with a different alpha.
	pub fn with_alpha(self, a: f32) -> Self {
		Self::new(self.r, self.g, self.b, a)
	}
}

impl fmt::Display for Rgba {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
	}
}

/// Icon drawn in the gutter next to a decorated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GutterIcon {
	AddLine,
	RemoveLine,
}

/// Visual style of a decoration handle.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationStyle {
	/// Background fill.
	pub background: Rgba,
	/// Extend the background over the whole line regardless of the range columns.
	pub whole_line: bool,
	/// Optional gutter marker.
	pub gutter_icon: Option<GutterIcon>,
	/// Force the regular editor foreground over the decorated text.
	pub plain_foreground: bool,
}

impl DecorationStyle {
	/// Background-only style covering exactly the given ranges.
	pub fn background(background: Rgba) -> Self {
		Self {
			background,
			whole_line: false,
			gutter_icon: None,
			plain_foreground: false,
		}
	}

	/// Builder: extend the background over whole lines.
	pub fn whole_line(mut self) -> Self {
		self.whole_line = true;
		self
	}

	/// Builder: attach a gutter icon.
	pub fn with_gutter_icon(mut self, icon: GutterIcon) -> Self {
		self.gutter_icon = Some(icon);
		self
	}

	/// Builder: keep the normal foreground color.
	pub fn with_plain_foreground(mut self) -> Self {
		self.plain_foreground = true;
		self
	}
}
