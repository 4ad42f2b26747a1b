//! Rendering parameters attached to each submitted job.
//!
//! The central type is [`RenderOptions`], constructed either directly or
//! (more commonly) via the ergonomic [`RenderOptions::builder`]. Every field
//! has a concrete default so a plain [`RenderOptions::default`] renders
//! inline black math at 16 px with no width constraint.
//!
//! # Example
//!
//! Basic usage with the builder pattern:
//! ```
//! let opts = texrast::RenderOptions::builder()
//!     .display_mode(true)
//!     .font_size(18.0)
//!     .color(texrast::Rgba::new(0x20, 0x20, 0x20, 0xff))
//!     .build()
//!     .unwrap();
//! assert!(opts.display_mode());
//! ```

use std::fmt;

use derive_builder::Builder;

use crate::runtime::TypesetSpec;

/// An 8‑bit RGBA color forwarded to the typesetting runtime.
///
/// Formatted as a CSS `rgba()` string at the runtime boundary, with the
/// alpha channel mapped to the CSS `0..=1` range.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel; `255` is fully opaque.
    pub a: u8,
}

impl Rgba {
    /// Opaque black, the default text color.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);

    /// Construct a color from its four channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({},{},{},{:.3})",
            self.r,
            self.g,
            self.b,
            f64::from(self.a) / 255.0
        )
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Parameters controlling how a single job is typeset and rasterized.
#[non_exhaustive]
#[derive(Clone, Builder, Debug, PartialEq)]
#[builder(default)]
#[builder(setter(into))]
pub struct RenderOptions {
    /// Whether to typeset in *display* mode (`true`) or *inline* (`false`).
    ///
    /// Display mode centers the expression on its own line and uses larger
    /// vertical spacing; it always renders at its natural width.
    display_mode: bool,
    /// Text color applied to the typeset output.
    color: Rgba,
    /// Font size in CSS pixels. Must be strictly positive.
    font_size: f64,
    /// Maximum width in CSS pixels available to the typeset output.
    ///
    /// Only constrains line wrapping for inline jobs with a finite width;
    /// display mode and `f64::INFINITY` (the default) use the natural width.
    max_width: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            display_mode: false,
            color: Rgba::BLACK,
            font_size: 16.0,
            max_width: f64::INFINITY,
        }
    }
}

impl RenderOptions {
    /// Return [`RenderOptionsBuilder`].
    pub fn builder() -> RenderOptionsBuilder {
        RenderOptionsBuilder::default()
    }

    /// Whether the job renders in display mode.
    pub fn display_mode(&self) -> bool {
        self.display_mode
    }

    /// The text color for the job.
    pub fn color(&self) -> Rgba {
        self.color
    }

    /// The font size in CSS pixels.
    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    /// The maximum width in CSS pixels; may be `f64::INFINITY`.
    pub fn max_width(&self) -> f64 {
        self.max_width
    }

    /// Set whether to typeset in display mode.
    pub fn set_display_mode(&mut self, flag: bool) {
        self.display_mode = flag;
    }

    /// Set the text color.
    pub fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    /// Set the font size in CSS pixels.
    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = size;
    }

    /// Set the maximum width in CSS pixels.
    pub fn set_max_width(&mut self, width: f64) {
        self.max_width = width;
    }

    /// The width the runtime may wrap at, if any.
    ///
    /// Finite and inline only; display mode and infinite widths typeset at
    /// natural width.
    pub(crate) fn wrapping_width(&self) -> Option<f64> {
        (!self.display_mode && self.max_width.is_finite()).then_some(self.max_width)
    }

    /// Marshal these options into the parameter set crossing the runtime
    /// boundary.
    pub(crate) fn spec(&self) -> TypesetSpec {
        TypesetSpec {
            display_mode: self.display_mode,
            color: self.color.to_string(),
            font_size: self.font_size,
            max_width: self.wrapping_width(),
        }
    }
}

impl AsRef<RenderOptions> for RenderOptions {
    fn as_ref(&self) -> &RenderOptions {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_render_inline_unconstrained() {
        let opts = RenderOptions::default();
        assert!(!opts.display_mode());
        assert_eq!(opts.color(), Rgba::BLACK);
        assert_eq!(opts.font_size(), 16.0);
        assert!(opts.max_width().is_infinite());
    }

    #[test]
    fn builder_sets_all_fields() {
        let opts = RenderOptions::builder()
            .display_mode(true)
            .color(Rgba::new(10, 20, 30, 40))
            .font_size(21.5)
            .max_width(320.0)
            .build()
            .unwrap();
        assert!(opts.display_mode());
        assert_eq!(opts.color(), Rgba::new(10, 20, 30, 40));
        assert_eq!(opts.font_size(), 21.5);
        assert_eq!(opts.max_width(), 320.0);
    }

    #[test]
    fn wrapping_width_requires_inline_and_finite() {
        let mut opts = RenderOptions::default();
        opts.set_max_width(200.0);
        assert_eq!(opts.wrapping_width(), Some(200.0));

        opts.set_display_mode(true);
        assert_eq!(opts.wrapping_width(), None);

        opts.set_display_mode(false);
        opts.set_max_width(f64::INFINITY);
        assert_eq!(opts.wrapping_width(), None);
    }

    #[test]
    fn color_formats_as_css_rgba() {
        assert_eq!(Rgba::BLACK.to_string(), "rgba(0,0,0,1.000)");
        assert_eq!(
            Rgba::new(255, 128, 0, 51).to_string(),
            "rgba(255,128,0,0.200)"
        );
    }
}
