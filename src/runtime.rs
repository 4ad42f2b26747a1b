//! The typesetting runtime boundary.
//!
//! The pipeline hides which runtime typesets the math. This module defines
//! the [`Typesetter`] trait the engine renders through, the parameter set
//! that crosses the boundary ([`TypesetSpec`]), and the bundle container
//! ([`RuntimeSource`]) the embedded backend evaluates at startup.
//!
//! Backends are selected by Cargo features:
//! * `quick-js` (default): an embedded QuickJS runtime driving a
//!   caller‑supplied typesetting bundle.
//!
//! Targets with no enabled backend still compile; constructing the default
//! runtime there fails with [`Error::UnsupportedPlatform`] so callers can
//! fall back to plain‑text display at run time.
//!
//! Caller text and options are marshaled into the runtime as typed values,
//! never spliced into evaluated source, so no escaping of the input is
//! required on this side of the boundary.

use std::{borrow::Cow, fs, path::Path};

use cfg_if::cfg_if;

use crate::error::{Error, Result};

/// Name of the global entry function a typesetting bundle must define.
///
/// The function receives `(tex, settings)` and returns a standalone SVG
/// document as a string. `settings` carries the fields of [`TypesetSpec`]
/// as `displayMode`, `color`, `fontSize`, and (when present) `maxWidthPx`.
pub const ENTRY_FUNCTION: &str = "texToSvg";

/// Default stack size for the embedded runtime.
///
/// QuickJS defaults to 256 KiB, which overflows on nested fractions and
/// multi‑line alignments.
pub(crate) const DEFAULT_JS_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Parameters marshaled across the runtime boundary for one job.
#[derive(Clone, Debug, PartialEq)]
pub struct TypesetSpec {
    /// Typeset in display mode instead of inline.
    pub display_mode: bool,
    /// Text color as a CSS color string.
    pub color: String,
    /// Font size in CSS pixels.
    pub font_size: f64,
    /// Wrapping width in CSS pixels; `None` typesets at natural width.
    ///
    /// Already resolved by the caller: present only for inline jobs with a
    /// finite maximum width.
    pub max_width: Option<f64>,
}

/// A math‑typesetting runtime producing vector output from markup.
///
/// Implementations typeset one expression at a time and report markup
/// problems as [`Error::Typeset`] carrying the engine's diagnostic. The
/// engine constructs its runtime on the worker thread, so implementations
/// need not be `Send`.
pub trait Typesetter {
    /// Typeset `tex` into a standalone SVG document.
    fn typeset(&self, tex: &str, spec: &TypesetSpec) -> Result<String>;
}

/// Source chunks of a typesetting bundle, evaluated in order at runtime
/// construction.
///
/// A bundle is the JavaScript that defines [`ENTRY_FUNCTION`], typically a
/// vendored math library plus a small adapter. Chunks keep the library and
/// the adapter as separate units, mirroring how such bundles ship.
#[derive(Clone, Debug, Default)]
pub struct RuntimeSource {
    chunks: Vec<Cow<'static, str>>,
}

impl RuntimeSource {
    /// An empty source; push chunks with [`RuntimeSource::chunk`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A source consisting of a single static bundle.
    pub fn from_static(bundle: &'static str) -> Self {
        Self {
            chunks: vec![Cow::Borrowed(bundle)],
        }
    }

    /// A source read from a bundle file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new().chunk_file(path)
    }

    /// Append a chunk of bundle source.
    pub fn chunk(mut self, code: impl Into<String>) -> Self {
        self.chunks.push(Cow::Owned(code.into()));
        self
    }

    /// Append a chunk read from a file on disk.
    pub fn chunk_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let code = fs::read_to_string(path).map_err(|e| {
            Error::RuntimeInit(format!("cannot read bundle {}: {e}", path.display()))
        })?;
        self.chunks.push(Cow::Owned(code));
        Ok(self)
    }

    /// Iterate the chunks in evaluation order.
    pub(crate) fn chunks(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|chunk| &**chunk)
    }

    /// Whether no chunks were supplied.
    pub(crate) fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

cfg_if! {
    if #[cfg(all(feature = "quick-js", any(unix, all(windows, target_env = "gnu"))))] {
        mod quick_js;

        pub use quick_js::QuickJsRuntime;

        pub(crate) fn default_typesetter(
            source: &RuntimeSource,
            stack_size: usize,
        ) -> Result<Box<dyn Typesetter>> {
            Ok(Box::new(QuickJsRuntime::with_stack_size(source, stack_size)?))
        }
    } else {
        pub(crate) fn default_typesetter(
            _source: &RuntimeSource,
            _stack_size: usize,
        ) -> Result<Box<dyn Typesetter>> {
            Err(Error::UnsupportedPlatform(
                "no typesetting backend enabled for this target".to_owned(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RuntimeSource;

    #[test]
    fn chunks_keep_insertion_order() {
        let source = RuntimeSource::from_static("first").chunk("second");
        let chunks: Vec<_> = source.chunks().collect();
        assert_eq!(chunks, ["first", "second"]);
    }

    #[test]
    fn missing_bundle_file_reports_path() {
        let err = RuntimeSource::from_path("/nonexistent/bundle.js").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bundle.js"));
    }
}
