//! Error handling for the `texrast` crate.
//!
//! The crate exposes a single [`Error`] enum which groups the different
//! categories of failures that can occur while validating a request, hosting
//! the embedded typesetting runtime, typesetting, and rasterizing the result.
//! All public, fallible APIs return a [`Result<T, Error>`].
//!
//! Error variants are intentionally coarse‑grained so that downstream users
//! can pattern‑match to distinguish between *precondition* problems (fix the
//! call site), *host* problems (fall back to plain‑text display), and
//! *input* problems (show the diagnostic next to the offending markup), or
//! simply bubble them up with `?`.
//!
//! Supersession is deliberately **not** an error: a render future displaced
//! by a newer submission under the same key resolves with `Ok(None)`.

/// Error type for this crate.
#[non_exhaustive]
#[derive(thiserror::Error, Clone, Debug)]
pub enum Error {
    /// The request violated a precondition and was rejected before reaching
    /// the engine.
    ///
    /// Covers empty / whitespace‑only source text and non‑positive font
    /// sizes. These indicate a bug at the call site rather than a condition
    /// worth retrying.
    #[error("invalid render request (detail: {0})")]
    InvalidRequest(String),
    /// The job was explicitly cancelled before its result was delivered.
    ///
    /// Cancellation is authoritative for delivery: the future fails with
    /// this variant even when the underlying computation later finishes.
    /// Callers are expected to render nothing in response.
    #[error("render job cancelled")]
    Cancelled,
    /// No typesetting backend is available on this build target.
    ///
    /// Callers are expected to treat this as non‑fatal and fall back to
    /// displaying the raw source text.
    #[error("typesetting runtime unavailable on this platform (detail: {0})")]
    UnsupportedPlatform(String),
    /// The typesetting runtime failed to initialize on this host.
    ///
    /// Examples include: inability to allocate the embedded runtime, or a
    /// host environment too constrained to evaluate the typesetting bundle.
    /// Retrying is unlikely to succeed unless the underlying resource
    /// constraints change; callers should fall back to plain text.
    #[error("failed to initialize typesetting runtime (detail: {0})")]
    RuntimeInit(String),
    /// The runtime rejected the markup.
    ///
    /// The string payload carries the diagnostic reported by the underlying
    /// engine (e.g. an undefined control sequence), suitable for showing to
    /// the author of the markup.
    #[error("typesetting failed (detail: {0})")]
    Typeset(String),
    /// The typeset output could not be turned into PNG bytes.
    ///
    /// Covers unparseable vector output, empty bounds, and encoding
    /// failures. Not caused by user markup in practice; usually indicates a
    /// misbehaving typesetting bundle.
    #[error("failed to rasterize typeset output (detail: {0})")]
    Raster(String),
    /// The renderer was shut down while the request was in flight.
    #[error("renderer closed")]
    Closed,
}

/// Convenient alias used throughout the crate.
///
/// This corresponds to `core::result::Result<T, texrast::Error>`.
pub type Result<T, E = Error> = core::result::Result<T, E>;
