//! Coalescing LaTeX‑to‑PNG rendering over an embedded math‑typesetting
//! runtime.
//!
//! Callers submit LaTeX source plus rendering parameters under a
//! caller‑supplied *key* and await PNG bytes. Keys are how repeated
//! requests for the same visual element coalesce: a new submission under a
//! key displaces the previous one, whose future resolves with `Ok(None)`
//! ("no value", not an error) instead of a stale image. Cancellation by key
//! is idempotent and authoritative for delivery: a cancelled job's future
//! fails with [`Error::Cancelled`] even when the underlying work finishes.
//!
//! The typesetting itself happens in an embedded runtime on a dedicated
//! worker thread. The default backend (feature `quick-js`, enabled by
//! default) evaluates a caller‑supplied JavaScript bundle that must define
//! a global [`ENTRY_FUNCTION`](runtime::ENTRY_FUNCTION) turning markup into
//! an SVG document; the engine rasterizes that document and encodes PNG.
//! Custom backends plug in through the [`Typesetter`] trait.
//!
//! # Usage
//!
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! texrast = "0.1"
//! ```
//!
//! # Examples
//!
//! ```no_run
//! # async fn demo() -> texrast::Result<()> {
//! let bundle = texrast::RuntimeSource::from_path("katex-svg.bundle.js")?;
//! let renderer = texrast::Renderer::new(bundle);
//!
//! let opts = texrast::RenderOptions::builder()
//!     .display_mode(true)
//!     .font_size(18.0)
//!     .build()
//!     .unwrap();
//! if let Some(png) = renderer.render_with_opts("eq-1", "E = mc^2", &opts).await? {
//!     std::fs::write("eq.png", png).unwrap();
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::{sync::Arc, thread};

use tokio::sync::mpsc;
use tracing::debug;

pub mod error;
pub use error::{Error, Result};

pub mod opts;
pub use opts::{RenderOptions, RenderOptionsBuilder, Rgba};

pub mod runtime;
pub use runtime::{RuntimeSource, TypesetSpec, Typesetter};

mod coalesce;
mod engine;
mod job;
mod raster;

pub use engine::{EngineConfig, EngineConfigBuilder};

use coalesce::JobTable;
use engine::TypesetterFactory;
use job::EngineJob;

/// Handle to the render pipeline.
///
/// Construct one per process (the embedded runtime is the expensive part)
/// and share it; all methods take `&self`. Dropping the handle closes the
/// job queue and lets the worker drain and exit; [`Renderer::shutdown`]
/// does the same but waits for the worker.
pub struct Renderer {
    table: Arc<JobTable>,
    queue: mpsc::UnboundedSender<EngineJob>,
    worker: thread::JoinHandle<()>,
}

impl Renderer {
    /// Create a renderer using the default typesetting backend and
    /// configuration.
    ///
    /// Never fails: when this target has no typesetting backend or the
    /// bundle cannot be evaluated, every render future fails with the
    /// corresponding error instead, so callers can fall back to showing
    /// the raw source text.
    pub fn new(source: RuntimeSource) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    /// Create a renderer with an explicit [`EngineConfig`].
    pub fn with_config(source: RuntimeSource, config: EngineConfig) -> Self {
        let stack_size = config.js_stack_size();
        Self::spawn(
            Box::new(move || runtime::default_typesetter(&source, stack_size)),
            config,
        )
    }

    /// Create a renderer over a custom [`Typesetter`].
    ///
    /// The factory runs on the worker thread, so the typesetter itself
    /// does not have to be `Send`.
    pub fn with_typesetter<F>(factory: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn Typesetter>> + Send + 'static,
    {
        Self::spawn(Box::new(factory), EngineConfig::default())
    }

    /// Create a renderer over a custom [`Typesetter`] with an explicit
    /// [`EngineConfig`].
    pub fn with_typesetter_and_config<F>(factory: F, config: EngineConfig) -> Self
    where
        F: FnOnce() -> Result<Box<dyn Typesetter>> + Send + 'static,
    {
        Self::spawn(Box::new(factory), config)
    }

    fn spawn(factory: TypesetterFactory, config: EngineConfig) -> Self {
        let table = Arc::new(JobTable::new());
        let (queue, worker) = engine::spawn(factory, config, Arc::clone(&table));
        Self {
            table,
            queue,
            worker,
        }
    }

    /// Render `text` under `key` with default options.
    #[inline]
    pub async fn render(&self, key: &str, text: &str) -> Result<Option<Vec<u8>>> {
        self.render_with_opts(key, text, RenderOptions::default())
            .await
    }

    /// Render `text` under `key` with explicit [options](`RenderOptions`).
    ///
    /// Resolves with `Ok(Some(png))` once this job completes, with
    /// `Ok(None)` if a later submission under the same key displaced it
    /// before completion, or with an error: [`Error::Cancelled`] after
    /// [`Renderer::cancel`], [`Error::InvalidRequest`] for empty text or a
    /// non‑positive font size (rejected before anything is enqueued), or a
    /// runtime/typesetting/rasterization failure.
    ///
    /// Futures for *different* keys complete in no particular order.
    pub async fn render_with_opts(
        &self,
        key: &str,
        text: &str,
        opts: impl AsRef<RenderOptions>,
    ) -> Result<Option<Vec<u8>>> {
        let opts = opts.as_ref();
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidRequest(
                "text is empty after trimming".to_owned(),
            ));
        }
        if opts.font_size() <= 0.0 {
            return Err(Error::InvalidRequest(format!(
                "font size must be positive, got {}",
                opts.font_size()
            )));
        }

        let (generation, reply) = self.table.submit(key);
        debug!(key, generation, "submitting render job");
        let job = EngineJob {
            key: key.to_owned(),
            generation,
            text: text.to_owned(),
            opts: opts.clone(),
        };
        if self.queue.send(job).is_err() {
            // Worker gone (it panicked, or shutdown raced this submit).
            self.table.deliver(key, generation, Err(Error::Closed));
        }

        match reply.await {
            Ok(result) => result,
            Err(_) => Err(Error::Closed),
        }
    }

    /// Cancel the outstanding job under `key`, if any.
    ///
    /// Idempotent: cancelling a key with no live job does nothing. An
    /// in‑flight job is not interrupted, but its result is discarded and
    /// its future fails with [`Error::Cancelled`] immediately.
    pub fn cancel(&self, key: &str) {
        debug!(key, "cancel requested");
        self.table.cancel(key);
    }

    /// Tear the pipeline down, waiting for the worker to drain and exit.
    ///
    /// Jobs still queued are processed before the worker exits; anything it
    /// could not answer fails with [`Error::Closed`].
    pub fn shutdown(self) {
        let Self {
            table,
            queue,
            worker,
        } = self;
        drop(queue);
        let _ = worker.join();
        table.close();
    }
}
