//! The render engine: one worker thread owning the typesetting runtime.
//!
//! All jobs for all keys funnel through a single runtime instance, so the
//! engine serializes the actual typesetting work; the per‑key coalescing in
//! [`JobTable`] only limits what gets *delivered*, plus a dequeue‑time skip
//! for jobs that were displaced or cancelled while still queued.
//!
//! The runtime is constructed on the worker thread itself (embedded JS
//! runtimes are not `Send`) via a factory the facade hands over. When
//! construction fails, the worker stays alive and answers every job with
//! the construction error so callers can fall back to plain text.

use std::{sync::Arc, thread};

use derive_builder::Builder;
use tokio::sync::mpsc;
use tracing::{debug, debug_span, warn};

use crate::{
    coalesce::JobTable,
    error::Result,
    job::EngineJob,
    raster,
    runtime::{Typesetter, DEFAULT_JS_STACK_SIZE},
};

/// Tuning knobs for the render engine.
///
/// # Example
///
/// ```
/// let config = texrast::EngineConfig::builder()
///     .raster_scale(2.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.raster_scale(), 2.0);
/// ```
#[non_exhaustive]
#[derive(Clone, Builder, Debug)]
#[builder(default)]
pub struct EngineConfig {
    /// Scale applied to the typeset output's natural size when
    /// rasterizing. Values above `1.0` suit high‑density displays.
    raster_scale: f32,
    /// Stack size in bytes for the embedded JS runtime.
    js_stack_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            raster_scale: 1.0,
            js_stack_size: DEFAULT_JS_STACK_SIZE,
        }
    }
}

impl EngineConfig {
    /// Return [`EngineConfigBuilder`].
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// The raster scale factor.
    pub fn raster_scale(&self) -> f32 {
        self.raster_scale
    }

    /// The embedded runtime's stack size in bytes.
    pub fn js_stack_size(&self) -> usize {
        self.js_stack_size
    }
}

/// Constructor for the worker's typesetting runtime; runs on the worker
/// thread.
pub(crate) type TypesetterFactory = Box<dyn FnOnce() -> Result<Box<dyn Typesetter>> + Send>;

/// Spawn the engine worker and return the job queue feeding it.
pub(crate) fn spawn(
    factory: TypesetterFactory,
    config: EngineConfig,
    table: Arc<JobTable>,
) -> (mpsc::UnboundedSender<EngineJob>, thread::JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = thread::spawn(move || run(factory, config, table, rx));
    (tx, handle)
}

fn run(
    factory: TypesetterFactory,
    config: EngineConfig,
    table: Arc<JobTable>,
    mut queue: mpsc::UnboundedReceiver<EngineJob>,
) {
    let typesetter = match factory() {
        Ok(typesetter) => typesetter,
        Err(init_err) => {
            warn!(error = %init_err, "typesetting runtime unavailable; failing all jobs");
            while let Some(job) = queue.blocking_recv() {
                table.deliver(&job.key, job.generation, Err(init_err.clone()));
            }
            return;
        }
    };

    while let Some(job) = queue.blocking_recv() {
        let span = debug_span!("render_job", key = %job.key, generation = job.generation);
        let _entered = span.enter();

        if !table.mark_running(&job.key, job.generation) {
            debug!("job displaced before start; skipping");
            continue;
        }

        let result = render_one(typesetter.as_ref(), &config, &job);
        if let Err(err) = &result {
            warn!(error = %err, "render job failed");
        }
        table.deliver(&job.key, job.generation, result);
    }

    debug!("render queue closed; engine worker exiting");
}

fn render_one(
    typesetter: &dyn Typesetter,
    config: &EngineConfig,
    job: &EngineJob,
) -> Result<Vec<u8>> {
    let svg = typesetter.typeset(&job.text, &job.opts.spec())?;
    raster::svg_to_png(&svg, config.raster_scale())
}
