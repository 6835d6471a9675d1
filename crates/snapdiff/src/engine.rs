use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use image::RgbaImage;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, debug_span};

use crate::compare::{self, ComparisonPolicy, ComparisonResult, DEFAULT_FILL, IgnoreRegion};
use crate::encode::{self, ArtifactTarget};
use crate::error::DiffError;
use crate::load::{ImageRef, Loader};

/// One baseline/current pair plus everything that shapes the comparison.
#[derive(Clone, Debug)]
pub struct CompareRequest {
    pub baseline: ImageRef,
    pub current: ImageRef,
    pub ignore_regions: Vec<IgnoreRegion>,
    pub policy: ComparisonPolicy,
    pub artifact: ArtifactTarget,
}

impl CompareRequest {
    pub fn new(baseline: ImageRef, current: ImageRef) -> Self {
        Self {
            baseline,
            current,
            ignore_regions: Vec::new(),
            policy: ComparisonPolicy::default(),
            artifact: ArtifactTarget::DataUrl,
        }
    }
}

/// Mask, compare and encode two decoded rasters.
///
/// Synchronous and free of shared state; callers on an async runtime
/// should go through [`Engine`] which moves this onto the blocking pool.
pub fn analyze(
    baseline: &RgbaImage,
    current: &RgbaImage,
    regions: &[IgnoreRegion],
    policy: &ComparisonPolicy,
    artifact: &ArtifactTarget,
    cancel: &AtomicBool,
) -> Result<ComparisonResult, DiffError> {
    let t0 = Instant::now();

    let left = compare::mask(baseline, regions, DEFAULT_FILL);
    let right = compare::mask(current, regions, DEFAULT_FILL);
    if !regions.is_empty() {
        debug!(regions = regions.len(), "masked ignore regions");
    }

    let comparison = compare::compare_cancellable(&left, &right, policy, cancel)?;
    if cancel.load(Ordering::Relaxed) {
        return Err(DiffError::Cancelled);
    }

    let t1 = Instant::now();
    let png = encode::encode_png(&comparison.diff_image)?;
    // Nothing reaches the artifact target once the caller has cancelled.
    if cancel.load(Ordering::Relaxed) {
        return Err(DiffError::Cancelled);
    }
    let diff_image_url = encode::publish(&png, artifact)?;
    debug!(
        bytes = diff_image_url.len(),
        elapsed_ms = t1.elapsed().as_millis() as u64,
        "encoded diff image"
    );

    Ok(ComparisonResult {
        diff_percentage: comparison.diff_percentage,
        diff_image_url,
        is_same_dimensions: comparison.is_same_dimensions,
        dimension_difference: comparison.dimension_difference,
        analysis_time_ms: t0.elapsed().as_secs_f64() * 1000.0,
        diff_pixels: comparison.diff_pixels,
        total_pixels: comparison.total_pixels,
    })
}

/// Async front door: loads both references, then analyzes off the executor.
#[derive(Clone)]
pub struct Engine {
    loader: Arc<Loader>,
}

impl Engine {
    pub fn new(loader: Loader) -> Self {
        Self {
            loader: Arc::new(loader),
        }
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Run one comparison to completion. Dropping the future stops the
    /// loading stage; use [`Engine::spawn`] to also stop the pixel loop.
    pub async fn compare(&self, request: CompareRequest) -> Result<ComparisonResult, DiffError> {
        run(self.loader.clone(), request, Arc::new(AtomicBool::new(false))).await
    }

    /// Start a comparison on the runtime and return a cancellable handle.
    pub fn spawn(&self, request: CompareRequest) -> ComparisonTask {
        let cancel = Arc::new(AtomicBool::new(false));
        let span = debug_span!("compare", baseline = %request.baseline, current = %request.current);
        let handle =
            tokio::spawn(run(self.loader.clone(), request, cancel.clone()).instrument(span));
        ComparisonTask { handle, cancel }
    }
}

async fn run(
    loader: Arc<Loader>,
    request: CompareRequest,
    cancel: Arc<AtomicBool>,
) -> Result<ComparisonResult, DiffError> {
    let t0 = Instant::now();
    let (baseline, current) = futures::try_join!(
        loader.load(&request.baseline),
        loader.load(&request.current)
    )?;
    debug!(
        baseline = %format!("{}x{}", baseline.width(), baseline.height()),
        current = %format!("{}x{}", current.width(), current.height()),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "both images loaded"
    );

    let CompareRequest {
        ignore_regions,
        policy,
        artifact,
        ..
    } = request;
    let mut result = tokio::task::spawn_blocking(move || {
        analyze(&baseline, &current, &ignore_regions, &policy, &artifact, &cancel)
    })
    .await
    .map_err(|e| DiffError::Task(e.to_string()))??;

    result.analysis_time_ms = t0.elapsed().as_secs_f64() * 1000.0;
    Ok(result)
}

/// Handle to an in-flight comparison. Results arrive in completion order;
/// concurrent tasks carry no ordering guarantee between them.
pub struct ComparisonTask {
    handle: JoinHandle<Result<ComparisonResult, DiffError>>,
    cancel: Arc<AtomicBool>,
}

impl ComparisonTask {
    /// Stop the comparison. Loading is aborted immediately; a running pixel
    /// loop notices at its next row. No shared state is left behind since
    /// every buffer belongs to the task.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> Result<ComparisonResult, DiffError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(DiffError::Cancelled),
            Err(e) => Err(DiffError::Task(e.to_string())),
        }
    }
}
