use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use snapdiff::config::ResolvedRunConfig;
use snapdiff::{ArtifactTarget, CompareRequest, Engine, IgnoreRegion, ImageRef, Loader};

use crate::report::terminal;

/// `snapdiff compare`: one baseline/current pair.
/// Returns exit code: 0 = within threshold, 1 = significant.
pub async fn compare(
    config: ResolvedRunConfig,
    baseline: &str,
    current: &str,
    ignore: Vec<IgnoreRegion>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<i32> {
    let engine = Engine::new(Loader::new(config.load_timeout)?);
    let request = CompareRequest {
        baseline: ImageRef::parse(baseline),
        current: ImageRef::parse(current),
        ignore_regions: ignore,
        policy: config.policy,
        artifact: output.map(ArtifactTarget::File).unwrap_or_default(),
    };
    debug!(baseline = %request.baseline, current = %request.current, "comparing");

    let result = engine.compare(request).await?;

    if json {
        let body = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{body}");
    } else {
        terminal::print_comparison(&result, config.threshold);
    }

    Ok(if result.is_significant(config.threshold) { 1 } else { 0 })
}
