use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::debug;

use snapdiff::batch::{self, BatchPlan};
use snapdiff::config::{CONFIG_DIR, ResolvedRunConfig};
use snapdiff::store::SnapshotStore;
use snapdiff::{Engine, Loader};

use crate::report::terminal::{self, LineStatus};

/// `snapdiff run`: compare, record and report every stored snapshot.
/// Returns exit code: 0 = all pass, 1 = any fail, new or error.
pub async fn run(config: ResolvedRunConfig, filter: Option<&str>) -> Result<i32> {
    let mut store = SnapshotStore::open(CONFIG_DIR)?;
    let plan = BatchPlan::plan(&store, &config.policy, filter);
    let total = plan.total();
    if total == 0 {
        println!("No snapshots to compare.");
        return Ok(0);
    }

    let run_start = Instant::now();
    let mut passed = 0usize;
    let mut failed_names: Vec<String> = Vec::new();
    let mut new_names: Vec<String> = Vec::new();
    let mut errored_names: Vec<String> = Vec::new();

    for id in &plan.new {
        terminal::print_line(id, &LineStatus::New, Duration::ZERO);
        new_names.push(id.clone());
    }

    let engine = Engine::new(Loader::new(config.load_timeout)?);
    let mut rx = batch::compare_all(engine, plan.jobs, config.parallel);

    let mut done = new_names.len();
    debug!(total, "waiting for comparison results");
    while let Some((job, outcome)) = rx.recv().await {
        done += 1;
        debug!(done, total, id = %job.id, "received result");
        let (status, elapsed) = match outcome {
            Ok(result) => {
                store.record_comparison(&job.id, &result, config.threshold)?;
                let status = LineStatus::from_result(&result, config.threshold);
                if matches!(status, LineStatus::Fail { .. }) {
                    failed_names.push(job.id.clone());
                } else {
                    passed += 1;
                }
                (status, Duration::from_secs_f64(result.analysis_time_ms / 1000.0))
            }
            Err(e) => {
                errored_names.push(job.id.clone());
                (LineStatus::Error(e.to_string()), Duration::ZERO)
            }
        };
        terminal::print_line(&job.id, &status, elapsed);
        terminal::show_progress(done, total);
    }

    store.save()?;

    terminal::print_actionable_summary(&failed_names, &new_names, &errored_names);
    terminal::print_summary(
        total,
        passed,
        failed_names.len(),
        new_names.len(),
        errored_names.len(),
        run_start.elapsed(),
    );

    if failed_names.is_empty() && new_names.is_empty() && errored_names.is_empty() {
        Ok(0)
    } else {
        Ok(1)
    }
}
