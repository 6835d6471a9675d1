pub mod runner;

use crate::compare::ComparisonPolicy;
use crate::encode::ArtifactTarget;
use crate::engine::CompareRequest;
use crate::load::ImageRef;
use crate::store::{Snapshot, SnapshotStore};

pub use self::runner::{BatchOutcome, compare_all};

/// Normalize a string for filter comparison: lowercase + treat `_` and ` ` as equivalent.
pub fn normalize_for_filter(s: &str) -> String {
    s.to_lowercase().replace('_', " ")
}

/// A single comparison job built from a stored snapshot.
#[derive(Clone, Debug)]
pub struct SnapshotJob {
    pub id: String,
    pub request: CompareRequest,
}

impl SnapshotJob {
    fn from_snapshot(
        snapshot: &Snapshot,
        baseline: &str,
        policy: &ComparisonPolicy,
        store: &SnapshotStore,
    ) -> Self {
        Self {
            id: snapshot.id.clone(),
            request: CompareRequest {
                baseline: ImageRef::parse(baseline),
                current: ImageRef::parse(&snapshot.current_url),
                ignore_regions: snapshot.ignore_regions.clone(),
                policy: policy.clone(),
                artifact: ArtifactTarget::File(store.difference_path(&snapshot.id)),
            },
        }
    }
}

/// Check if a snapshot matches a case-insensitive filter pattern.
/// Strips a `.png` suffix so names copied from artifact paths work too.
pub fn matches_filter(snapshot: &Snapshot, pattern: &str) -> bool {
    let pattern = pattern.strip_suffix(".png").unwrap_or(pattern);
    let p = normalize_for_filter(pattern);
    normalize_for_filter(&snapshot.id).contains(&p)
        || normalize_for_filter(&snapshot.name).contains(&p)
}

/// Jobs for every snapshot with a baseline, plus the ids that have none.
pub struct BatchPlan {
    pub jobs: Vec<SnapshotJob>,
    pub new: Vec<String>,
}

impl BatchPlan {
    pub fn plan(store: &SnapshotStore, policy: &ComparisonPolicy, filter: Option<&str>) -> Self {
        let mut jobs = Vec::new();
        let mut new = Vec::new();
        for snapshot in store.list() {
            if filter.is_some_and(|pat| !matches_filter(snapshot, pat)) {
                continue;
            }
            match &snapshot.baseline_url {
                Some(baseline) => {
                    jobs.push(SnapshotJob::from_snapshot(snapshot, baseline, policy, store))
                }
                None => new.push(snapshot.id.clone()),
            }
        }
        Self { jobs, new }
    }

    pub fn total(&self) -> usize {
        self.jobs.len() + self.new.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_splits_new_and_comparable() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnapshotStore::open(dir.path()).unwrap();
        store.upsert_capture("login_form", Some("Login form"), "c1.png", Some("b1.png"), None);
        store.upsert_capture("signup", None, "c2.png", None, None);

        let plan = BatchPlan::plan(&store, &ComparisonPolicy::default(), None);
        assert_eq!(plan.total(), 2);
        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.new, vec!["signup".to_string()]);
        let job = &plan.jobs[0];
        assert_eq!(job.request.baseline, ImageRef::parse("b1.png"));
        assert_eq!(job.request.artifact, ArtifactTarget::File(store.difference_path("login_form")));
    }

    #[test]
    fn filter_normalizes_underscores() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SnapshotStore::open(dir.path()).unwrap();
        store.upsert_capture("login_form", None, "c1.png", Some("b1.png"), None);
        store.upsert_capture("signup", None, "c2.png", Some("b2.png"), None);

        let plan = BatchPlan::plan(&store, &ComparisonPolicy::default(), Some("LOGIN FORM.png"));
        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].id, "login_form");
    }
}
