use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::compare::{ComparisonResult, IgnoreRegion, is_significant_with};

pub const SNAPSHOTS_FILE: &str = "snapshots.json";
pub const DIFFERENCE_DIR: &str = "difference";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Approved,
    Rejected,
    /// Compared, awaiting review.
    Pending,
    /// No baseline yet.
    New,
    /// Compared and significantly different.
    Failed,
}

impl SnapshotStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Pending => "pending",
            Self::New => "new",
            Self::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    pub status: SnapshotStatus,
    pub baseline_url: Option<String>,
    pub current_url: String,
    pub diff_url: Option<String>,
    pub diff_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_regions: Vec<IgnoreRegion>,
    /// Unix seconds.
    pub updated_at: u64,
}

/// Delete a diff artifact; a missing file is fine.
fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed diff artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove diff artifact"),
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Snapshot repository rooted at one directory.
///
/// Holds every record in memory; nothing is shared between stores, and
/// changes reach disk only on [`SnapshotStore::save`].
pub struct SnapshotStore {
    root: PathBuf,
    snapshots: BTreeMap<String, Snapshot>,
}

impl SnapshotStore {
    /// Open the store at `root`. A missing `snapshots.json` is an empty store.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = root.join(SNAPSHOTS_FILE);
        let snapshots = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let list: Vec<Snapshot> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            list.into_iter().map(|s| (s.id.clone(), s)).collect()
        } else {
            BTreeMap::new()
        };
        debug!(root = %root.display(), count = snapshots.len(), "opened snapshot store");
        Ok(Self { root, snapshots })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {}", self.root.display()))?;
        let path = self.root.join(SNAPSHOTS_FILE);
        let list: Vec<&Snapshot> = self.snapshots.values().collect();
        let content = serde_json::to_string_pretty(&list).context("Failed to serialize snapshots")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Snapshot> {
        self.snapshots.get(id)
    }

    /// All snapshots, ordered by id.
    pub fn list(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.values()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Where the diff artifact for `id` lives. Slashes in ids become directories.
    pub fn difference_path(&self, id: &str) -> PathBuf {
        self.root.join(DIFFERENCE_DIR).join(format!("{id}.png"))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Snapshot> {
        self.snapshots
            .get_mut(id)
            .ok_or_else(|| anyhow!("Snapshot not found: {id}"))
    }

    /// Register a fresh capture. An explicit `baseline` replaces the stored
    /// one; otherwise the existing baseline (if any) is kept. Any previous
    /// diff is discarded.
    pub fn upsert_capture(
        &mut self,
        id: &str,
        name: Option<&str>,
        current_url: &str,
        baseline_url: Option<&str>,
        ignore_regions: Option<Vec<IgnoreRegion>>,
    ) -> &Snapshot {
        let stale_diff = self.difference_path(id);
        let snapshot = self.snapshots.entry(id.to_string()).or_insert_with(|| Snapshot {
            id: id.to_string(),
            name: id.to_string(),
            status: SnapshotStatus::New,
            baseline_url: None,
            current_url: String::new(),
            diff_url: None,
            diff_percentage: None,
            ignore_regions: Vec::new(),
            updated_at: 0,
        });
        if let Some(name) = name {
            snapshot.name = name.to_string();
        }
        if let Some(baseline) = baseline_url {
            snapshot.baseline_url = Some(baseline.to_string());
        }
        if let Some(regions) = ignore_regions {
            snapshot.ignore_regions = regions;
        }
        snapshot.current_url = current_url.to_string();
        snapshot.diff_url = None;
        snapshot.diff_percentage = None;
        snapshot.status = if snapshot.baseline_url.is_some() {
            SnapshotStatus::Pending
        } else {
            SnapshotStatus::New
        };
        snapshot.updated_at = now();
        remove_artifact(&stale_diff);
        snapshot
    }

    /// Store a comparison outcome. Significant changes fail; the rest wait for review.
    pub fn record_comparison(
        &mut self,
        id: &str,
        result: &ComparisonResult,
        threshold: f64,
    ) -> Result<&Snapshot> {
        let snapshot = self.get_mut(id)?;
        snapshot.diff_url = Some(result.diff_image_url.clone());
        snapshot.diff_percentage = Some(result.diff_percentage);
        snapshot.status = if is_significant_with(result.diff_percentage, threshold) {
            SnapshotStatus::Failed
        } else {
            SnapshotStatus::Pending
        };
        snapshot.updated_at = now();
        Ok(&*snapshot)
    }

    pub fn approve(&mut self, id: &str) -> Result<&Snapshot> {
        let snapshot = self.get_mut(id)?;
        snapshot.status = SnapshotStatus::Approved;
        snapshot.updated_at = now();
        Ok(&*snapshot)
    }

    pub fn reject(&mut self, id: &str) -> Result<&Snapshot> {
        let snapshot = self.get_mut(id)?;
        snapshot.status = SnapshotStatus::Rejected;
        snapshot.updated_at = now();
        Ok(&*snapshot)
    }

    /// Promote the current image to baseline; the diff is dropped.
    pub fn set_as_baseline(&mut self, id: &str) -> Result<&Snapshot> {
        let diff_path = self.difference_path(id);
        let snapshot = self.get_mut(id)?;
        snapshot.baseline_url = Some(snapshot.current_url.clone());
        snapshot.diff_url = None;
        snapshot.diff_percentage = Some(0.0);
        snapshot.status = SnapshotStatus::Approved;
        snapshot.updated_at = now();
        remove_artifact(&diff_path);
        Ok(&*snapshot)
    }

    pub fn remove(&mut self, id: &str) -> Result<Snapshot> {
        let snapshot = self
            .snapshots
            .remove(id)
            .ok_or_else(|| anyhow!("Snapshot not found: {id}"))?;
        remove_artifact(&self.difference_path(id));
        Ok(snapshot)
    }
}
