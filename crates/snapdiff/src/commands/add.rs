use anyhow::Result;

use snapdiff::IgnoreRegion;
use snapdiff::config::CONFIG_DIR;
use snapdiff::store::SnapshotStore;

/// `snapdiff add`: register or refresh a snapshot.
pub fn add(
    id: &str,
    current: &str,
    baseline: Option<&str>,
    name: Option<&str>,
    ignore: Vec<IgnoreRegion>,
) -> Result<()> {
    let mut store = SnapshotStore::open(CONFIG_DIR)?;
    let regions = if ignore.is_empty() { None } else { Some(ignore) };
    let snapshot = store.upsert_capture(id, name, current, baseline, regions);
    println!("  Added  {}  ({})", snapshot.id, snapshot.status.label());
    store.save()?;
    Ok(())
}
