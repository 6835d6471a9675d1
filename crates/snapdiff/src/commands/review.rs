use anyhow::Result;

use snapdiff::config::CONFIG_DIR;
use snapdiff::store::{Snapshot, SnapshotStore};

use crate::report::terminal;

/// Open the store, apply one transition, persist.
fn transition(
    id: &str,
    verb: &str,
    f: impl for<'a> FnOnce(&'a mut SnapshotStore, &str) -> Result<&'a Snapshot>,
) -> Result<()> {
    let mut store = SnapshotStore::open(CONFIG_DIR)?;
    let snapshot = f(&mut store, id)?;
    println!("  {verb}  {}  ({})", snapshot.id, snapshot.status.label());
    store.save()
}

/// `snapdiff approve <ID>`
pub fn approve(id: &str) -> Result<()> {
    transition(id, "Approved", SnapshotStore::approve)
}

/// `snapdiff reject <ID>`
pub fn reject(id: &str) -> Result<()> {
    transition(id, "Rejected", SnapshotStore::reject)
}

/// `snapdiff baseline <ID>`: the current image becomes the baseline.
pub fn set_baseline(id: &str) -> Result<()> {
    transition(id, "Baselined", SnapshotStore::set_as_baseline)
}

/// `snapdiff remove <ID>`
pub fn remove(id: &str) -> Result<()> {
    let mut store = SnapshotStore::open(CONFIG_DIR)?;
    let snapshot = store.remove(id)?;
    println!("  Removed  {}", snapshot.id);
    store.save()
}

/// `snapdiff list`
pub fn list() -> Result<()> {
    let store = SnapshotStore::open(CONFIG_DIR)?;
    terminal::print_snapshot_table(store.list());
    Ok(())
}
