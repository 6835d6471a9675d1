use std::path::Path;

use anyhow::{Context, Result};

use super::{CONFIG_DIR, CONFIG_FILE};

/// Hand-crafted config template with commented-out keys.
/// Written by `snapdiff init` so that users can see the available knobs.
pub(crate) const CONFIG_TEMPLATE: &str = r#"# ─────────────────────────────────────────────────────────
# Image loading: all fields optional.
# ─────────────────────────────────────────────────────────
[load]
# timeout_ms = 30000                # per-image network timeout

# ─────────────────────────────────────────────────────────
# Comparison: all fields optional.
# ─────────────────────────────────────────────────────────
[diff]
# ignore_colors = false             # compare luminance only
# ignore_antialiasing = false       # skip anti-aliased edge pixels
# ignore_alpha = false
# scale_to_same_size = true         # resample when dimensions differ
# error_type = "flat"               # flat | movement | flatDifferenceIntensity
#                                   # | movementDifferenceIntensity | diffOnly
# error_color = [255, 0, 255]
# transparency = 1.0                # opacity of unchanged pixels in the diff
# large_image_threshold = 1200      # sample above this size (0 = never)
# threshold = 5.0                   # diff % above which a change is significant

# ─────────────────────────────────────────────────────────
# Batch runs: all fields optional.
# ─────────────────────────────────────────────────────────
[run]
# parallel = 4                      # concurrent comparisons
"#;

pub fn config_file_exists() -> bool {
    Path::new(CONFIG_DIR).join(CONFIG_FILE).exists()
}

pub fn write_gitignore(force: bool) -> Result<()> {
    let path = Path::new(CONFIG_DIR).join(".gitignore");
    if !force && path.exists() {
        return Ok(());
    }
    std::fs::write(&path, "difference/\n")
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write the hand-crafted config template (with commented-out sections).
pub fn write_template() -> Result<()> {
    let dir = Path::new(CONFIG_DIR);
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {CONFIG_DIR} directory"))?;
    let path = dir.join(CONFIG_FILE);
    std::fs::write(&path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
