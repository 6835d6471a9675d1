use std::io::Write;
use std::time::Duration;

use snapdiff::store::{Snapshot, SnapshotStatus};
use snapdiff::{ComparisonResult, DimensionDifference};

/// Outcome of one snapshot in a `snapdiff run`.
pub enum LineStatus {
    Pass {
        diff_percentage: f64,
    },
    Fail {
        diff_percentage: f64,
        dimension_difference: Option<DimensionDifference>,
    },
    New,
    Error(String),
}

impl LineStatus {
    pub fn from_result(result: &ComparisonResult, threshold: f64) -> Self {
        if result.is_significant(threshold) {
            Self::Fail {
                diff_percentage: result.diff_percentage,
                dimension_difference: result.dimension_difference,
            }
        } else {
            Self::Pass {
                diff_percentage: result.diff_percentage,
            }
        }
    }
}

/// Clear the current terminal line (wipes progress indicator).
pub fn clear_line() {
    print!("\r\x1b[2K");
}

pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

fn format_dimensions(d: &DimensionDifference) -> String {
    format!("{:+}x{:+}", d.width, d.height)
}

/// Print a single snapshot result line.
pub fn print_line(name: &str, status: &LineStatus, elapsed: Duration) {
    clear_line();
    let time_suffix = format!("  \x1b[2m{}\x1b[0m", format_duration(elapsed));

    match status {
        LineStatus::Pass { diff_percentage } => {
            println!("  \x1b[32mPASS\x1b[0m  {name}  ({diff_percentage:.2}%){time_suffix}");
        }
        LineStatus::Fail {
            diff_percentage,
            dimension_difference,
        } => match dimension_difference {
            Some(d) => {
                let dims = format_dimensions(d);
                println!(
                    "  \x1b[31mFAIL\x1b[0m  {name}  ({diff_percentage:.2}%, dimensions changed {dims}){time_suffix}"
                );
            }
            None => {
                println!("  \x1b[31mFAIL\x1b[0m  {name}  ({diff_percentage:.2}%){time_suffix}");
            }
        },
        LineStatus::New => {
            println!("  \x1b[33m NEW\x1b[0m  {name}  (no baseline)");
        }
        LineStatus::Error(msg) => {
            println!("  \x1b[31m ERR\x1b[0m  {name}  ({msg}){time_suffix}");
        }
    }
}

/// Show comparison progress indicator.
pub fn show_progress(done: usize, total: usize) {
    if done < total {
        print!("  Comparing  [{done}/{total}]");
        let _ = std::io::stdout().flush();
    }
}

/// Print a single comparison as a short report (used by `snapdiff compare`).
pub fn print_comparison(result: &ComparisonResult, threshold: f64) {
    let verdict = if result.is_significant(threshold) {
        "\x1b[31msignificant\x1b[0m"
    } else {
        "\x1b[32mwithin threshold\x1b[0m"
    };
    println!("Difference: {:.2}%  ({verdict}, threshold {threshold}%)", result.diff_percentage);
    println!("Pixels:     {} of {} differ", result.diff_pixels, result.total_pixels);
    if let Some(d) = &result.dimension_difference {
        println!("Dimensions: changed by {}", format_dimensions(d));
    }
    println!("Time:       {:.0}ms", result.analysis_time_ms);
    if !result.diff_image_url.starts_with("data:") {
        println!("Diff image: {}", result.diff_image_url);
    }
}

fn status_label(status: SnapshotStatus) -> String {
    let color = match status {
        SnapshotStatus::Approved => "32",
        SnapshotStatus::Rejected | SnapshotStatus::Failed => "31",
        SnapshotStatus::New => "33",
        SnapshotStatus::Pending => "2",
    };
    format!("\x1b[{color}m{:>8}\x1b[0m", status.label())
}

/// Print one row per stored snapshot.
pub fn print_snapshot_table<'a>(snapshots: impl Iterator<Item = &'a Snapshot>) {
    let mut any = false;
    for s in snapshots {
        any = true;
        let pct = s
            .diff_percentage
            .map(|p| format!("{p:.2}%"))
            .unwrap_or_else(|| "-".to_string());
        let name = if s.name == s.id {
            s.id.clone()
        } else {
            format!("{}  \x1b[2m{}\x1b[0m", s.id, s.name)
        };
        println!("  {}  {pct:>8}  {name}", status_label(s.status));
    }
    if !any {
        println!("No snapshots yet. Add one with `snapdiff add`.");
    }
}

/// Print an actionable summary listing snapshot names grouped by status.
/// Only prints sections with at least one entry.
pub fn print_actionable_summary(failed: &[String], new: &[String], errored: &[String]) {
    if failed.is_empty() && new.is_empty() && errored.is_empty() {
        return;
    }

    clear_line();
    println!();
    println!("Actionable snapshots:");

    for (label, names) in [("Failed", failed), ("New", new), ("Errored", errored)] {
        if !names.is_empty() {
            println!();
            println!("  {label} ({}):", names.len());
            for name in names {
                println!("    {name}");
            }
        }
    }
}

/// Print the final summary.
pub fn print_summary(
    total: usize,
    passed: usize,
    failed: usize,
    new: usize,
    errored: usize,
    elapsed: Duration,
) {
    clear_line();
    println!();
    print!(
        "Snapshots:  {total} total, \x1b[32m{passed} passed\x1b[0m, \x1b[31m{failed} failed\x1b[0m, \x1b[33m{new} new\x1b[0m"
    );
    if errored > 0 {
        print!(", \x1b[31m{errored} errored\x1b[0m");
    }
    println!();
    println!("Time:       {}", format_duration(elapsed));

    if failed > 0 || new > 0 || errored > 0 {
        println!();
        if failed > 0 {
            println!("{failed} snapshot(s) have significant visual differences.");
        }
        if new > 0 {
            println!("{new} snapshot(s) have no baseline.");
        }
        if errored > 0 {
            println!("{errored} snapshot(s) could not be compared.");
        }
        println!(
            "Run `snapdiff approve <ID>` to accept, or `snapdiff baseline <ID>` to adopt the current image."
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(pct: f64) -> ComparisonResult {
        ComparisonResult {
            diff_percentage: pct,
            diff_image_url: String::new(),
            is_same_dimensions: true,
            dimension_difference: None,
            analysis_time_ms: 0.0,
            diff_pixels: 0,
            total_pixels: 0,
        }
    }

    #[test]
    fn durations_switch_units_at_one_second() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
    }

    #[test]
    fn line_status_uses_strict_threshold() {
        assert!(matches!(LineStatus::from_result(&result(5.0), 5.0), LineStatus::Pass { .. }));
        assert!(matches!(LineStatus::from_result(&result(5.01), 5.0), LineStatus::Fail { .. }));
    }

    #[test]
    fn dimension_delta_is_signed() {
        let d = DimensionDifference { width: -4, height: 12 };
        assert_eq!(format_dimensions(&d), "-4x+12");
    }
}
