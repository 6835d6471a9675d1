use serde::{Deserialize, Serialize};

use super::validate_threshold;
use crate::compare::policy::validate_transparency;
use crate::compare::{ComparisonPolicy, ErrorType, Rgb};

fn parse_threshold(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    validate_threshold(v)
}

fn parse_transparency(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    validate_transparency(v)
}

/// Comparison settings as they appear in `[diff]` and on the command line.
///
/// Every field is `Option`: `None` means "use default". Boolean flags take
/// an optional `=true|false` so a CLI flag can switch off a file setting.
#[derive(Clone, Debug, Default, clap::Args, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Compare luminance only (tolerates colour shifts)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_colors: Option<bool>,

    /// Do not count anti-aliased edge pixels as differences
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_antialiasing: Option<bool>,

    /// Leave the alpha channel out of the comparison
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_alpha: Option<bool>,

    /// Resample differently sized images instead of comparing the overlap
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_to_same_size: Option<bool>,

    /// How changed pixels are drawn in the diff image
    #[arg(long, value_enum)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,

    /// Highlight colour (RRGGBB or r,g,b)
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_color: Option<Rgb>,

    /// Opacity of unchanged pixels in the diff image (0.0-1.0)
    #[arg(long, value_parser = parse_transparency)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<f64>,

    /// Sample images wider or taller than this many pixels (0 = never)
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_image_threshold: Option<u32>,

    /// Diff percentage (0-100) above which a change is significant
    #[arg(long, value_parser = parse_threshold)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl DiffConfig {
    /// Overlay non-None fields from `other` onto self.
    pub fn merge(&mut self, other: &DiffConfig) {
        if other.ignore_colors.is_some() {
            self.ignore_colors = other.ignore_colors;
        }
        if other.ignore_antialiasing.is_some() {
            self.ignore_antialiasing = other.ignore_antialiasing;
        }
        if other.ignore_alpha.is_some() {
            self.ignore_alpha = other.ignore_alpha;
        }
        if other.scale_to_same_size.is_some() {
            self.scale_to_same_size = other.scale_to_same_size;
        }
        if other.error_type.is_some() {
            self.error_type = other.error_type;
        }
        if other.error_color.is_some() {
            self.error_color = other.error_color;
        }
        if other.transparency.is_some() {
            self.transparency = other.transparency;
        }
        if other.large_image_threshold.is_some() {
            self.large_image_threshold = other.large_image_threshold;
        }
        if other.threshold.is_some() {
            self.threshold = other.threshold;
        }
    }

    pub fn policy(&self) -> ComparisonPolicy {
        let d = ComparisonPolicy::default();
        ComparisonPolicy {
            ignore_colors: self.ignore_colors.unwrap_or(d.ignore_colors),
            ignore_antialiasing: self.ignore_antialiasing.unwrap_or(d.ignore_antialiasing),
            ignore_alpha: self.ignore_alpha.unwrap_or(d.ignore_alpha),
            scale_to_same_size: self.scale_to_same_size.unwrap_or(d.scale_to_same_size),
            error_type: self.error_type.unwrap_or(d.error_type),
            error_color: self.error_color.unwrap_or(d.error_color),
            transparency: self.transparency.unwrap_or(d.transparency),
            large_image_threshold: self.large_image_threshold.unwrap_or(d.large_image_threshold),
        }
    }
}
