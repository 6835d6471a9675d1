pub mod diff;
pub mod mask;
pub mod pixel;
pub mod policy;

use serde::{Deserialize, Serialize};

pub use self::diff::{Comparison, DimensionDifference, compare, compare_cancellable};
pub use self::mask::{DEFAULT_FILL, IgnoreRegion, mask};
pub use self::policy::{ComparisonPolicy, ErrorType, Rgb};

/// Diff percentage above which a change needs human review.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 5.0;

/// Final record handed back to the caller of a comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// 0.0-100.0, full precision; display with two decimals.
    pub diff_percentage: f64,
    /// Encoded diff raster (data URL or file path).
    pub diff_image_url: String,
    pub is_same_dimensions: bool,
    pub dimension_difference: Option<DimensionDifference>,
    pub analysis_time_ms: f64,
    pub diff_pixels: u64,
    pub total_pixels: u64,
}

impl ComparisonResult {
    pub fn is_significant(&self, threshold: f64) -> bool {
        is_significant_with(self.diff_percentage, threshold)
    }
}

/// `diff_percentage > 5.0`.
pub fn is_significant(diff_percentage: f64) -> bool {
    is_significant_with(diff_percentage, DEFAULT_SIGNIFICANCE_THRESHOLD)
}

/// Strictly greater: a diff exactly at the threshold is not significant.
pub fn is_significant_with(diff_percentage: f64, threshold: f64) -> bool {
    diff_percentage > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn significance_is_strict() {
        assert!(!is_significant(4.99));
        assert!(is_significant(5.01));
        assert!(!is_significant(5.0));
        assert!(!is_significant(0.0));
    }

    #[test]
    fn custom_threshold() {
        assert!(is_significant_with(0.5, 0.1));
        assert!(!is_significant_with(12.0, 12.0));
    }

    #[test]
    fn result_serializes_camel_case() {
        let r = ComparisonResult {
            diff_percentage: 1.5,
            diff_image_url: "data:image/png;base64,".into(),
            is_same_dimensions: false,
            dimension_difference: Some(DimensionDifference { width: 2, height: -1 }),
            analysis_time_ms: 3.0,
            diff_pixels: 3,
            total_pixels: 200,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["diffPercentage"], 1.5);
        assert_eq!(v["isSameDimensions"], false);
        assert_eq!(v["dimensionDifference"]["height"], -1);
        assert!(v.get("analysisTimeMs").is_some());
    }
}
