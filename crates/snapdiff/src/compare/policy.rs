use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Image dimension above which the comparator samples instead of visiting every pixel.
pub const DEFAULT_LARGE_IMAGE_THRESHOLD: u32 = 1200;

/// How changed pixels are painted in the diff raster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorType {
    /// Solid `error_color`.
    #[default]
    Flat,
    /// Current pixel tinted towards `error_color`.
    Movement,
    /// `error_color` with alpha proportional to the pixel delta.
    FlatDifferenceIntensity,
    /// Tint whose strength grows with the pixel delta.
    MovementDifferenceIntensity,
    /// Only changed pixels are drawn; everything else is transparent.
    DiffOnly,
}

/// An opaque RGB colour. Parses from `ff00ff`, `#ff00ff` or `255,0,255`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const MAGENTA: Rgb = Rgb([255, 0, 255]);
}

impl Default for Rgb {
    fn default() -> Self {
        Self::MAGENTA
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(',') {
            let parts: Vec<&str> = s.split(',').map(str::trim).collect();
            let [r, g, b] = parts.as_slice() else {
                return Err(format!("expected three components, got '{s}'"));
            };
            let channel = |v: &str| {
                v.parse::<u8>()
                    .map_err(|e| format!("invalid colour component '{v}': {e}"))
            };
            return Ok(Rgb([channel(r)?, channel(g)?, channel(b)?]));
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected RRGGBB hex colour, got '{s}'"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("invalid hex colour '{s}': {e}"))
        };
        Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }
}

/// Immutable comparison settings, passed by value into a single compare call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComparisonPolicy {
    /// Compare luminance only.
    pub ignore_colors: bool,
    /// Do not count pixels that look like anti-aliased edges.
    pub ignore_antialiasing: bool,
    /// Leave the alpha channel out of every metric.
    pub ignore_alpha: bool,
    /// Resample the smaller image when dimensions differ.
    pub scale_to_same_size: bool,
    pub error_type: ErrorType,
    pub error_color: Rgb,
    /// Opacity (0.0-1.0) of unchanged pixels in the diff raster.
    pub transparency: f64,
    /// 0 disables sampling.
    pub large_image_threshold: u32,
}

impl Default for ComparisonPolicy {
    fn default() -> Self {
        Self {
            ignore_colors: false,
            ignore_antialiasing: false,
            ignore_alpha: false,
            scale_to_same_size: true,
            error_type: ErrorType::Flat,
            error_color: Rgb::MAGENTA,
            transparency: 1.0,
            large_image_threshold: DEFAULT_LARGE_IMAGE_THRESHOLD,
        }
    }
}

pub fn validate_transparency(v: f64) -> Result<f64, String> {
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("transparency must be between 0.0 and 1.0, got {v}"));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_parses_hex_and_triples() {
        assert_eq!("ff00ff".parse::<Rgb>().unwrap(), Rgb::MAGENTA);
        assert_eq!("#00ff10".parse::<Rgb>().unwrap(), Rgb([0, 255, 16]));
        assert_eq!("1, 2,3".parse::<Rgb>().unwrap(), Rgb([1, 2, 3]));
        assert!("12345".parse::<Rgb>().is_err());
        assert!("1,2".parse::<Rgb>().is_err());
        assert!("256,0,0".parse::<Rgb>().is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        let p = ComparisonPolicy::default();
        assert!(p.scale_to_same_size);
        assert!(!p.ignore_colors && !p.ignore_antialiasing && !p.ignore_alpha);
        assert_eq!(p.error_color, Rgb([255, 0, 255]));
        assert_eq!(p.transparency, 1.0);
        assert_eq!(p.large_image_threshold, 1200);
        assert_eq!(p.error_type, ErrorType::Flat);
    }

    #[test]
    fn policy_deserializes_camel_case_with_defaults() {
        let p: ComparisonPolicy = serde_json::from_str(
            r#"{"ignoreColors": true, "errorType": "movementDifferenceIntensity"}"#,
        )
        .unwrap();
        assert!(p.ignore_colors);
        assert_eq!(p.error_type, ErrorType::MovementDifferenceIntensity);
        assert!(p.scale_to_same_size);
    }
}
