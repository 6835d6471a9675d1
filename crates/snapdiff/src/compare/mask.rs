use std::borrow::Cow;
use std::str::FromStr;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Neutral opaque grey painted over ignored regions.
pub const DEFAULT_FILL: Rgba<u8> = Rgba([128, 128, 128, 255]);

/// Rectangle in source-image pixel coordinates excluded from comparison.
///
/// Origin may be negative; anything outside the image is clipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreRegion {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl IgnoreRegion {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open pixel bounds `(x0, y0, x1, y1)` inside a `w x h` image,
    /// or `None` when the region misses the image entirely.
    pub fn clip(&self, w: u32, h: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.clamp(0, w as i64);
        let y0 = self.y.clamp(0, h as i64);
        let x1 = self.x.saturating_add(self.width as i64).clamp(0, w as i64);
        let y1 = self.y.saturating_add(self.height as i64).clamp(0, h as i64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

impl FromStr for IgnoreRegion {
    type Err = String;

    /// Parses `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, w, h] = parts.as_slice() else {
            return Err(format!("expected x,y,width,height, got '{s}'"));
        };
        let coord = |v: &str| {
            v.parse::<i64>()
                .map_err(|e| format!("invalid coordinate '{v}': {e}"))
        };
        let size = |v: &str| {
            v.parse::<u32>()
                .map_err(|e| format!("invalid size '{v}': {e}"))
        };
        Ok(Self::new(coord(x)?, coord(y)?, size(w)?, size(h)?))
    }
}

/// Paint every ignored region with `fill`.
///
/// Borrows the input untouched when there is nothing to mask; otherwise
/// works on an owned copy so the caller's buffer is never mutated.
pub fn mask<'a>(
    image: &'a RgbaImage,
    regions: &[IgnoreRegion],
    fill: Rgba<u8>,
) -> Cow<'a, RgbaImage> {
    let (w, h) = image.dimensions();
    let clipped: Vec<_> = regions.iter().filter_map(|r| r.clip(w, h)).collect();
    if clipped.is_empty() {
        return Cow::Borrowed(image);
    }

    let mut out = image.clone();
    for (x0, y0, x1, y1) in clipped {
        for y in y0..y1 {
            for x in x0..x1 {
                out.put_pixel(x, y, fill);
            }
        }
    }
    Cow::Owned(out)
}
