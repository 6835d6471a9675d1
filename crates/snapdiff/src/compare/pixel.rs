//! Per-pixel colour math shared by the comparator.
//!
//! Tolerances are fixed: a channel (or luminance) delta of up to 16/255 is
//! treated as noise. That absorbs encoder rounding and mild colour-profile
//! drift while a single flipped pixel still registers.

use image::{Rgba, RgbaImage};

use super::policy::{ComparisonPolicy, ErrorType};

/// Largest per-channel delta still considered equal.
pub const CHANNEL_TOLERANCE: u8 = 16;

/// Largest luminance delta still considered equal (`ignore_colors` mode).
pub const BRIGHTNESS_TOLERANCE: f64 = 16.0;

/// Perceived brightness in 0-255.
///
/// Unless alpha is ignored, the pixel is blended onto white first so that
/// a transparent pixel and an opaque one of the same colour differ.
pub fn brightness(p: &Rgba<u8>, ignore_alpha: bool) -> f64 {
    let Rgba([r, g, b, a]) = *p;
    let (r, g, b) = if ignore_alpha {
        (r as f64, g as f64, b as f64)
    } else {
        let a = a as f64 / 255.0;
        (blend(r, a), blend(g, a), blend(b, a))
    };
    0.3 * r + 0.59 * g + 0.11 * b
}

fn blend(c: u8, a: f64) -> f64 {
    255.0 + (c as f64 - 255.0) * a
}

/// Whether two pixels differ beyond the fixed tolerance under `policy`.
pub fn differs(a: &Rgba<u8>, b: &Rgba<u8>, policy: &ComparisonPolicy) -> bool {
    if a == b {
        return false;
    }
    let alpha_differs = !policy.ignore_alpha && a[3].abs_diff(b[3]) > CHANNEL_TOLERANCE;
    if policy.ignore_colors {
        let ia = policy.ignore_alpha;
        let delta = (brightness(a, ia) - brightness(b, ia)).abs();
        return alpha_differs || delta > BRIGHTNESS_TOLERANCE;
    }
    alpha_differs || (0..3).any(|i| a[i].abs_diff(b[i]) > CHANNEL_TOLERANCE)
}

/// Size of the change between two pixels in 0-255.
pub fn delta_magnitude(a: &Rgba<u8>, b: &Rgba<u8>, policy: &ComparisonPolicy) -> u8 {
    if policy.ignore_colors {
        let ia = policy.ignore_alpha;
        return (brightness(a, ia) - brightness(b, ia)).abs().round().min(255.0) as u8;
    }
    let channels = if policy.ignore_alpha { 3 } else { 4 };
    let sum: u32 = (0..channels).map(|i| a[i].abs_diff(b[i]) as u32).sum();
    (sum / channels as u32) as u8
}

/// Diff-raster colour for a pixel that matched.
pub fn render_unchanged(base: &Rgba<u8>, policy: &ComparisonPolicy) -> Rgba<u8> {
    if policy.error_type == ErrorType::DiffOnly {
        return Rgba([0, 0, 0, 0]);
    }
    let Rgba([r, g, b, a]) = *base;
    let alpha = (a as f64 * policy.transparency).round() as u8;
    if policy.ignore_colors {
        let y = brightness(base, true).round() as u8;
        return Rgba([y, y, y, alpha]);
    }
    Rgba([r, g, b, alpha])
}

/// Diff-raster colour for a changed pixel, `a` being the baseline and `b` the current.
pub fn render_changed(a: &Rgba<u8>, b: &Rgba<u8>, policy: &ComparisonPolicy) -> Rgba<u8> {
    let [er, eg, eb] = policy.error_color.0;
    match policy.error_type {
        ErrorType::Flat | ErrorType::DiffOnly => Rgba([er, eg, eb, 255]),
        ErrorType::FlatDifferenceIntensity => {
            let intensity = delta_magnitude(a, b, policy).max(1);
            Rgba([er, eg, eb, intensity])
        }
        ErrorType::Movement => {
            let tint =
                |c: u8, e: u8| ((c as f64 * (e as f64 / 255.0) + e as f64) / 2.0).round() as u8;
            Rgba([tint(b[0], er), tint(b[1], eg), tint(b[2], eb), 255])
        }
        ErrorType::MovementDifferenceIntensity => {
            let ratio = delta_magnitude(a, b, policy) as f64 / 255.0 * 0.8;
            let tint = |c: u8, e: u8| {
                ((1.0 - ratio) * (c as f64 * (e as f64 / 255.0)) + ratio * e as f64).round() as u8
            };
            Rgba([tint(b[0], er), tint(b[1], eg), tint(b[2], eb), 255])
        }
    }
}

fn same_pixel(a: &Rgba<u8>, b: &Rgba<u8>, ignore_alpha: bool) -> bool {
    if ignore_alpha {
        a[0] == b[0] && a[1] == b[1] && a[2] == b[2]
    } else {
        a == b
    }
}

/// Inclusive 3x3 neighbourhood bounds of `(x, y)`, clamped to the image.
fn neighbourhood(x: u32, y: u32, w: u32, h: u32) -> (u32, u32, u32, u32) {
    (x.saturating_sub(1), y.saturating_sub(1), (x + 1).min(w - 1), (y + 1).min(h - 1))
}

fn on_border(x: u32, y: u32, w: u32, h: u32) -> bool {
    x == 0 || y == 0 || x == w - 1 || y == h - 1
}

/// Anti-aliasing check in both directions; `a` and `b` must share dimensions.
pub fn is_antialiased_pair(
    a: &RgbaImage,
    b: &RgbaImage,
    x: u32,
    y: u32,
    ignore_alpha: bool,
) -> bool {
    is_antialiased(a, b, x, y, ignore_alpha) || is_antialiased(b, a, x, y, ignore_alpha)
}

/// Whether `(x, y)` in `img` looks like an anti-aliased edge pixel.
///
/// Intensity-slope detector (Vysniauskas, 2009): the pixel must sit between
/// a darker and a brighter neighbour, have at most two identical neighbours,
/// and the darkest or brightest neighbour must lie inside a flat area in
/// both images.
pub fn is_antialiased(
    img: &RgbaImage,
    other: &RgbaImage,
    x: u32,
    y: u32,
    ignore_alpha: bool,
) -> bool {
    let (w, h) = img.dimensions();
    let (x0, y0, x1, y1) = neighbourhood(x, y, w, h);
    let center = img.get_pixel(x, y);
    let center_y = brightness(center, ignore_alpha);

    let mut zeroes: u32 = if on_border(x, y, w, h) { 1 } else { 0 };
    let mut min = 0.0;
    let mut max = 0.0;
    let mut min_at = (x, y);
    let mut max_at = (x, y);

    for ny in y0..=y1 {
        for nx in x0..=x1 {
            if nx == x && ny == y {
                continue;
            }
            let delta = brightness(img.get_pixel(nx, ny), ignore_alpha) - center_y;
            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                min_at = (nx, ny);
            } else if delta > max {
                max = delta;
                max_at = (nx, ny);
            }
        }
    }

    if min == 0.0 || max == 0.0 {
        return false;
    }

    let flat = |(px, py): (u32, u32)| {
        has_many_siblings(img, px, py, ignore_alpha)
            && has_many_siblings(other, px, py, ignore_alpha)
    };
    flat(min_at) || flat(max_at)
}

/// Whether `(x, y)` has 3+ identical neighbours (image border counts as one).
fn has_many_siblings(img: &RgbaImage, x: u32, y: u32, ignore_alpha: bool) -> bool {
    let (w, h) = img.dimensions();
    let (x0, y0, x1, y1) = neighbourhood(x, y, w, h);
    let center = img.get_pixel(x, y);

    let mut zeroes: u32 = if on_border(x, y, w, h) { 1 } else { 0 };
    for ny in y0..=y1 {
        for nx in x0..=x1 {
            if nx == x && ny == y {
                continue;
            }
            if same_pixel(center, img.get_pixel(nx, ny), ignore_alpha) {
                zeroes += 1;
                if zeroes > 2 {
                    return true;
                }
            }
        }
    }
    false
}
