use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use image::RgbaImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pixel;
use super::policy::ComparisonPolicy;
use crate::error::DiffError;

/// Signed `baseline - current` size delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionDifference {
    pub width: i64,
    pub height: i64,
}

/// Raw outcome of a pixel comparison, before the diff raster is encoded.
pub struct Comparison {
    /// Pixels classified as different.
    pub diff_pixels: u64,
    /// Pixels in the compared canvas.
    pub total_pixels: u64,
    /// 0.0 = identical, 100.0 = everything changed.
    pub diff_percentage: f64,
    pub diff_image: RgbaImage,
    pub is_same_dimensions: bool,
    pub dimension_difference: Option<DimensionDifference>,
    /// Edge length of the blocks that share one anti-aliasing verdict;
    /// 1 means the detector ran on every candidate pixel.
    pub aa_block: u32,
}

/// Compare `baseline` against `current`. Pure and synchronous: run it off
/// any async executor (`spawn_blocking`).
pub fn compare(
    baseline: &RgbaImage,
    current: &RgbaImage,
    policy: &ComparisonPolicy,
) -> Result<Comparison, DiffError> {
    compare_cancellable(baseline, current, policy, &AtomicBool::new(false))
}

/// Like [`compare`], but gives up with [`DiffError::Cancelled`] once
/// `cancel` is raised. The flag is polled once per row.
pub fn compare_cancellable(
    baseline: &RgbaImage,
    current: &RgbaImage,
    policy: &ComparisonPolicy,
    cancel: &AtomicBool,
) -> Result<Comparison, DiffError> {
    let (aw, ah) = baseline.dimensions();
    let (bw, bh) = current.dimensions();
    let a_empty = aw == 0 || ah == 0;
    let b_empty = bw == 0 || bh == 0;
    if a_empty && b_empty {
        return Err(DiffError::Dimension {
            left_w: aw,
            left_h: ah,
            right_w: bw,
            right_h: bh,
        });
    }

    let is_same_dimensions = (aw, ah) == (bw, bh);
    let dimension_difference = (!is_same_dimensions).then(|| DimensionDifference {
        width: aw as i64 - bw as i64,
        height: ah as i64 - bh as i64,
    });

    let t0 = Instant::now();
    let outcome = if is_same_dimensions {
        diff_same_size(baseline, current, policy, cancel)?
    } else if policy.scale_to_same_size && !a_empty && !b_empty {
        let (left, right) = scale_to_common(baseline, current);
        debug!(
            width = left.width(),
            height = left.height(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "resampled to common size"
        );
        diff_same_size(&left, &right, policy, cancel)?
    } else {
        diff_overlap(baseline, current, policy, cancel)?
    };

    let total_pixels = (outcome.image.width() as u64) * (outcome.image.height() as u64);
    let diff_pixels = outcome.mismatched;
    debug!(
        diff_pixels,
        total_pixels,
        aa_block = outcome.aa_block,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "pixel comparison done"
    );

    Ok(Comparison {
        diff_pixels,
        total_pixels,
        diff_percentage: diff_pixels as f64 / total_pixels as f64 * 100.0,
        diff_image: outcome.image,
        is_same_dimensions,
        dimension_difference,
        aa_block: outcome.aa_block,
    })
}

struct Outcome {
    mismatched: u64,
    image: RgbaImage,
    aa_block: u32,
}

/// Block size for anti-aliasing verdicts, keeping detector runs within
/// `threshold` per axis.
fn aa_block_size(w: u32, h: u32, threshold: u32) -> u32 {
    let longest = w.max(h);
    if threshold == 0 || longest <= threshold {
        return 1;
    }
    longest.div_ceil(threshold)
}

/// Resize one image to the other's dimensions. The target is the larger
/// image by `(area, width)`, so swapping the arguments picks the same canvas.
fn scale_to_common<'a>(
    baseline: &'a RgbaImage,
    current: &'a RgbaImage,
) -> (Cow<'a, RgbaImage>, Cow<'a, RgbaImage>) {
    let key = |img: &RgbaImage| (img.width() as u64 * img.height() as u64, img.width());
    if key(baseline) >= key(current) {
        let (w, h) = baseline.dimensions();
        let scaled = imageops::resize(current, w, h, FilterType::Triangle);
        (Cow::Borrowed(baseline), Cow::Owned(scaled))
    } else {
        let (w, h) = current.dimensions();
        let scaled = imageops::resize(baseline, w, h, FilterType::Triangle);
        (Cow::Owned(scaled), Cow::Borrowed(current))
    }
}

/// Classify every pixel. The delta test always runs per pixel; above the
/// large-image threshold the anti-aliasing detector runs once per block and
/// its verdict covers every other candidate in that block.
fn diff_same_size(
    a: &RgbaImage,
    b: &RgbaImage,
    policy: &ComparisonPolicy,
    cancel: &AtomicBool,
) -> Result<Outcome, DiffError> {
    let (w, h) = a.dimensions();
    let mut out = RgbaImage::new(w, h);

    // Byte-identical: nothing to classify.
    if a.as_raw() == b.as_raw() {
        for (x, y, p) in a.enumerate_pixels() {
            out.put_pixel(x, y, pixel::render_unchanged(p, policy));
        }
        return Ok(Outcome {
            mismatched: 0,
            image: out,
            aa_block: 1,
        });
    }

    let block = aa_block_size(w, h, policy.large_image_threshold);
    let mut verdicts: Vec<Option<bool>> = vec![None; w.div_ceil(block) as usize];
    let mut mismatched: u64 = 0;

    for y in 0..h {
        if cancel.load(Ordering::Relaxed) {
            return Err(DiffError::Cancelled);
        }
        if y % block == 0 {
            verdicts.fill(None);
        }
        for x in 0..w {
            let pa = a.get_pixel(x, y);
            let pb = b.get_pixel(x, y);
            let mut changed = pixel::differs(pa, pb, policy);
            if changed && policy.ignore_antialiasing {
                let slot = &mut verdicts[(x / block) as usize];
                let aa = *slot.get_or_insert_with(|| {
                    pixel::is_antialiased_pair(a, b, x, y, policy.ignore_alpha)
                });
                changed = !aa;
            }

            let rendered = if changed {
                mismatched += 1;
                pixel::render_changed(pa, pb, policy)
            } else {
                pixel::render_unchanged(pa, policy)
            };
            out.put_pixel(x, y, rendered);
        }
    }

    Ok(Outcome {
        mismatched,
        image: out,
        aa_block: block,
    })
}

/// Compare only the shared top-left area; everything outside it counts as
/// changed and is painted with the error colour.
fn diff_overlap(
    a: &RgbaImage,
    b: &RgbaImage,
    policy: &ComparisonPolicy,
    cancel: &AtomicBool,
) -> Result<Outcome, DiffError> {
    let w = a.width().max(b.width());
    let h = a.height().max(b.height());
    let ow = a.width().min(b.width());
    let oh = a.height().min(b.height());

    let [er, eg, eb] = policy.error_color.0;
    let mut canvas = RgbaImage::from_pixel(w, h, image::Rgba([er, eg, eb, 255]));

    let canvas_area = w as u64 * h as u64;
    let overlap_area = ow as u64 * oh as u64;

    let (overlap_mismatched, aa_block) = if ow > 0 && oh > 0 {
        let left = imageops::crop_imm(a, 0, 0, ow, oh).to_image();
        let right = imageops::crop_imm(b, 0, 0, ow, oh).to_image();
        let inner = diff_same_size(&left, &right, policy, cancel)?;
        imageops::replace(&mut canvas, &inner.image, 0, 0);
        (inner.mismatched, inner.aa_block)
    } else {
        (0, 1)
    };

    Ok(Outcome {
        mismatched: overlap_mismatched + (canvas_area - overlap_area),
        image: canvas,
        aa_block,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::mask::{DEFAULT_FILL, IgnoreRegion, mask};
    use crate::compare::policy::{ErrorType, Rgb};
    use image::Rgba;

    const GREY: Rgba<u8> = Rgba([128, 128, 128, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn solid(w: u32, h: u32, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(w, h, color)
    }

    /// Flip `n` scattered pixels to red.
    fn with_pixel_diffs(img: &RgbaImage, n: u32) -> RgbaImage {
        let mut img = img.clone();
        let (w, h) = img.dimensions();
        for i in 0..n {
            let x = ((i as u64 * 7919) % w as u64) as u32;
            let y = ((i as u64 * 6271) % h as u64) as u32;
            img.put_pixel(x, y, RED);
        }
        img
    }

    /// Deterministic noise so nothing is flat.
    fn noise(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            let v = ((x * 31 + y * 17) ^ (x * y)) as u8;
            Rgba([v, v.wrapping_mul(3), v.wrapping_add(90), 255])
        })
    }

    // -- identity and bounds --

    #[test]
    fn identical_images_score_zero() {
        let img = noise(40, 30);
        let r = compare(&img, &img.clone(), &ComparisonPolicy::default()).unwrap();
        assert_eq!(r.diff_percentage, 0.0);
        assert_eq!(r.diff_pixels, 0);
        assert_eq!(r.total_pixels, 1200);
        assert!(r.is_same_dimensions);
        assert!(r.dimension_difference.is_none());
    }

    #[test]
    fn black_vs_white_is_total_mismatch() {
        let black = solid(20, 20, Rgba([0, 0, 0, 255]));
        let white = solid(20, 20, Rgba([255, 255, 255, 255]));
        for policy in [
            ComparisonPolicy::default(),
            ComparisonPolicy {
                ignore_colors: true,
                ignore_antialiasing: true,
                ..ComparisonPolicy::default()
            },
        ] {
            let r = compare(&black, &white, &policy).unwrap();
            assert_eq!(r.diff_percentage, 100.0);
        }
    }

    #[test]
    fn single_red_pixel_is_one_percent() {
        let base = solid(10, 10, GREY);
        let mut cur = base.clone();
        cur.put_pixel(3, 7, RED);
        let r = compare(&base, &cur, &ComparisonPolicy::default()).unwrap();
        assert_eq!(r.diff_pixels, 1);
        assert!((r.diff_percentage - 1.0).abs() < 1e-9);
        assert_eq!(*r.diff_image.get_pixel(3, 7), Rgba([255, 0, 255, 255]));
        assert_eq!(*r.diff_image.get_pixel(0, 0), GREY);
    }

    #[test]
    fn sub_tolerance_nudge_is_ignored() {
        let base = solid(50, 50, GREY);
        let mut cur = base.clone();
        cur.put_pixel(0, 0, Rgba([129, 128, 128, 255]));
        let r = compare(&base, &cur, &ComparisonPolicy::default()).unwrap();
        assert_eq!(r.diff_pixels, 0);
    }

    #[test]
    fn comparison_is_symmetric() {
        let a = noise(30, 30);
        let b = with_pixel_diffs(&a, 45);
        for policy in [
            ComparisonPolicy::default(),
            ComparisonPolicy {
                ignore_antialiasing: true,
                ..ComparisonPolicy::default()
            },
            ComparisonPolicy {
                ignore_colors: true,
                ..ComparisonPolicy::default()
            },
        ] {
            let ab = compare(&a, &b, &policy).unwrap().diff_percentage;
            let ba = compare(&b, &a, &policy).unwrap().diff_percentage;
            assert!((ab - ba).abs() < 1e-9, "{ab} vs {ba}");
        }
    }

    #[test]
    fn swapped_dimensions_resample_to_the_same_canvas() {
        let tall = noise(10, 20);
        let wide = RgbaImage::from_fn(20, 10, |x, y| {
            if (x + y) % 3 == 0 { RED } else { GREY }
        });
        for policy in [
            ComparisonPolicy::default(),
            ComparisonPolicy {
                ignore_antialiasing: true,
                ..ComparisonPolicy::default()
            },
        ] {
            let ab = compare(&tall, &wide, &policy).unwrap();
            let ba = compare(&wide, &tall, &policy).unwrap();
            assert_eq!(ab.diff_image.dimensions(), (20, 10));
            assert_eq!(ba.diff_image.dimensions(), (20, 10));
            assert_eq!(ab.diff_pixels, ba.diff_pixels);
            assert!((ab.diff_percentage - ba.diff_percentage).abs() < 1e-9);
            let delta = |width, height| Some(DimensionDifference { width, height });
            assert_eq!(ab.dimension_difference, delta(-10, 10));
            assert_eq!(ba.dimension_difference, delta(10, -10));
        }
    }

    // -- policy toggles --

    #[test]
    fn colour_filter_only_matters_without_ignore_colors() {
        let base = solid(10, 10, GREY);
        let tinted = solid(10, 10, Rgba([150, 120, 130, 255]));

        let strict = compare(&base, &tinted, &ComparisonPolicy::default()).unwrap();
        assert!(strict.diff_percentage > 50.0);

        let lenient = ComparisonPolicy {
            ignore_colors: true,
            ..ComparisonPolicy::default()
        };
        let r = compare(&base, &tinted, &lenient).unwrap();
        assert_eq!(r.diff_percentage, 0.0);
    }

    #[test]
    fn antialiased_edge_suppressed_only_when_asked() {
        let sharp = RgbaImage::from_fn(10, 10, |x, _| {
            if x < 5 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });
        let mut smooth = sharp.clone();
        for y in 0..10 {
            smooth.put_pixel(5, y, GREY);
        }

        let r = compare(&sharp, &smooth, &ComparisonPolicy::default()).unwrap();
        assert!((r.diff_percentage - 10.0).abs() < 1e-9);

        let aa = ComparisonPolicy {
            ignore_antialiasing: true,
            ..ComparisonPolicy::default()
        };
        let r = compare(&sharp, &smooth, &aa).unwrap();
        assert_eq!(r.diff_percentage, 0.0);
    }

    #[test]
    fn alpha_only_change_ignored_with_ignore_alpha() {
        let base = solid(8, 8, Rgba([40, 40, 40, 255]));
        let faded = solid(8, 8, Rgba([40, 40, 40, 100]));
        let r = compare(&base, &faded, &ComparisonPolicy::default()).unwrap();
        assert_eq!(r.diff_percentage, 100.0);

        let policy = ComparisonPolicy {
            ignore_alpha: true,
            ..ComparisonPolicy::default()
        };
        assert_eq!(compare(&base, &faded, &policy).unwrap().diff_percentage, 0.0);
    }

    #[test]
    fn error_color_and_diff_only_rendering() {
        let base = solid(4, 4, GREY);
        let mut cur = base.clone();
        cur.put_pixel(1, 1, RED);
        let policy = ComparisonPolicy {
            error_type: ErrorType::DiffOnly,
            error_color: Rgb([0, 255, 0]),
            ..ComparisonPolicy::default()
        };
        let r = compare(&base, &cur, &policy).unwrap();
        assert_eq!(*r.diff_image.get_pixel(1, 1), Rgba([0, 255, 0, 255]));
        assert_eq!(*r.diff_image.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    // -- masking --

    #[test]
    fn masking_all_differences_drives_score_to_zero() {
        let base = noise(40, 40);
        let mut cur = base.clone();
        for y in 10..20 {
            for x in 5..25 {
                cur.put_pixel(x, y, RED);
            }
        }
        let policy = ComparisonPolicy::default();
        assert!(compare(&base, &cur, &policy).unwrap().diff_percentage > 0.0);

        let regions = [IgnoreRegion::new(5, 10, 20, 10)];
        let left = mask(&base, &regions, DEFAULT_FILL);
        let right = mask(&cur, &regions, DEFAULT_FILL);
        assert_eq!(compare(&left, &right, &policy).unwrap().diff_percentage, 0.0);
    }

    // -- dimension handling --

    #[test]
    fn scaled_mismatch_reports_difference() {
        let small = solid(100, 100, GREY);
        let big = solid(200, 200, GREY);
        let r = compare(&small, &big, &ComparisonPolicy::default()).unwrap();
        assert!(!r.is_same_dimensions);
        assert_eq!(
            r.dimension_difference,
            Some(DimensionDifference {
                width: -100,
                height: -100
            })
        );
        assert_eq!(r.diff_image.dimensions(), (200, 200));
        // Upscaling a flat colour keeps it flat.
        assert_eq!(r.diff_percentage, 0.0);
    }

    #[test]
    fn unscaled_mismatch_flags_non_overlap() {
        let a = solid(10, 10, GREY);
        let b = solid(10, 12, GREY);
        let policy = ComparisonPolicy {
            scale_to_same_size: false,
            ..ComparisonPolicy::default()
        };
        let r = compare(&a, &b, &policy).unwrap();
        assert_eq!(r.total_pixels, 120);
        assert_eq!(r.diff_pixels, 20);
        assert!((r.diff_percentage - 20.0 / 120.0 * 100.0).abs() < 1e-9);
        assert_eq!(r.dimension_difference, Some(DimensionDifference { width: 0, height: -2 }));
        assert_eq!(*r.diff_image.get_pixel(0, 11), Rgba([255, 0, 255, 255]));
        assert_eq!(*r.diff_image.get_pixel(0, 0), GREY);
    }

    #[test]
    fn one_empty_image_is_total_mismatch() {
        let a = RgbaImage::new(0, 0);
        let b = solid(5, 5, GREY);
        let r = compare(&a, &b, &ComparisonPolicy::default()).unwrap();
        assert_eq!(r.diff_percentage, 100.0);
        assert!(!r.is_same_dimensions);
    }

    #[test]
    fn both_empty_is_dimension_error() {
        let a = RgbaImage::new(0, 5);
        let b = RgbaImage::new(3, 0);
        let err = compare(&a, &b, &ComparisonPolicy::default()).err().unwrap();
        assert!(matches!(err, DiffError::Dimension { .. }));
    }

    // -- large images --

    #[test]
    fn aa_blocks_only_kick_in_above_threshold() {
        assert_eq!(aa_block_size(1200, 800, 1200), 1);
        assert_eq!(aa_block_size(1201, 800, 1200), 2);
        assert_eq!(aa_block_size(5000, 5000, 0), 1);
        assert_eq!(aa_block_size(400, 100, 100), 4);
    }

    fn large(threshold: u32, ignore_antialiasing: bool) -> ComparisonPolicy {
        ComparisonPolicy {
            large_image_threshold: threshold,
            ignore_antialiasing,
            ..ComparisonPolicy::default()
        }
    }

    #[test]
    fn odd_columns_counted_on_large_images() {
        let base = solid(400, 300, GREY);
        let mut cur = base.clone();
        for y in 0..300 {
            for x in (1..400).step_by(2) {
                cur.put_pixel(x, y, RED);
            }
        }
        for policy in [large(100, false), large(100, true), large(0, false)] {
            let r = compare(&base, &cur, &policy).unwrap();
            assert_eq!(r.diff_pixels, 60_000);
            assert!((r.diff_percentage - 50.0).abs() < 1e-9);
            assert_eq!(*r.diff_image.get_pixel(1, 1), Rgba([255, 0, 255, 255]));
            assert_eq!(*r.diff_image.get_pixel(2, 1), GREY);
        }
        assert_eq!(compare(&base, &cur, &large(100, false)).unwrap().aa_block, 4);
    }

    #[test]
    fn thin_rule_on_odd_row_is_highlighted() {
        let base = solid(1920, 1080, GREY);
        let mut cur = base.clone();
        for x in 0..1920 {
            cur.put_pixel(x, 501, Rgba([0, 0, 0, 255]));
        }
        let r = compare(&base, &cur, &ComparisonPolicy::default()).unwrap();
        assert_eq!(r.aa_block, 2);
        assert_eq!(r.diff_pixels, 1920);
        assert!((r.diff_percentage - 1920.0 / (1920.0 * 1080.0) * 100.0).abs() < 1e-9);
        assert_eq!(*r.diff_image.get_pixel(777, 501), Rgba([255, 0, 255, 255]));
        assert_eq!(*r.diff_image.get_pixel(777, 500), GREY);
    }

    /// Shared anti-aliasing verdicts only affect candidates that already
    /// failed the delta test, so a smoothed edge is still suppressed and a
    /// solid change far from it is still counted.
    #[test]
    fn block_verdicts_keep_edge_suppression() {
        let sharp = RgbaImage::from_fn(40, 12, |x, _| {
            if x < 21 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });
        let mut cur = sharp.clone();
        for y in 0..12 {
            cur.put_pixel(21, y, GREY);
        }
        for y in 0..4 {
            for x in 32..36 {
                cur.put_pixel(x, y, RED);
            }
        }

        let r = compare(&sharp, &cur, &large(10, true)).unwrap();
        assert_eq!(r.aa_block, 4);
        assert_eq!(r.diff_pixels, 16);
    }

    // -- cancellation --

    #[test]
    fn raised_flag_cancels() {
        let a = noise(20, 20);
        let b = with_pixel_diffs(&a, 10);
        let err = compare_cancellable(&a, &b, &ComparisonPolicy::default(), &AtomicBool::new(true))
            .err()
            .unwrap();
        assert!(matches!(err, DiffError::Cancelled));
    }
}
