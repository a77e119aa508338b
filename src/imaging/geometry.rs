//! Pure geometry for the crop frame.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! ## Coordinate spaces
//!
//! ```text
//! source      original bitmap pixels, origin top-left, (0..img_w, 0..img_h)
//! scaled      source × zoom, what the user sees behind the frame
//! frame       the on-screen crop box, centered on the scaled image when
//!             offset = (0, 0); offsets are measured in scaled units
//! ```
//!
//! The frame center sits at `scaled/2 − offset` in scaled space; dividing by
//! `zoom` moves it to source space. That is the whole trick behind
//! [`compute_crop_rect`].
//!
//! Degenerate inputs (zero-sized image, non-positive zoom or frame) never
//! divide by zero: scales fall back to `1.0`, offsets to `0`, and the crop
//! rectangle to an empty one that finalization refuses to render.

use super::params::CropRect;
use crate::ratio::AspectRatio;
use serde::{Deserialize, Serialize};

/// Slack for float comparisons of scale factors.
const EPSILON: f64 = 1e-9;

/// Crop frame size in display units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

impl FrameSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_positive(self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Per-asset pan/zoom state.
///
/// `zoom` scales the source relative to its natural size; offsets translate
/// the scaled image, in scaled units, with `(0, 0)` meaning centered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropParams {
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl CropParams {
    pub const fn centered(zoom: f64) -> Self {
        Self {
            zoom,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

fn has_area(image: (u32, u32)) -> bool {
    image.0 > 0 && image.1 > 0
}

/// Fit the ratio's box inside the available viewport.
///
/// Width-constrained when the full-width box would still fit vertically,
/// height-constrained otherwise. For `1:1` this is the smaller bound.
///
/// ```
/// # use postframe::imaging::{crop_box_dimensions, FrameSize};
/// # use postframe::ratio::AspectRatio;
/// // 4:5 in a 390×700 viewport is limited by width → 390×487.5
/// assert_eq!(
///     crop_box_dimensions(AspectRatio::Portrait, 390.0, 700.0),
///     FrameSize::new(390.0, 487.5)
/// );
/// ```
pub fn crop_box_dimensions(
    ratio: AspectRatio,
    available_width: f64,
    available_height: f64,
) -> FrameSize {
    if !(available_width > 0.0 && available_height > 0.0) {
        return FrameSize::default();
    }
    let (tw, th) = ratio.terms();
    let (tw, th) = (tw as f64, th as f64);
    let height_at_full_width = available_width * th / tw;
    if height_at_full_width <= available_height {
        FrameSize::new(available_width, height_at_full_width)
    } else {
        FrameSize::new(available_height * tw / th, available_height)
    }
}

/// Scale at which the whole image is visible inside the frame.
///
/// This is the initial zoom of a freshly touched asset: nothing is cut off,
/// margins may show.
pub fn fit_scale(image: (u32, u32), frame: FrameSize) -> f64 {
    if !has_area(image) || !frame.is_positive() {
        return 1.0;
    }
    let sx = frame.width / image.0 as f64;
    let sy = frame.height / image.1 as f64;
    sx.min(sy)
}

/// Smallest scale at which the image still covers the whole frame.
///
/// Hard lower clamp once the user pans or zooms.
pub fn min_cover_scale(image: (u32, u32), frame: FrameSize) -> f64 {
    if !has_area(image) || !frame.is_positive() {
        return 1.0;
    }
    let sx = frame.width / image.0 as f64;
    let sy = frame.height / image.1 as f64;
    sx.max(sy)
}

/// Bound each offset so no frame pixel falls outside the scaled image.
///
/// Each axis may move by at most `max(0, (scaled − frame) / 2)`. When the
/// scaled image is smaller than the frame on an axis, that axis is pinned at 0.
pub fn clamp_offset(
    offset_x: f64,
    offset_y: f64,
    zoom: f64,
    image: (u32, u32),
    frame: FrameSize,
) -> (f64, f64) {
    if !has_area(image) || !(zoom > 0.0) {
        return (0.0, 0.0);
    }
    let max_x = ((image.0 as f64 * zoom - frame.width) / 2.0).max(0.0);
    let max_y = ((image.1 as f64 * zoom - frame.height) / 2.0).max(0.0);
    (clamp_finite(offset_x, max_x), clamp_finite(offset_y, max_y))
}

fn clamp_finite(value: f64, bound: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-bound, bound)
    } else {
        0.0
    }
}

/// Clamp a candidate gesture result into a committed state.
///
/// Zoom is raised to at least [`min_cover_scale`]; offsets are then bounded
/// by [`clamp_offset`] at that zoom.
pub fn clamp_params(candidate: CropParams, image: (u32, u32), frame: FrameSize) -> CropParams {
    let cover = min_cover_scale(image, frame);
    let zoom = if candidate.zoom.is_finite() {
        candidate.zoom.max(cover)
    } else {
        cover
    };
    let (offset_x, offset_y) =
        clamp_offset(candidate.offset_x, candidate.offset_y, zoom, image, frame);
    CropParams {
        zoom,
        offset_x,
        offset_y,
    }
}

/// Re-check committed parameters against a new frame (viewport or ratio change).
///
/// The existing zoom is kept when it still covers the new frame, with offsets
/// re-clamped. Otherwise the image is recentered at the new cover scale.
pub fn revalidate(params: CropParams, image: (u32, u32), frame: FrameSize) -> CropParams {
    let cover = min_cover_scale(image, frame);
    if params.zoom + EPSILON >= cover {
        let (offset_x, offset_y) =
            clamp_offset(params.offset_x, params.offset_y, params.zoom, image, frame);
        CropParams {
            zoom: params.zoom,
            offset_x,
            offset_y,
        }
    } else {
        tracing::debug!(
            old_zoom = params.zoom,
            cover,
            "zoom no longer covers frame; recentering"
        );
        CropParams::centered(cover)
    }
}

/// Map the on-screen transform back to a source-pixel crop rectangle.
///
/// The visible extent in source pixels is `frame / zoom`, limited to the
/// image. It is then shrunk on its constraining side to the exact output
/// ratio, positioned around the frame center, and clamped into
/// `[0, image − extent]`. The result is what the bitmap cropper receives.
///
/// Returns [`CropRect::default`] (empty) for degenerate input.
pub fn compute_crop_rect(
    image: (u32, u32),
    params: CropParams,
    frame: FrameSize,
    ratio: AspectRatio,
) -> CropRect {
    if !has_area(image) || !(params.zoom > 0.0) || !params.zoom.is_finite() || !frame.is_positive()
    {
        return CropRect::default();
    }

    let (img_w, img_h) = (image.0 as f64, image.1 as f64);
    let zoom = params.zoom;

    let center_x = (img_w * zoom / 2.0 - params.offset_x) / zoom;
    let center_y = (img_h * zoom / 2.0 - params.offset_y) / zoom;

    let visible_w = (frame.width / zoom).min(img_w);
    let visible_h = (frame.height / zoom).min(img_h);

    let out = ratio.output_size();
    let r = out.width as f64 / out.height as f64;

    // Round the constraining side, derive the other from it so the rounded
    // rectangle stays on-ratio.
    let (width, height) = if visible_w / visible_h > r {
        let h = round_extent(visible_h, image.1);
        (round_extent(h as f64 * r, image.0), h)
    } else {
        let w = round_extent(visible_w, image.0);
        (w, round_extent(w as f64 / r, image.1))
    };

    let x = place(center_x, width, image.0);
    let y = place(center_y, height, image.1);

    CropRect {
        x,
        y,
        width,
        height,
    }
}

fn round_extent(value: f64, limit: u32) -> u32 {
    (value.round() as u32).clamp(1, limit)
}

fn place(center: f64, extent: u32, limit: u32) -> u32 {
    let max_origin = (limit - extent) as f64;
    (center - extent as f64 / 2.0).round().clamp(0.0, max_origin) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATIOS: [AspectRatio; 3] = AspectRatio::ALL;
    const IMAGES: [(u32, u32); 6] = [
        (2000, 1000),
        (1000, 2000),
        (4032, 3024),
        (1080, 1350),
        (17, 3001),
        (1, 1),
    ];
    const VIEWPORTS: [(f64, f64); 3] = [(390.0, 390.0), (1080.0, 1350.0), (375.0, 812.0)];

    fn frames() -> Vec<(AspectRatio, FrameSize)> {
        RATIOS
            .iter()
            .flat_map(|&r| {
                VIEWPORTS
                    .iter()
                    .map(move |&(w, h)| (r, crop_box_dimensions(r, w, h)))
            })
            .collect()
    }

    // =========================================================================
    // crop_box_dimensions
    // =========================================================================

    #[test]
    fn box_square_uses_smaller_bound() {
        assert_eq!(
            crop_box_dimensions(AspectRatio::Square, 390.0, 700.0),
            FrameSize::new(390.0, 390.0)
        );
        assert_eq!(
            crop_box_dimensions(AspectRatio::Square, 800.0, 500.0),
            FrameSize::new(500.0, 500.0)
        );
    }

    #[test]
    fn box_landscape_width_constrained() {
        // 16:9 at 390 wide → 219.375 tall, fits in 390
        let frame = crop_box_dimensions(AspectRatio::Landscape, 390.0, 390.0);
        assert_eq!(frame.width, 390.0);
        assert!((frame.height - 219.375).abs() < 1e-9);
    }

    #[test]
    fn box_portrait_height_constrained() {
        // 4:5 in 800×500 → height bound: 400×500
        assert_eq!(
            crop_box_dimensions(AspectRatio::Portrait, 800.0, 500.0),
            FrameSize::new(400.0, 500.0)
        );
    }

    #[test]
    fn box_never_exceeds_viewport() {
        for (_, frame) in frames() {
            assert!(VIEWPORTS
                .iter()
                .any(|&(w, h)| frame.width <= w + EPSILON && frame.height <= h + EPSILON));
        }
    }

    #[test]
    fn box_degenerate_viewport_is_empty() {
        assert_eq!(
            crop_box_dimensions(AspectRatio::Square, 0.0, 100.0),
            FrameSize::default()
        );
    }

    // =========================================================================
    // fit / cover scale
    // =========================================================================

    #[test]
    fn scales_for_wide_image_in_portrait_box() {
        let frame = FrameSize::new(1080.0, 1350.0);
        let fit = fit_scale((2000, 1000), frame);
        let cover = min_cover_scale((2000, 1000), frame);
        assert!((fit - 0.54).abs() < 1e-12);
        assert!((cover - 1.35).abs() < 1e-12);
    }

    #[test]
    fn cover_is_never_below_fit() {
        for &image in &IMAGES {
            for (_, frame) in frames() {
                assert!(min_cover_scale(image, frame) >= fit_scale(image, frame));
            }
        }
    }

    #[test]
    fn cover_scale_covers_frame() {
        for &image in &IMAGES {
            for (_, frame) in frames() {
                let z = min_cover_scale(image, frame);
                assert!(image.0 as f64 * z + EPSILON >= frame.width);
                assert!(image.1 as f64 * z + EPSILON >= frame.height);
            }
        }
    }

    #[test]
    fn fit_scale_shows_whole_image() {
        for &image in &IMAGES {
            for (_, frame) in frames() {
                let z = fit_scale(image, frame);
                assert!(image.0 as f64 * z <= frame.width + EPSILON);
                assert!(image.1 as f64 * z <= frame.height + EPSILON);
            }
        }
    }

    #[test]
    fn zero_image_scales_are_identity() {
        let frame = FrameSize::new(100.0, 100.0);
        assert_eq!(fit_scale((0, 100), frame), 1.0);
        assert_eq!(min_cover_scale((100, 0), frame), 1.0);
    }

    // =========================================================================
    // clamp_offset / clamp_params / revalidate
    // =========================================================================

    #[test]
    fn clamp_offset_bounds() {
        let frame = FrameSize::new(100.0, 100.0);
        // 200×100 at zoom 1: x may move ±50, y is pinned
        assert_eq!(clamp_offset(80.0, 30.0, 1.0, (200, 100), frame), (50.0, 0.0));
        assert_eq!(clamp_offset(-80.0, -30.0, 1.0, (200, 100), frame), (-50.0, 0.0));
        assert_eq!(clamp_offset(10.0, 0.0, 1.0, (200, 100), frame), (10.0, 0.0));
    }

    #[test]
    fn clamp_offset_pins_axis_smaller_than_frame() {
        let frame = FrameSize::new(100.0, 100.0);
        assert_eq!(clamp_offset(20.0, 20.0, 0.25, (200, 200), frame), (0.0, 0.0));
    }

    #[test]
    fn clamp_offset_is_idempotent() {
        for &image in &IMAGES {
            for (_, frame) in frames() {
                let zoom = min_cover_scale(image, frame) * 1.7;
                for &(ox, oy) in &[(0.0, 0.0), (1e6, -1e6), (-3.5, 12.25), (250.0, 250.0)] {
                    let once = clamp_offset(ox, oy, zoom, image, frame);
                    let twice = clamp_offset(once.0, once.1, zoom, image, frame);
                    assert_eq!(once, twice);
                }
            }
        }
    }

    #[test]
    fn clamp_offset_non_finite_goes_to_center() {
        let frame = FrameSize::new(100.0, 100.0);
        assert_eq!(
            clamp_offset(f64::NAN, f64::INFINITY, 2.0, (100, 100), frame),
            (0.0, 0.0)
        );
    }

    #[test]
    fn clamp_params_raises_zoom_to_cover() {
        let frame = FrameSize::new(1080.0, 1350.0);
        let p = clamp_params(CropParams::centered(0.54), (2000, 1000), frame);
        assert!((p.zoom - 1.35).abs() < 1e-12);
    }

    #[test]
    fn clamp_params_keeps_larger_zoom_and_clamps_offsets() {
        let frame = FrameSize::new(100.0, 100.0);
        let p = clamp_params(
            CropParams {
                zoom: 2.0,
                offset_x: 500.0,
                offset_y: -500.0,
            },
            (100, 100),
            frame,
        );
        assert_eq!(p.zoom, 2.0);
        assert_eq!((p.offset_x, p.offset_y), (50.0, -50.0));
    }

    #[test]
    fn revalidate_keeps_zoom_that_still_covers() {
        let image = (2000, 1000);
        let p = CropParams {
            zoom: 2.0,
            offset_x: 100.0,
            offset_y: 0.0,
        };
        let frame = FrameSize::new(390.0, 390.0);
        let out = revalidate(p, image, frame);
        assert_eq!(out.zoom, 2.0);
        assert_eq!(out.offset_x, 100.0);
    }

    #[test]
    fn revalidate_recenters_when_no_longer_covering() {
        let image = (2000, 1000);
        let p = CropParams {
            zoom: 0.4,
            offset_x: 30.0,
            offset_y: 0.0,
        };
        let frame = FrameSize::new(1080.0, 1350.0);
        let out = revalidate(p, image, frame);
        assert!((out.zoom - 1.35).abs() < 1e-12);
        assert_eq!((out.offset_x, out.offset_y), (0.0, 0.0));
    }

    // =========================================================================
    // compute_crop_rect
    // =========================================================================

    #[test]
    fn crop_rect_at_fit_scale_for_wide_image() {
        let frame = FrameSize::new(1080.0, 1350.0);
        let image = (2000, 1000);
        let fit = fit_scale(image, frame);
        let rect = compute_crop_rect(image, CropParams::centered(fit), frame, AspectRatio::Portrait);
        assert_eq!(
            rect,
            CropRect {
                x: 600,
                y: 0,
                width: 800,
                height: 1000
            }
        );
    }

    #[test]
    fn crop_rect_at_cover_scale_is_full_height_center() {
        let frame = FrameSize::new(1080.0, 1350.0);
        let image = (2000, 1000);
        let cover = min_cover_scale(image, frame);
        let rect =
            compute_crop_rect(image, CropParams::centered(cover), frame, AspectRatio::Portrait);
        assert_eq!(rect.height, 1000);
        assert_eq!(rect.width, 800);
        assert_eq!(rect.x, 600);
    }

    #[test]
    fn crop_rect_follows_pan() {
        let frame = FrameSize::new(100.0, 100.0);
        let image = (400, 100);
        // zoom 1, shift image left by 150 scaled px → frame center moves right
        let rect = compute_crop_rect(
            image,
            CropParams {
                zoom: 1.0,
                offset_x: -150.0,
                offset_y: 0.0,
            },
            frame,
            AspectRatio::Square,
        );
        assert_eq!(
            rect,
            CropRect {
                x: 300,
                y: 0,
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn crop_rect_zoomed_in_shrinks_extent() {
        let frame = FrameSize::new(100.0, 100.0);
        let rect = compute_crop_rect(
            (1000, 1000),
            CropParams::centered(0.5),
            frame,
            AspectRatio::Square,
        );
        assert_eq!(
            rect,
            CropRect {
                x: 400,
                y: 400,
                width: 200,
                height: 200
            }
        );
    }

    #[test]
    fn crop_rect_always_within_bounds() {
        for &image in &IMAGES {
            for (ratio, frame) in frames() {
                let cover = min_cover_scale(image, frame);
                let fit = fit_scale(image, frame);
                for zoom in [fit, cover, cover * 1.3, cover * 4.0] {
                    for &(ox, oy) in &[(0.0, 0.0), (1e5, 1e5), (-1e5, -1e5), (7.0, -3.0)] {
                        let rect = compute_crop_rect(
                            image,
                            CropParams {
                                zoom,
                                offset_x: ox,
                                offset_y: oy,
                            },
                            frame,
                            ratio,
                        );
                        assert!(rect.width > 0 && rect.height > 0);
                        assert!(rect.x + rect.width <= image.0, "{rect:?} vs {image:?}");
                        assert!(rect.y + rect.height <= image.1, "{rect:?} vs {image:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn crop_rect_at_fit_matches_ratio_within_a_pixel() {
        for &image in IMAGES.iter().filter(|i| i.0 >= 100 && i.1 >= 100) {
            for (ratio, frame) in frames() {
                let fit = fit_scale(image, frame);
                let rect = compute_crop_rect(image, CropParams::centered(fit), frame, ratio);
                let out = ratio.output_size();
                let expected_h = rect.width as f64 * out.height as f64 / out.width as f64;
                assert!(
                    (rect.height as f64 - expected_h).abs() <= 1.0,
                    "{ratio}: {rect:?} for {image:?}"
                );
            }
        }
    }

    #[test]
    fn crop_rect_degenerate_inputs_are_empty() {
        let frame = FrameSize::new(100.0, 100.0);
        let ratio = AspectRatio::Square;
        assert!(compute_crop_rect((0, 100), CropParams::centered(1.0), frame, ratio).is_empty());
        assert!(compute_crop_rect((100, 100), CropParams::centered(0.0), frame, ratio).is_empty());
        assert!(
            compute_crop_rect((100, 100), CropParams::centered(1.0), FrameSize::default(), ratio)
                .is_empty()
        );
    }
}
