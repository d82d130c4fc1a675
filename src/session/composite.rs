//! Overlay compositing onto a rendered page.

use image::{Pixel, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::overlay::OverlayRect;

/// Translucent red for full-width bands.
const BAND_FILL: Rgba<u8> = Rgba([239, 68, 68, 51]);
const BAND_STROKE: Rgba<u8> = Rgba([239, 68, 68, 255]);

/// Translucent blue for corners.
const CORNER_FILL: Rgba<u8> = Rgba([59, 130, 246, 51]);
const CORNER_STROKE: Rgba<u8> = Rgba([59, 130, 246, 255]);

pub(crate) const PAGE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Blend every overlay onto `surface` in list order, with a 1px outline.
pub fn draw_overlays(surface: &mut RgbaImage, overlays: &[OverlayRect]) {
    for rect in overlays {
        let Some((x0, y0, x1, y1)) = pixel_bounds(rect, surface.width(), surface.height()) else {
            continue;
        };
        let (fill, stroke) = if rect.kind.is_full_span() {
            (BAND_FILL, BAND_STROKE)
        } else {
            (CORNER_FILL, CORNER_STROKE)
        };

        for y in y0..y1 {
            for x in x0..x1 {
                surface.get_pixel_mut(x, y).blend(&fill);
            }
        }
        draw_hollow_rect_mut(
            surface,
            Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0, y1 - y0),
            stroke,
        );
    }
}

/// Clip an overlay to the surface; `None` when nothing is left.
fn pixel_bounds(rect: &OverlayRect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let clamp = |v: f64, max: u32| {
        if v.is_nan() {
            0
        } else {
            v.clamp(0.0, max as f64) as u32
        }
    };
    let x0 = clamp(rect.x.floor(), width);
    let y0 = clamp(rect.y.floor(), height);
    let x1 = clamp(rect.right().ceil(), width);
    let y1 = clamp(rect.bottom().ceil(), height);
    (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegionKind;

    fn rect(kind: RegionKind, x: f64, y: f64, width: f64, height: f64) -> OverlayRect {
        OverlayRect {
            kind,
            x,
            y,
            width,
            height,
            label: String::new(),
        }
    }

    #[test]
    fn test_band_tints_red() {
        let mut surface = RgbaImage::from_pixel(20, 20, PAGE_BACKGROUND);
        draw_overlays(&mut surface, &[rect(RegionKind::FooterFull, 0.0, 10.0, 20.0, 10.0)]);

        let inside = surface.get_pixel(10, 15);
        assert!(inside[0] > inside[2], "band should be tinted red");
        assert_eq!(*surface.get_pixel(10, 5), PAGE_BACKGROUND);
        assert_eq!(*surface.get_pixel(0, 10), BAND_STROKE);
    }

    #[test]
    fn test_corner_tints_blue() {
        let mut surface = RgbaImage::from_pixel(20, 20, PAGE_BACKGROUND);
        draw_overlays(&mut surface, &[rect(RegionKind::HeaderRight, 10.0, 0.0, 10.0, 10.0)]);

        let inside = surface.get_pixel(15, 5);
        assert!(inside[2] > inside[0], "corner should be tinted blue");
        assert_eq!(*surface.get_pixel(5, 5), PAGE_BACKGROUND);
    }

    #[test]
    fn test_out_of_bounds_is_clipped() {
        let mut surface = RgbaImage::from_pixel(10, 10, PAGE_BACKGROUND);
        draw_overlays(
            &mut surface,
            &[
                rect(RegionKind::FooterLeft, -5.0, -5.0, 8.0, 8.0),
                rect(RegionKind::FooterRight, 50.0, 50.0, 8.0, 8.0),
            ],
        );
        assert_ne!(*surface.get_pixel(1, 1), PAGE_BACKGROUND);
        assert_eq!(*surface.get_pixel(9, 9), PAGE_BACKGROUND);
    }
}
