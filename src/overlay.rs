//! Mapping of region geometry onto a rendered page.
//!
//! [`overlay_rects`] turns the logical (page point) size of every enabled
//! region into a device-pixel rectangle anchored inside a viewport. The
//! origin is the top-left corner of the viewport with y growing downward.

use serde::Serialize;

use crate::model::{RegionKind, RegionSet, Viewport};

/// Paint order: full-span bands first, then corners.
const PAINT_ORDER: [RegionKind; 6] = [
    RegionKind::HeaderFull,
    RegionKind::FooterFull,
    RegionKind::HeaderLeft,
    RegionKind::HeaderRight,
    RegionKind::FooterLeft,
    RegionKind::FooterRight,
];

/// An enabled region placed in device pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayRect {
    pub kind: RegionKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Display annotation, e.g. "Header right (100×100)". Not used for layout.
    pub label: String,
}

impl OverlayRect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Place every enabled region of `regions` inside `viewport`.
///
/// Deterministic for identical inputs.
pub fn overlay_rects(regions: &RegionSet, viewport: Viewport, scale: f64) -> Vec<OverlayRect> {
    PAINT_ORDER
        .into_iter()
        .filter(|kind| regions.is_enabled(*kind))
        .map(|kind| {
            let region = regions.get(kind);
            let height = region.height() * scale;
            let (x, width) = match region.width() {
                None => (0.0, viewport.width),
                Some(w) => {
                    let width = w * scale;
                    let x = if kind.is_right() {
                        viewport.width - width
                    } else {
                        0.0
                    };
                    (x, width)
                }
            };
            let y = if kind.is_header() {
                0.0
            } else {
                viewport.height - height
            };
            OverlayRect {
                kind,
                x,
                y,
                width,
                height,
                label: region_label(kind, region.width(), region.height()),
            }
        })
        .collect()
}

fn region_label(kind: RegionKind, width: Option<f64>, height: f64) -> String {
    match width {
        None => format!("{} ({}px)", kind.label(), height),
        Some(w) => format!("{} ({}×{})", kind.label(), w, height),
    }
}
