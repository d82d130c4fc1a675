//! Page geometry types.

use serde::{Deserialize, Serialize};

/// Intrinsic or effective page rotation, clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u16", from = "i64")]
pub enum Rotation {
    #[default]
    None,
    Degrees90,
    Degrees180,
    Degrees270,
}

impl Rotation {
    /// Normalize any `/Rotate` value to a quarter turn.
    ///
    /// Values that are not a multiple of 90 are treated as no rotation,
    /// matching how viewers ignore them.
    pub fn from_degrees(degrees: i64) -> Self {
        if degrees % 90 != 0 {
            return Rotation::None;
        }
        match degrees.rem_euclid(360) {
            90 => Rotation::Degrees90,
            180 => Rotation::Degrees180,
            270 => Rotation::Degrees270,
            _ => Rotation::None,
        }
    }

    /// Rotation in degrees (0, 90, 180, 270).
    pub fn as_degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Degrees90 => 90,
            Rotation::Degrees180 => 180,
            Rotation::Degrees270 => 270,
        }
    }

    /// Effective rotation after auto-correcting upside-down pages.
    ///
    /// Only 180° is corrected; quarter turns are passed through.
    pub fn corrected(self) -> Self {
        match self {
            Rotation::Degrees180 => Rotation::None,
            other => other,
        }
    }

    /// Whether width and height swap when displayed.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Degrees90 | Rotation::Degrees270)
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.as_degrees()
    }
}

impl From<i64> for Rotation {
    fn from(degrees: i64) -> Self {
        Rotation::from_degrees(degrees)
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.as_degrees())
    }
}

/// Size of a rendered page in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Pixel dimensions of a raster surface covering this viewport.
    ///
    /// Fractional sizes round up so the last row and column are kept.
    pub fn pixel_size(&self) -> (u32, u32) {
        let to_px = |v: f64| {
            if v.is_finite() && v > 0.0 {
                v.ceil().min(u32::MAX as f64) as u32
            } else {
                1
            }
        };
        (to_px(self.width), to_px(self.height))
    }
}

/// Visible page rectangle in PDF user space (points, y up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PageBox {
    pub fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        // Boxes may be stored with swapped corners.
        Self {
            llx: llx.min(urx),
            lly: lly.min(ury),
            urx: llx.max(urx),
            ury: lly.max(ury),
        }
    }

    /// US Letter (8.5 x 11 inches), the fallback when a page has no box.
    pub fn letter() -> Self {
        Self::new(0.0, 0.0, 612.0, 792.0)
    }

    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    /// Viewport of this box displayed at `scale` with `rotation` applied.
    pub fn viewport(&self, scale: f64, rotation: Rotation) -> Viewport {
        let (w, h) = if rotation.is_quarter_turn() {
            (self.height(), self.width())
        } else {
            (self.width(), self.height())
        };
        Viewport::new(w * scale, h * scale)
    }
}
