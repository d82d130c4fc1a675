//! Redaction regions and the six-entry region set.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Smallest accepted region dimension, in page points.
pub const MIN_DIMENSION: f64 = 10.0;

/// Largest accepted region dimension, in page points.
pub const MAX_DIMENSION: f64 = 500.0;

const DEFAULT_BAND_HEIGHT: f64 = 50.0;
const DEFAULT_CORNER_SIZE: f64 = 100.0;

/// One of the six fixed redaction regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionKind {
    HeaderFull,
    HeaderLeft,
    HeaderRight,
    FooterFull,
    FooterLeft,
    FooterRight,
}

impl RegionKind {
    /// All kinds, in storage order.
    pub const ALL: [RegionKind; 6] = [
        RegionKind::HeaderFull,
        RegionKind::HeaderLeft,
        RegionKind::HeaderRight,
        RegionKind::FooterFull,
        RegionKind::FooterLeft,
        RegionKind::FooterRight,
    ];

    /// Wire name used as the JSON key.
    pub fn key(self) -> &'static str {
        match self {
            RegionKind::HeaderFull => "headerFull",
            RegionKind::HeaderLeft => "headerLeft",
            RegionKind::HeaderRight => "headerRight",
            RegionKind::FooterFull => "footerFull",
            RegionKind::FooterLeft => "footerLeft",
            RegionKind::FooterRight => "footerRight",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Human-readable name, e.g. "Footer full".
    pub fn label(self) -> &'static str {
        match self {
            RegionKind::HeaderFull => "Header full",
            RegionKind::HeaderLeft => "Header left",
            RegionKind::HeaderRight => "Header right",
            RegionKind::FooterFull => "Footer full",
            RegionKind::FooterLeft => "Footer left",
            RegionKind::FooterRight => "Footer right",
        }
    }

    /// Full-span bands cover the whole page width and only carry a height.
    pub fn is_full_span(self) -> bool {
        matches!(self, RegionKind::HeaderFull | RegionKind::FooterFull)
    }

    pub fn is_header(self) -> bool {
        matches!(
            self,
            RegionKind::HeaderFull | RegionKind::HeaderLeft | RegionKind::HeaderRight
        )
    }

    pub fn is_right(self) -> bool {
        matches!(self, RegionKind::HeaderRight | RegionKind::FooterRight)
    }

    fn index(self) -> usize {
        match self {
            RegionKind::HeaderFull => 0,
            RegionKind::HeaderLeft => 1,
            RegionKind::HeaderRight => 2,
            RegionKind::FooterFull => 3,
            RegionKind::FooterLeft => 4,
            RegionKind::FooterRight => 5,
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_lowercase())
    }
}

impl FromStr for RegionKind {
    type Err = String;

    /// Accepts the wire name (`footerFull`) as well as `footer-full` / `footer_full`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.key().to_lowercase() == folded)
            .ok_or_else(|| format!("unknown region '{}'", s))
    }
}

/// Which dimension of a region to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionField {
    Width,
    Height,
}

impl fmt::Display for DimensionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionField::Width => f.write_str("width"),
            DimensionField::Height => f.write_str("height"),
        }
    }
}

impl FromStr for DimensionField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "width" | "w" => Ok(DimensionField::Width),
            "height" | "h" => Ok(DimensionField::Height),
            _ => Err(format!("unknown dimension '{}'", s)),
        }
    }
}

/// Region geometry in page points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimensions {
    /// Full-width band anchored to the top or bottom edge.
    Band { height: f64 },
    /// Rectangle anchored to a page corner.
    Corner { width: f64, height: f64 },
}

impl Dimensions {
    pub fn height(&self) -> f64 {
        match *self {
            Dimensions::Band { height } | Dimensions::Corner { height, .. } => height,
        }
    }

    /// Configured width; `None` for full-span bands.
    pub fn width(&self) -> Option<f64> {
        match *self {
            Dimensions::Band { .. } => None,
            Dimensions::Corner { width, .. } => Some(width),
        }
    }
}

/// A single redaction region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub enabled: bool,
    pub dimensions: Dimensions,
}

impl Region {
    /// Default region for `kind`: only the footer band starts enabled.
    pub fn default_for(kind: RegionKind) -> Self {
        let dimensions = if kind.is_full_span() {
            Dimensions::Band {
                height: DEFAULT_BAND_HEIGHT,
            }
        } else {
            Dimensions::Corner {
                width: DEFAULT_CORNER_SIZE,
                height: DEFAULT_CORNER_SIZE,
            }
        };
        Self {
            enabled: kind == RegionKind::FooterFull,
            dimensions,
        }
    }

    pub fn height(&self) -> f64 {
        self.dimensions.height()
    }

    pub fn width(&self) -> Option<f64> {
        self.dimensions.width()
    }
}

/// Check a dimension value against the accepted range.
pub fn validate_dimension(
    kind: RegionKind,
    field: DimensionField,
    value: f64,
) -> Result<(), ValidationError> {
    if kind.is_full_span() && field == DimensionField::Width {
        return Err(ValidationError::InapplicableField { kind, field });
    }
    if !value.is_finite() || !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
        return Err(ValidationError::OutOfRange {
            kind,
            field,
            value,
            min: MIN_DIMENSION,
            max: MAX_DIMENSION,
        });
    }
    Ok(())
}

/// Exactly one [`Region`] per [`RegionKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSet {
    regions: [Region; 6],
}

impl RegionSet {
    pub fn get(&self, kind: RegionKind) -> &Region {
        &self.regions[kind.index()]
    }

    pub fn is_enabled(&self, kind: RegionKind) -> bool {
        self.get(kind).enabled
    }

    /// All regions in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (RegionKind, &Region)> {
        RegionKind::ALL
            .into_iter()
            .map(move |kind| (kind, &self.regions[kind.index()]))
    }

    /// Copy of this set with `kind` toggled.
    pub fn with_enabled(&self, kind: RegionKind, enabled: bool) -> Self {
        let mut next = self.clone();
        next.regions[kind.index()].enabled = enabled;
        next
    }

    /// Copy of this set with one dimension changed.
    ///
    /// Rejects out-of-range values instead of clamping them.
    pub fn with_dimension(
        &self,
        kind: RegionKind,
        field: DimensionField,
        value: f64,
    ) -> Result<Self, ValidationError> {
        validate_dimension(kind, field, value)?;
        let mut next = self.clone();
        let region = &mut next.regions[kind.index()];
        region.dimensions = match (region.dimensions, field) {
            (Dimensions::Band { .. }, _) => Dimensions::Band { height: value },
            (Dimensions::Corner { height, .. }, DimensionField::Width) => Dimensions::Corner {
                width: value,
                height,
            },
            (Dimensions::Corner { width, .. }, DimensionField::Height) => Dimensions::Corner {
                width,
                height: value,
            },
        };
        Ok(next)
    }

    /// Report the first region whose geometry is out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (kind, region) in self.iter() {
            validate_dimension(kind, DimensionField::Height, region.height())?;
            if let Some(width) = region.width() {
                validate_dimension(kind, DimensionField::Width, width)?;
            }
        }
        Ok(())
    }

    /// Reset stale out-of-range geometry to the kind's default, keeping `enabled`.
    pub fn sanitized(mut self) -> Self {
        for kind in RegionKind::ALL {
            let region = &mut self.regions[kind.index()];
            let height_ok = validate_dimension(kind, DimensionField::Height, region.height()).is_ok();
            let width_ok = region
                .width()
                .map_or(true, |w| validate_dimension(kind, DimensionField::Width, w).is_ok());
            if !(height_ok && width_ok) {
                log::warn!("Resetting stale geometry of {} to defaults", kind);
                region.dimensions = Region::default_for(kind).dimensions;
            }
        }
        self
    }
}

impl Default for RegionSet {
    fn default() -> Self {
        Self {
            regions: RegionKind::ALL.map(Region::default_for),
        }
    }
}

/// The default set: every region disabled except a 50pt footer band.
pub fn default_region_set() -> RegionSet {
    RegionSet::default()
}

/// Pure toggle; callers persist the result themselves.
pub fn set_enabled(set: &RegionSet, kind: RegionKind, enabled: bool) -> RegionSet {
    set.with_enabled(kind, enabled)
}

/// Pure dimension update, validated against `[10, 500]`.
pub fn set_dimension(
    set: &RegionSet,
    kind: RegionKind,
    field: DimensionField,
    value: f64,
) -> Result<RegionSet, ValidationError> {
    set.with_dimension(kind, field, value)
}

/// JSON shape of one region: `{ enabled, height?, width? }`.
#[derive(Debug, Serialize, Deserialize)]
struct RegionEntry {
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
}

impl RegionEntry {
    fn from_region(region: &Region) -> Self {
        Self {
            enabled: region.enabled,
            width: region.width(),
            height: Some(region.height()),
        }
    }

    fn into_region(self, kind: RegionKind) -> Region {
        let defaults = Region::default_for(kind);
        let height = self.height.unwrap_or_else(|| defaults.height());
        let dimensions = match defaults.dimensions {
            Dimensions::Band { .. } => Dimensions::Band { height },
            Dimensions::Corner { width, .. } => Dimensions::Corner {
                width: self.width.unwrap_or(width),
                height,
            },
        };
        Region {
            enabled: self.enabled,
            dimensions,
        }
    }
}

impl Serialize for RegionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(RegionKind::ALL.len()))?;
        for (kind, region) in self.iter() {
            map.serialize_entry(kind.key(), &RegionEntry::from_region(region))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RegionSet {
    /// Missing or malformed entries fall back to that kind's default;
    /// unknown keys are ignored.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut set = RegionSet::default();
        for kind in RegionKind::ALL {
            let Some(value) = raw.get(kind.key()) else {
                continue;
            };
            match serde_json::from_value::<RegionEntry>(value.clone()) {
                Ok(entry) => set.regions[kind.index()] = entry.into_region(kind),
                Err(e) => log::warn!("Ignoring malformed {} entry: {}", kind.key(), e),
            }
        }
        Ok(set)
    }
}
