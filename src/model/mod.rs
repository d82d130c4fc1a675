//! Data model for region redaction.
//!
//! Regions, pagination offsets and page geometry are plain data with
//! validation. Nothing in this module performs I/O.

mod page;
mod pagination;
mod region;

pub use page::{PageBox, Rotation, Viewport};
pub use pagination::{FooterAnnotation, PaginationConfig};
pub use region::{
    default_region_set, set_dimension, set_enabled, validate_dimension, DimensionField,
    Dimensions, Region, RegionKind, RegionSet, MAX_DIMENSION, MIN_DIMENSION,
};
