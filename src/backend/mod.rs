//! Document renderer abstraction.
//!
//! Render sessions talk to a [`DocumentRenderer`] instead of a concrete PDF
//! library. The bundled [`PdfRenderer`] reads page geometry with lopdf and
//! paints scanned page images; other backends can be plugged in by
//! implementing the trait.

mod pdf;

pub use pdf::{load_document, page_box, page_rotation, PdfDocument, PdfRenderer};
pub(crate) use pdf::{inherited, resolve};

use image::RgbaImage;

use crate::error::RenderError;
use crate::model::{Rotation, Viewport};

/// Opens documents and rasterizes their pages.
///
/// Methods are blocking; sessions call them from tokio's blocking pool.
pub trait DocumentRenderer: Send + Sync + 'static {
    /// Opened document handle.
    type Document: Send + Sync + 'static;

    /// Open `bytes`, authenticating with `credential` when encrypted.
    ///
    /// Fails with [`RenderError::PasswordRequired`] when the document is
    /// encrypted and the credential is absent or wrong.
    fn open(&self, bytes: &[u8], credential: Option<&str>)
        -> Result<Self::Document, RenderError>;

    /// Number of pages.
    fn page_count(&self, doc: &Self::Document) -> u32;

    /// Intrinsic rotation of page `page` (1-indexed).
    fn page_rotation(&self, doc: &Self::Document, page: u32) -> Result<Rotation, RenderError>;

    /// Viewport of page `page` at `scale` with `rotation` applied.
    fn viewport(
        &self,
        doc: &Self::Document,
        page: u32,
        scale: f64,
        rotation: Rotation,
    ) -> Result<Viewport, RenderError>;

    /// Paint page `page` into `surface`, which is already sized to `viewport`.
    fn rasterize(
        &self,
        doc: &Self::Document,
        page: u32,
        surface: &mut RgbaImage,
        viewport: Viewport,
        rotation: Rotation,
    ) -> Result<(), RenderError>;
}
