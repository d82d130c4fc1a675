//! # pagewipe
//!
//! Header and footer region redaction for PDF pages.
//!
//! The crate models six fixed redaction regions (a full-width band and two
//! corners at the top and at the bottom of a page), previews them over
//! rendered pages, remembers the user's settings, and applies them to a
//! document.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pagewipe::{
//!     default_region_set, set_enabled, DocumentProcessingService, LopdfProcessor,
//!     PaginationConfig, ProcessRequest, RegionKind,
//! };
//!
//! fn main() -> pagewipe::Result<()> {
//!     let regions = set_enabled(&default_region_set(), RegionKind::HeaderRight, true);
//!     let request = ProcessRequest::new(regions, PaginationConfig::new(2, 2), Default::default());
//!
//!     let source = std::fs::read("scan.pdf")?;
//!     let output = LopdfProcessor::default().process(&source, &request)?;
//!     std::fs::write("scan.clean.pdf", &output.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Components
//!
//! - **Region model** ([`model`]): regions, validation, pagination offsets
//! - **Coordinate mapping** ([`overlay`]): region geometry to device pixels
//! - **Render sessions** ([`session`]): single-flight page previews
//! - **Settings** ([`config`]): per-key persisted configuration
//! - **Processing** ([`process`]): erasing regions and stamping page labels

pub mod backend;
pub mod config;
pub mod detect;
pub mod error;
pub mod model;
pub mod overlay;
pub mod process;
pub mod session;

// Re-export commonly used types
pub use backend::{DocumentRenderer, PdfRenderer};
pub use config::{AppConfig, ConfigStore, FileStore, KeyValueStore, MemoryStore};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use error::{
    Error, ErrorResponse, FormatError, PersistenceError, ProcessError, RenderError, Result,
    ValidationError,
};
pub use model::{
    default_region_set, set_dimension, set_enabled, DimensionField, Dimensions, FooterAnnotation,
    PageBox, PaginationConfig, Region, RegionKind, RegionSet, Rotation, Viewport,
};
pub use overlay::{overlay_rects, OverlayRect};
pub use process::{
    crop_footer, DocumentProcessingService, LopdfProcessor, ProcessOptions, ProcessRequest,
    ProcessedDocument,
};
pub use session::{RenderSession, RenderedPage, SessionState, DEFAULT_RENDER_SCALE};

/// Process a PDF file with the given request and write the result.
///
/// # Example
///
/// ```no_run
/// use pagewipe::{process_file, ProcessRequest};
///
/// let request = ProcessRequest::new(Default::default(), Default::default(), Default::default());
/// let report = process_file("in.pdf", "out.pdf", &request).unwrap();
/// println!("{} pages processed", report.processed_pages);
/// ```
pub fn process_file<P, Q>(input: P, output: Q, request: &ProcessRequest) -> Result<ProcessedDocument>
where
    P: AsRef<std::path::Path>,
    Q: AsRef<std::path::Path>,
{
    let source = std::fs::read(input)?;
    let report = LopdfProcessor::default().process(&source, request)?;
    std::fs::write(output, &report.bytes)?;
    Ok(report)
}

/// Render one page of a PDF file with `regions` overlaid.
///
/// Opens a short-lived session, renders, and closes it.
pub async fn preview_file<P: AsRef<std::path::Path>>(
    path: P,
    page: u32,
    regions: &RegionSet,
    scale: f64,
    credential: Option<String>,
) -> Result<RenderedPage> {
    let source = std::fs::read(path)?;
    let session =
        RenderSession::open(std::sync::Arc::new(PdfRenderer::new()), source, credential).await?;
    let rendered = session.render(page, regions, scale).await;
    session.close();
    Ok(rendered?)
}
