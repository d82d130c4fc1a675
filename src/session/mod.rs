//! Page render sessions.
//!
//! A [`RenderSession`] owns one opened document and renders its pages with
//! region overlays on top. At most one render runs per session: a render
//! requested while another is in flight is dropped with
//! [`RenderError::Busy`] rather than queued.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pagewipe::{default_region_set, PdfRenderer, RenderSession};
//!
//! # async fn demo() -> Result<(), pagewipe::RenderError> {
//! let bytes = std::fs::read("scan.pdf").unwrap();
//! let session = RenderSession::open(Arc::new(PdfRenderer::new()), bytes, None).await?;
//! let page = session.render(1, &default_region_set(), 1.5).await?;
//! println!("{}x{}, {} overlays", page.surface.width(), page.surface.height(), page.overlays.len());
//! session.close();
//! # Ok(())
//! # }
//! ```

mod composite;

pub use composite::draw_overlays;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use image::RgbaImage;

use crate::backend::DocumentRenderer;
use crate::error::RenderError;
use crate::model::{RegionSet, Rotation, Viewport};
use crate::overlay::{overlay_rects, OverlayRect};

/// Render scale used by the interactive preview.
pub const DEFAULT_RENDER_SCALE: f64 = 1.5;

/// Surfaces larger than this are refused instead of allocated.
const MAX_SURFACE_PIXELS: u64 = 200_000_000;

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Rendering,
    Closed,
}

/// A rasterized page with its overlays composited on top.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page_number: u32,
    /// `/Rotate` as stored in the document.
    pub intrinsic_rotation: Rotation,
    /// Rotation actually used for layout.
    pub rotation: Rotation,
    pub viewport: Viewport,
    pub surface: RgbaImage,
    pub overlays: Vec<OverlayRect>,
}

/// Releases the render lock when dropped, on every exit path.
struct RenderGuard<'a> {
    lock: &'a AtomicBool,
}

impl<'a> RenderGuard<'a> {
    fn acquire(lock: &'a AtomicBool) -> Option<Self> {
        lock.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { lock })
    }
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.lock.store(false, Ordering::Release);
    }
}

/// One opened document and its preview state.
pub struct RenderSession<R: DocumentRenderer> {
    renderer: Arc<R>,
    document: RwLock<Option<Arc<R::Document>>>,
    page_count: u32,
    current_page: AtomicU32,
    render_lock: AtomicBool,
    closed: AtomicBool,
}

impl<R: DocumentRenderer> RenderSession<R> {
    /// Open `source` on the blocking pool.
    ///
    /// [`RenderError::PasswordRequired`] is recoverable: call `open` again
    /// with a credential.
    pub async fn open(
        renderer: Arc<R>,
        source: Vec<u8>,
        credential: Option<String>,
    ) -> Result<Self, RenderError> {
        let worker = Arc::clone(&renderer);
        let document = tokio::task::spawn_blocking(move || {
            worker.open(&source, credential.as_deref())
        })
        .await
        .map_err(|e| RenderError::UnreadableDocument(e.to_string()))??;

        let page_count = renderer.page_count(&document);
        if page_count == 0 {
            return Err(RenderError::UnreadableDocument(
                "document has no pages".to_string(),
            ));
        }
        log::info!("Opened document with {} pages", page_count);

        Ok(Self {
            renderer,
            document: RwLock::new(Some(Arc::new(document))),
            page_count,
            current_page: AtomicU32::new(1),
            render_lock: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn current_page(&self) -> u32 {
        self.current_page.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SessionState {
        if self.closed.load(Ordering::Acquire) {
            SessionState::Closed
        } else if self.render_lock.load(Ordering::Acquire) {
            SessionState::Rendering
        } else {
            SessionState::Ready
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Move the current page by `delta`.
    ///
    /// Does nothing when the target falls outside `[1, page_count]`. Never
    /// renders; returns the (possibly unchanged) current page.
    pub fn change_page(&self, delta: i64) -> u32 {
        let current = self.current_page();
        let target = i64::from(current) + delta;
        if self.is_closed() || target < 1 || target > i64::from(self.page_count) {
            return current;
        }
        self.current_page.store(target as u32, Ordering::Release);
        target as u32
    }

    /// Render page `page` (1-indexed) with `regions` overlaid.
    ///
    /// `regions` is snapshotted at call time; later edits show up in the
    /// next render.
    pub async fn render(
        &self,
        page: u32,
        regions: &RegionSet,
        scale: f64,
    ) -> Result<RenderedPage, RenderError> {
        if self.is_closed() {
            return Err(RenderError::Closed);
        }
        if page == 0 || page > self.page_count {
            return Err(RenderError::PageOutOfRange(page, self.page_count));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(RenderError::Rasterization(format!(
                "invalid render scale {}",
                scale
            )));
        }

        let Some(_guard) = RenderGuard::acquire(&self.render_lock) else {
            log::debug!("Dropping render of page {}: another render is in flight", page);
            return Err(RenderError::Busy);
        };

        let document = self.document().ok_or(RenderError::Closed)?;
        let renderer = Arc::clone(&self.renderer);
        let regions = regions.clone();
        let result = tokio::task::spawn_blocking(move || {
            render_page(renderer.as_ref(), &document, page, &regions, scale)
        })
        .await;

        if self.is_closed() {
            log::debug!("Discarding render of page {}: session closed", page);
            return Err(RenderError::Closed);
        }

        match result {
            Ok(rendered) => rendered,
            Err(e) if e.is_panic() => Err(RenderError::Rasterization(
                "renderer panicked".to_string(),
            )),
            Err(e) => Err(RenderError::Rasterization(e.to_string())),
        }
    }

    /// Render the current page.
    pub async fn render_current(
        &self,
        regions: &RegionSet,
        scale: f64,
    ) -> Result<RenderedPage, RenderError> {
        self.render(self.current_page(), regions, scale).await
    }

    /// [`render`](Self::render) bounded by `timeout`.
    ///
    /// On timeout the render lock is released; the backend call itself
    /// runs to completion in the background and its result is dropped.
    pub async fn render_with_timeout(
        &self,
        page: u32,
        regions: &RegionSet,
        scale: f64,
        timeout: Duration,
    ) -> Result<RenderedPage, RenderError> {
        tokio::time::timeout(timeout, self.render(page, regions, scale))
            .await
            .map_err(|_| RenderError::TimedOut)?
    }

    /// Close the session from any state.
    ///
    /// In-flight renders keep running but their results are discarded.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.render_lock.store(false, Ordering::Release);
        self.document
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        log::info!("Closed render session");
    }

    fn document(&self) -> Option<Arc<R::Document>> {
        self.document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<R: DocumentRenderer> Drop for RenderSession<R> {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Blocking part of a render: rotation, viewport, fresh surface, overlays.
fn render_page<R: DocumentRenderer>(
    renderer: &R,
    document: &R::Document,
    page: u32,
    regions: &RegionSet,
    scale: f64,
) -> Result<RenderedPage, RenderError> {
    let intrinsic_rotation = renderer.page_rotation(document, page)?;
    let rotation = intrinsic_rotation.corrected();
    if rotation != intrinsic_rotation {
        log::debug!("Page {} is upside down, rendering it upright", page);
    }

    let viewport = renderer.viewport(document, page, scale, rotation)?;
    let (width, height) = viewport.pixel_size();
    if u64::from(width) * u64::from(height) > MAX_SURFACE_PIXELS {
        return Err(RenderError::Rasterization(format!(
            "surface {}x{} is too large",
            width, height
        )));
    }

    let mut surface = RgbaImage::from_pixel(width, height, composite::PAGE_BACKGROUND);
    renderer.rasterize(document, page, &mut surface, viewport, rotation)?;

    let overlays = overlay_rects(regions, viewport, scale);
    draw_overlays(&mut surface, &overlays);

    Ok(RenderedPage {
        page_number: page,
        intrinsic_rotation,
        rotation,
        viewport,
        surface,
        overlays,
    })
}
