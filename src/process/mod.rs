//! Applying a region set to a PDF.
//!
//! [`LopdfProcessor`] is the local [`DocumentProcessingService`]: every page
//! from `processStartPage` on gets its enabled regions painted white, is
//! turned upright when stored upside down, and, when the footer band is
//! enabled, is stamped with a "page n of m" label plus the footer text.
//! Pages before the start page pass through unmodified.

mod content;
mod label;

use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::{load_document, page_box, page_rotation};
use crate::config::AppConfig;
use crate::error::{ProcessError, ValidationError};
use crate::model::{
    DimensionField, FooterAnnotation, PageBox, PaginationConfig, RegionKind, RegionSet, Rotation,
    Viewport, MAX_DIMENSION,
};
use crate::overlay::{overlay_rects, OverlayRect};

/// Default label: "page {page} of {total}".
pub const DEFAULT_LABEL_TEMPLATE: &str = "第 {page} 頁,共 {total} 頁";

/// Everything the processing service needs besides the document bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub regions: RegionSet,
    pub process_start_page: u32,
    pub page_number_start: u32,
    #[serde(default)]
    pub footer_text: FooterAnnotation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl ProcessRequest {
    pub fn new(
        regions: RegionSet,
        pagination: PaginationConfig,
        footer_text: FooterAnnotation,
    ) -> Self {
        Self {
            regions,
            process_start_page: pagination.process_start_page,
            page_number_start: pagination.page_number_start,
            footer_text,
            credential: None,
        }
    }

    /// Request built from persisted settings.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.regions.clone(),
            config.pagination,
            config.footer_text.clone(),
        )
    }

    /// Set the document password.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn pagination(&self) -> PaginationConfig {
        PaginationConfig::new(self.process_start_page, self.page_number_start)
    }
}

/// Output of a processing run.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub bytes: Vec<u8>,
    pub total_pages: u32,
    /// Pages that were modified.
    pub processed_pages: u32,
    /// Pages that received a page label.
    pub labelled_pages: u32,
    /// Upside-down pages that were turned upright.
    pub corrected_pages: u32,
}

/// Options for [`LopdfProcessor`].
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Label font size in points
    pub label_font_size: f64,

    /// Label text; `{page}` and `{total}` are substituted
    pub label_template: String,

    /// Build per-page overlays on the rayon pool
    pub parallel: bool,

    /// `/Producer` written to the document info
    pub producer: String,
}

impl ProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label font size.
    pub fn with_label_font_size(mut self, size: f64) -> Self {
        self.label_font_size = size.clamp(4.0, 72.0);
        self
    }

    /// Set the label template.
    pub fn with_label_template(mut self, template: impl Into<String>) -> Self {
        self.label_template = template.into();
        self
    }

    /// Enable or disable parallel overlay generation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn format_label(&self, page: u32, total: u32) -> String {
        self.label_template
            .replace("{page}", &page.to_string())
            .replace("{total}", &total.to_string())
    }
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            label_font_size: 8.0,
            label_template: DEFAULT_LABEL_TEMPLATE.to_string(),
            parallel: true,
            producer: format!("pagewipe {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Applies a region set to document bytes.
pub trait DocumentProcessingService: Send + Sync {
    fn process(
        &self,
        source: &[u8],
        request: &ProcessRequest,
    ) -> Result<ProcessedDocument, ProcessError>;
}

/// Everything needed to build one page's overlay, read before any mutation.
struct PagePlan {
    page_id: ObjectId,
    page_box: PageBox,
    rotation: Rotation,
    corrected: bool,
    displayed: Viewport,
    rects: Vec<OverlayRect>,
    band_height: f64,
    label_lines: Vec<String>,
}

impl PagePlan {
    fn overlay(&self, font_size: f64) -> Result<Vec<u8>, ProcessError> {
        let mut ops = content::begin_displayed(&self.page_box, self.rotation);
        ops.extend(content::erase_operations(&self.rects, self.displayed));
        if !self.label_lines.is_empty() {
            ops.extend(label::label_operations(
                &self.label_lines,
                self.displayed.width,
                self.band_height,
                font_size,
            ));
        }
        ops.push(lopdf::content::Operation::new("Q", vec![]));
        content::encode(ops)
    }
}

/// lopdf-backed [`DocumentProcessingService`].
#[derive(Debug, Clone, Default)]
pub struct LopdfProcessor {
    options: ProcessOptions,
}

impl LopdfProcessor {
    pub fn new(options: ProcessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    fn plan(
        &self,
        doc: &Document,
        page_number: u32,
        page_id: ObjectId,
        request: &ProcessRequest,
        footer: &FooterAnnotation,
        total: u32,
    ) -> PagePlan {
        let intrinsic = page_rotation(doc, page_id);
        let rotation = intrinsic.corrected();
        let page_box = page_box(doc, page_id);
        let displayed = page_box.viewport(1.0, rotation);
        let rects = overlay_rects(&request.regions, displayed, 1.0);

        let footer_band = request.regions.get(RegionKind::FooterFull);
        let label_lines = match request.pagination().label_numbers(page_number, total) {
            Some((n, m)) if footer_band.enabled => {
                let mut lines = vec![self.options.format_label(n, m)];
                lines.extend(footer.lines().map(str::to_string));
                lines
            }
            _ => Vec::new(),
        };

        PagePlan {
            page_id,
            page_box,
            rotation,
            corrected: rotation != intrinsic,
            displayed,
            rects,
            band_height: footer_band.height(),
            label_lines,
        }
    }
}

impl DocumentProcessingService for LopdfProcessor {
    fn process(
        &self,
        source: &[u8],
        request: &ProcessRequest,
    ) -> Result<ProcessedDocument, ProcessError> {
        request.regions.validate()?;
        let footer = FooterAnnotation::new(request.footer_text.as_str())?;

        let mut doc = load_document(source, request.credential.as_deref())?;
        let pages = doc.get_pages();
        let total = pages.len() as u32;

        let pagination = request.pagination();
        if pagination.process_start_page > total {
            return Err(ProcessError::StartPageBeyondDocument {
                start: pagination.process_start_page,
                total,
            });
        }
        pagination.validate(total)?;

        let plans: Vec<PagePlan> = pages
            .range(pagination.process_start_page..)
            .map(|(&number, &page_id)| self.plan(&doc, number, page_id, request, &footer, total))
            .collect();

        let font_size = self.options.label_font_size;
        let overlays: Vec<Vec<u8>> = if self.options.parallel {
            plans
                .par_iter()
                .map(|plan| plan.overlay(font_size))
                .collect::<Result<_, _>>()?
        } else {
            plans
                .iter()
                .map(|plan| plan.overlay(font_size))
                .collect::<Result<_, _>>()?
        };

        let label_font = plans
            .iter()
            .any(|plan| !plan.label_lines.is_empty())
            .then(|| label::add_font(&mut doc));

        let mut report = ProcessedDocument {
            bytes: Vec::new(),
            total_pages: total,
            processed_pages: plans.len() as u32,
            labelled_pages: 0,
            corrected_pages: 0,
        };
        for (plan, overlay) in plans.iter().zip(overlays) {
            if plan.corrected {
                set_page_entry(&mut doc, plan.page_id, "Rotate", Object::Integer(0))?;
                report.corrected_pages += 1;
            }
            content::wrap_page_content(&mut doc, plan.page_id, overlay)?;
            if let (Some(font_id), false) = (label_font, plan.label_lines.is_empty()) {
                label::attach_font(&mut doc, plan.page_id, font_id)?;
                report.labelled_pages += 1;
            }
        }

        report.bytes = finish(&mut doc, &self.options.producer)?;
        log::info!(
            "Processed {} of {} pages ({} labelled, {} turned upright)",
            report.processed_pages,
            report.total_pages,
            report.labelled_pages,
            report.corrected_pages
        );
        Ok(report)
    }
}

/// Cut `height` points off the displayed bottom of every page by shrinking
/// its `/CropBox`, instead of painting over the footer.
pub fn crop_footer(
    source: &[u8],
    height: f64,
    credential: Option<&str>,
) -> Result<ProcessedDocument, ProcessError> {
    if !height.is_finite() || !(1.0..=MAX_DIMENSION).contains(&height) {
        return Err(ValidationError::OutOfRange {
            kind: RegionKind::FooterFull,
            field: DimensionField::Height,
            value: height,
            min: 1.0,
            max: MAX_DIMENSION,
        }
        .into());
    }

    let mut doc = load_document(source, credential)?;
    let pages = doc.get_pages();
    let total = pages.len() as u32;
    let mut cropped = 0;

    for (&number, &page_id) in &pages {
        let b = page_box(&doc, page_id);
        let new_box = match page_rotation(&doc, page_id) {
            Rotation::None => PageBox::new(b.llx, b.lly + height, b.urx, b.ury),
            Rotation::Degrees90 => PageBox::new(b.llx, b.lly, b.urx - height, b.ury),
            Rotation::Degrees180 => PageBox::new(b.llx, b.lly, b.urx, b.ury - height),
            Rotation::Degrees270 => PageBox::new(b.llx + height, b.lly, b.urx, b.ury),
        };
        if new_box.width() < 1.0 || new_box.height() < 1.0 {
            log::warn!("Page {} is too small to crop {}pt, skipping", number, height);
            continue;
        }
        let values = [new_box.llx, new_box.lly, new_box.urx, new_box.ury]
            .iter()
            .map(|v| Object::Real(*v as f32))
            .collect::<Vec<_>>();
        set_page_entry(&mut doc, page_id, "CropBox", Object::Array(values))?;
        cropped += 1;
    }

    let bytes = finish(&mut doc, &ProcessOptions::default().producer)?;
    log::info!("Cropped {}pt from {} of {} pages", height, cropped, total);
    Ok(ProcessedDocument {
        bytes,
        total_pages: total,
        processed_pages: cropped,
        labelled_pages: 0,
        corrected_pages: 0,
    })
}

fn set_page_entry(
    doc: &mut Document,
    page_id: ObjectId,
    key: &str,
    value: Object,
) -> Result<(), ProcessError> {
    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| ProcessError::Pdf(format!("page {:?}: {}", page_id, e)))?;
    page.set(key, value);
    Ok(())
}

/// Stamp the info dictionary, drop unreachable objects, compress, serialize.
fn finish(doc: &mut Document, producer: &str) -> Result<Vec<u8>, ProcessError> {
    set_processing_metadata(doc, producer);
    doc.prune_objects();
    doc.compress();
    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

fn set_processing_metadata(doc: &mut Document, producer: &str) {
    let now = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
    let producer = Object::String(producer.as_bytes().to_vec(), StringFormat::Literal);
    let mod_date = Object::String(now.into_bytes(), StringFormat::Literal);

    if let Ok(info_id) = doc.trailer.get(b"Info").and_then(Object::as_reference) {
        if let Ok(Object::Dictionary(ref mut info)) = doc.get_object_mut(info_id) {
            info.set("Producer", producer);
            info.set("ModDate", mod_date);
            return;
        }
    }
    let info_id = doc.add_object(dictionary! {
        "Producer" => producer,
        "ModDate" => mod_date,
    });
    doc.trailer.set("Info", info_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = ProcessOptions::new()
            .with_label_font_size(200.0)
            .with_label_template("Page {page}/{total}")
            .with_parallel(false);
        assert_eq!(options.label_font_size, 72.0);
        assert!(!options.parallel);
        assert_eq!(options.format_label(2, 9), "Page 2/9");
    }

    #[test]
    fn test_default_label() {
        assert_eq!(
            ProcessOptions::default().format_label(1, 3),
            "第 1 頁,共 3 頁"
        );
    }

    #[test]
    fn test_request_json_shape() {
        let request = ProcessRequest::new(
            RegionSet::default(),
            PaginationConfig::new(2, 3),
            FooterAnnotation::new("note").unwrap(),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["processStartPage"], 2);
        assert_eq!(json["pageNumberStart"], 3);
        assert_eq!(json["footerText"], "note");
        assert_eq!(json["regions"]["footerFull"]["enabled"], true);
        assert!(json.get("credential").is_none());

        let back: ProcessRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_crop_height_validated() {
        let err = crop_footer(b"%PDF-1.4\n", 0.0, None).unwrap_err();
        assert!(matches!(err, ProcessError::Validation(_)));
    }
}
