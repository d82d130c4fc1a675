//! lopdf-backed page geometry and scan rasterization.

use std::collections::BTreeMap;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use lopdf::encryption::DecryptionError;
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::DocumentRenderer;
use crate::detect::detect_format_from_bytes;
use crate::error::{ProcessError, RenderError};
use crate::model::{PageBox, Rotation, Viewport};

/// Guard against cyclic `/Parent` chains in broken page trees.
const MAX_TREE_DEPTH: usize = 32;

/// Parse `bytes` as PDF and unlock it with `credential` when encrypted.
///
/// An encrypted document without a credential is first tried with the
/// empty user password, which many "protected" files use.
pub fn load_document(bytes: &[u8], credential: Option<&str>) -> Result<Document, ProcessError> {
    detect_format_from_bytes(bytes)
        .map_err(|e| ProcessError::UnreadableDocument(e.to_string()))?;

    let mut doc =
        Document::load_mem(bytes).map_err(|e| decryption_error(e, credential))?;

    if doc.is_encrypted() {
        doc.decrypt(credential.unwrap_or(""))
            .map_err(|e| decryption_error(e, credential))?;
        // Saved output is written unencrypted.
        doc.trailer.remove(b"Encrypt");
        log::debug!("Decrypted document");
    }

    if doc.get_pages().is_empty() {
        return Err(ProcessError::UnreadableDocument(
            "document has no pages".to_string(),
        ));
    }
    Ok(doc)
}

/// Only a rejected password is worth retrying. Encryption lopdf cannot
/// handle (AES, revision 4+) fails the same way for every password.
fn decryption_error(err: lopdf::Error, credential: Option<&str>) -> ProcessError {
    match (err, credential) {
        (lopdf::Error::Decryption(DecryptionError::IncorrectPassword), None) => {
            ProcessError::PasswordRequired
        }
        (lopdf::Error::Decryption(DecryptionError::IncorrectPassword), Some(_)) => {
            ProcessError::IncorrectPassword
        }
        (other, _) => ProcessError::UnreadableDocument(other.to_string()),
    }
}

/// Follow a reference to its target, or return the object as-is.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Look up an inheritable page attribute, walking up `/Parent`.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Intrinsic `/Rotate` of a page, inherited from ancestors when absent.
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> Rotation {
    inherited(doc, page_id, b"Rotate")
        .and_then(as_number)
        .map(|deg| Rotation::from_degrees(deg as i64))
        .unwrap_or_default()
}

fn box_values(obj: &Object, doc: &Document) -> Option<PageBox> {
    let arr = obj.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let v: Vec<f64> = arr
        .iter()
        .filter_map(|o| as_number(resolve(doc, o)))
        .collect();
    if v.len() != 4 {
        return None;
    }
    let page_box = PageBox::new(v[0], v[1], v[2], v[3]);
    (page_box.width() > 0.0 && page_box.height() > 0.0).then_some(page_box)
}

/// Visible area of a page: `/CropBox`, then `/MediaBox`, then US Letter.
pub fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    inherited(doc, page_id, b"CropBox")
        .and_then(|obj| box_values(obj, doc))
        .or_else(|| inherited(doc, page_id, b"MediaBox").and_then(|obj| box_values(obj, doc)))
        .unwrap_or_else(|| {
            log::warn!("Page {:?} has no usable box, assuming Letter", page_id);
            PageBox::letter()
        })
}

/// An opened PDF plus its page table.
pub struct PdfDocument {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfDocument {
    fn page_id(&self, page: u32) -> Result<ObjectId, RenderError> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(RenderError::PageOutOfRange(page, self.pages.len() as u32))
    }

    /// Underlying lopdf document.
    pub fn inner(&self) -> &Document {
        &self.doc
    }
}

/// [`DocumentRenderer`] backed by lopdf.
///
/// Page geometry is exact. Rasterization paints the largest embedded JPEG
/// of the page (the scan, for scanned documents) stretched over the page;
/// vector content is not drawn and such pages render blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentRenderer for PdfRenderer {
    type Document = PdfDocument;

    fn open(&self, bytes: &[u8], credential: Option<&str>) -> Result<PdfDocument, RenderError> {
        let doc = load_document(bytes, credential).map_err(|e| match e {
            ProcessError::PasswordRequired | ProcessError::IncorrectPassword => {
                RenderError::PasswordRequired
            }
            other => RenderError::UnreadableDocument(other.to_string()),
        })?;
        let pages = doc.get_pages();
        Ok(PdfDocument { doc, pages })
    }

    fn page_count(&self, doc: &PdfDocument) -> u32 {
        doc.pages.len() as u32
    }

    fn page_rotation(&self, doc: &PdfDocument, page: u32) -> Result<Rotation, RenderError> {
        Ok(page_rotation(&doc.doc, doc.page_id(page)?))
    }

    fn viewport(
        &self,
        doc: &PdfDocument,
        page: u32,
        scale: f64,
        rotation: Rotation,
    ) -> Result<Viewport, RenderError> {
        Ok(page_box(&doc.doc, doc.page_id(page)?).viewport(scale, rotation))
    }

    fn rasterize(
        &self,
        doc: &PdfDocument,
        page: u32,
        surface: &mut RgbaImage,
        _viewport: Viewport,
        rotation: Rotation,
    ) -> Result<(), RenderError> {
        let page_id = doc.page_id(page)?;
        let Some(jpeg) = largest_page_jpeg(&doc.doc, page_id) else {
            log::debug!("Page {} has no scan image, leaving it blank", page);
            return Ok(());
        };

        let scan = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)
            .map_err(|e| RenderError::Rasterization(e.to_string()))?
            .to_rgba8();
        let upright = match rotation {
            Rotation::None => scan,
            Rotation::Degrees90 => imageops::rotate90(&scan),
            Rotation::Degrees180 => imageops::rotate180(&scan),
            Rotation::Degrees270 => imageops::rotate270(&scan),
        };
        let fitted = imageops::resize(
            &upright,
            surface.width(),
            surface.height(),
            FilterType::Triangle,
        );
        imageops::overlay(surface, &fitted, 0, 0);
        Ok(())
    }
}

fn resources<'a>(doc: &'a Document, page_id: ObjectId) -> Option<&'a Dictionary> {
    inherited(doc, page_id, b"Resources").and_then(|obj| obj.as_dict().ok())
}

fn is_dct(dict: &Dictionary) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => n == b"DCTDecode",
        Ok(Object::Array(arr)) => arr
            .iter()
            .any(|o| matches!(o, Object::Name(n) if n == b"DCTDecode")),
        _ => false,
    }
}

/// JPEG bytes of the largest DCT-encoded image XObject on the page.
fn largest_page_jpeg(doc: &Document, page_id: ObjectId) -> Option<Vec<u8>> {
    let xobjects = resources(doc, page_id)?
        .get(b"XObject")
        .ok()
        .map(|obj| resolve(doc, obj))?
        .as_dict()
        .ok()?;

    xobjects
        .iter()
        .filter_map(|(_, obj)| match resolve(doc, obj) {
            Object::Stream(stream) => Some(stream),
            _ => None,
        })
        .filter(|stream| {
            matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image")
                && is_dct(&stream.dict)
        })
        .max_by_key(|stream| stream.content.len())
        .map(|stream| {
            stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use lopdf::{dictionary, Stream, StringFormat};
    use std::io::Cursor;

    fn build_pdf(page_extra: Dictionary, parent_extra: Dictionary) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let content_id = doc.add_object(Stream::new(dictionary! {}, b"".to_vec()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        for (k, v) in page_extra.iter() {
            page.set(k.clone(), v.clone());
        }
        let page_id = doc.add_object(page);

        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        for (k, v) in parent_extra.iter() {
            pages.set(k.clone(), v.clone());
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_rotation_inherited_from_parent() {
        let bytes = build_pdf(
            dictionary! { "MediaBox" => vec![0.into(), 0.into(), 600.into(), 800.into()] },
            dictionary! { "Rotate" => 180 },
        );
        let renderer = PdfRenderer::new();
        let doc = renderer.open(&bytes, None).unwrap();
        assert_eq!(renderer.page_count(&doc), 1);
        assert_eq!(
            renderer.page_rotation(&doc, 1).unwrap(),
            Rotation::Degrees180
        );
    }

    #[test]
    fn test_crop_box_preferred_over_media_box() {
        let bytes = build_pdf(
            dictionary! {
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "CropBox" => vec![10.into(), 20.into(), 310.into(), 420.into()],
            },
            dictionary! {},
        );
        let renderer = PdfRenderer::new();
        let doc = renderer.open(&bytes, None).unwrap();
        let vp = renderer.viewport(&doc, 1, 2.0, Rotation::None).unwrap();
        assert_eq!(vp, Viewport::new(600.0, 800.0));
    }

    #[test]
    fn test_media_box_inherited_and_rotated() {
        let bytes = build_pdf(
            dictionary! { "Rotate" => 90 },
            dictionary! { "MediaBox" => vec![0.into(), 0.into(), 600.into(), 800.into()] },
        );
        let renderer = PdfRenderer::new();
        let doc = renderer.open(&bytes, None).unwrap();
        let rotation = renderer.page_rotation(&doc, 1).unwrap();
        assert_eq!(rotation, Rotation::Degrees90);
        let vp = renderer.viewport(&doc, 1, 1.0, rotation).unwrap();
        assert_eq!(vp, Viewport::new(800.0, 600.0));
    }

    #[test]
    fn test_missing_box_defaults_to_letter() {
        let bytes = build_pdf(dictionary! {}, dictionary! {});
        let renderer = PdfRenderer::new();
        let doc = renderer.open(&bytes, None).unwrap();
        let vp = renderer.viewport(&doc, 1, 1.0, Rotation::None).unwrap();
        assert_eq!(vp, Viewport::new(612.0, 792.0));
    }

    #[test]
    fn test_open_rejects_non_pdf() {
        let renderer = PdfRenderer::new();
        let result = renderer.open(b"<!DOCTYPE html><html></html>", None);
        assert!(matches!(result, Err(RenderError::UnreadableDocument(_))));
    }

    #[test]
    fn test_page_out_of_range() {
        let bytes = build_pdf(dictionary! {}, dictionary! {});
        let renderer = PdfRenderer::new();
        let doc = renderer.open(&bytes, None).unwrap();
        assert_eq!(
            renderer.page_rotation(&doc, 2),
            Err(RenderError::PageOutOfRange(2, 1))
        );
    }

    #[test]
    fn test_blank_page_keeps_surface() {
        let bytes = build_pdf(dictionary! {}, dictionary! {});
        let renderer = PdfRenderer::new();
        let doc = renderer.open(&bytes, None).unwrap();
        let mut surface = RgbaImage::from_pixel(4, 4, image::Rgba([255, 255, 255, 255]));
        renderer
            .rasterize(&doc, 1, &mut surface, Viewport::new(4.0, 4.0), Rotation::None)
            .unwrap();
        assert!(surface.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    /// Re-save `bytes` with a standard security handler of version `v`.
    fn with_encrypt_dict(bytes: &[u8], v: i64, r: i64) -> Vec<u8> {
        let mut doc = Document::load_mem(bytes).unwrap();
        let padded = Object::String(vec![0x28; 32], StringFormat::Hexadecimal);
        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => v,
            "R" => r,
            "Length" => 128,
            "O" => padded.clone(),
            "U" => padded,
            "P" => -4,
        });
        doc.trailer.set("Encrypt", encrypt_id);
        let id = Object::String(b"0123456789abcdef".to_vec(), StringFormat::Hexadecimal);
        doc.trailer.set("ID", vec![id.clone(), id]);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_unsupported_encryption_is_unreadable() {
        let bytes = with_encrypt_dict(&build_pdf(dictionary! {}, dictionary! {}), 4, 4);

        assert!(matches!(
            load_document(&bytes, None),
            Err(ProcessError::UnreadableDocument(_))
        ));
        assert!(matches!(
            load_document(&bytes, Some("pw")),
            Err(ProcessError::UnreadableDocument(_))
        ));

        let renderer = PdfRenderer::new();
        for credential in [None, Some("pw")] {
            assert!(matches!(
                renderer.open(&bytes, credential),
                Err(RenderError::UnreadableDocument(_))
            ));
        }
    }

    #[test]
    fn test_wrong_password_is_retryable() {
        let bytes = with_encrypt_dict(&build_pdf(dictionary! {}, dictionary! {}), 2, 3);

        assert!(matches!(
            load_document(&bytes, None),
            Err(ProcessError::PasswordRequired)
        ));
        assert!(matches!(
            load_document(&bytes, Some("guess")),
            Err(ProcessError::IncorrectPassword)
        ));
        assert_eq!(
            PdfRenderer::new().open(&bytes, Some("guess")).err(),
            Some(RenderError::PasswordRequired)
        );
    }

    /// Left half red, right half blue.
    fn two_tone_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([220, 20, 20])
            } else {
                Rgb([20, 20, 220])
            }
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    /// A single page of `width` x `height` points covered by a scan image.
    fn build_scan_pdf(width: u32, height: u32, rotate: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            two_tone_jpeg(width, height),
        ));
        let drawing = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q\n", width, height);
        let content_id = doc.add_object(Stream::new(dictionary! {}, drawing.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
            "Rotate" => rotate,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn render_scan(bytes: &[u8]) -> RgbaImage {
        let renderer = PdfRenderer::new();
        let doc = renderer.open(bytes, None).unwrap();
        let rotation = renderer.page_rotation(&doc, 1).unwrap();
        let viewport = renderer.viewport(&doc, 1, 1.0, rotation).unwrap();
        let (w, h) = viewport.pixel_size();
        let mut surface = RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
        renderer
            .rasterize(&doc, 1, &mut surface, viewport, rotation)
            .unwrap();
        surface
    }

    fn is_red(p: &image::Rgba<u8>) -> bool {
        p[0] > 150 && p[2] < 80
    }

    fn is_blue(p: &image::Rgba<u8>) -> bool {
        p[2] > 150 && p[0] < 80
    }

    #[test]
    fn test_scan_painted_onto_surface() {
        let surface = render_scan(&build_scan_pdf(64, 32, 0));
        assert_eq!(surface.dimensions(), (64, 32));
        assert!(is_red(surface.get_pixel(16, 16)));
        assert!(is_blue(surface.get_pixel(48, 16)));
    }

    #[test]
    fn test_scan_quarter_turn() {
        let surface = render_scan(&build_scan_pdf(64, 32, 90));
        assert_eq!(surface.dimensions(), (32, 64));
        // Clockwise: the left half of the scan ends up on top.
        assert!(is_red(surface.get_pixel(16, 16)));
        assert!(is_blue(surface.get_pixel(16, 48)));
    }
}
