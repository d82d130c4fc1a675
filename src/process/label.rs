//! Page labels stamped into the footer band.
//!
//! Labels use a non-embedded CJK Type0 font (`STSong-Light`, Adobe-GB1
//! with the `UniGB-UCS2-H` CMap), which every conforming reader provides.
//! Strings are written as UCS-2 big-endian codes.

use lopdf::content::Operation;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};

use crate::backend::{inherited, resolve};
use crate::error::ProcessError;

/// Resource name of the label font on stamped pages.
pub(crate) const FONT_RESOURCE: &str = "PWLabel";

const BASE_FONT: &str = "STSong-Light";

/// Baseline-to-baseline distance as a multiple of the font size.
const LINE_HEIGHT: f64 = 1.2;

/// Add the label font objects to `doc` and return the Type0 font id.
pub(crate) fn add_font(doc: &mut Document) -> ObjectId {
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => BASE_FONT,
        "Flags" => 6,
        "FontBBox" => vec![(-25).into(), (-254).into(), 1000.into(), 880.into()],
        "ItalicAngle" => 0,
        "Ascent" => 880,
        "Descent" => -120,
        "CapHeight" => 880,
        "StemV" => 93,
    });
    let cid_font = dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType0",
        "BaseFont" => BASE_FONT,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("GB1"),
            "Supplement" => 2,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
        // Proportional Latin glyphs.
        "W" => vec![1.into(), 95.into(), 500.into()],
    };
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => BASE_FONT,
        "Encoding" => "UniGB-UCS2-H",
        "DescendantFonts" => vec![Object::Dictionary(cid_font)],
    })
}

/// Register the label font in the page's own `/Resources`.
///
/// Inherited or shared resources are copied into the page first, so other
/// pages are left untouched.
pub(crate) fn attach_font(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<(), ProcessError> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);
    let mut fonts = resources
        .get(b"Font")
        .ok()
        .map(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| ProcessError::Pdf(format!("page {:?}: {}", page_id, e)))?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// UCS-2 big-endian codes; characters outside the BMP become `?`.
pub(crate) fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .flat_map(|c| {
            let code = u16::try_from(u32::from(c)).unwrap_or(u16::from(b'?'));
            code.to_be_bytes()
        })
        .collect()
}

/// Approximate advance width: half an em for ASCII, a full em otherwise.
pub(crate) fn text_width(text: &str, font_size: f64) -> f64 {
    text.chars()
        .map(|c| if c.is_ascii() { 0.5 } else { 1.0 })
        .sum::<f64>()
        * font_size
}

/// Center `lines` in a footer band of `band_height` across `page_width`,
/// stacked from the top of the band. Lines that would fall below the band
/// are dropped.
pub(crate) fn label_operations(
    lines: &[String],
    page_width: f64,
    band_height: f64,
    font_size: f64,
) -> Vec<Operation> {
    let descent = font_size * 0.2;
    let placed: Vec<(f64, f64, &String)> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let baseline = band_height - font_size - i as f64 * font_size * LINE_HEIGHT;
            let x = ((page_width - text_width(line, font_size)) / 2.0).max(0.0);
            (x, baseline, line)
        })
        .take_while(|(_, baseline, _)| baseline - descent >= 0.0)
        .collect();
    if placed.len() < lines.len() {
        log::debug!(
            "Footer band too short: {} of {} label lines fit",
            placed.len(),
            lines.len()
        );
    }
    if placed.is_empty() {
        return Vec::new();
    }

    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(font_size as f32),
            ],
        ),
        Operation::new("g", vec![0.into()]),
    ];
    for (x, baseline, line) in placed {
        ops.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                Object::Real(x as f32),
                Object::Real(baseline as f32),
            ],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_text(line), StringFormat::Hexadecimal)],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}
