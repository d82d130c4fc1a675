//! Content stream construction for erased regions.
//!
//! Overlays are drawn in displayed space: origin at the bottom-left of the
//! page as a viewer shows it (after `/Rotate`), y up, in points. A `cm`
//! at the start of the overlay maps that space back to user space.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::ProcessError;
use crate::model::{PageBox, Rotation, Viewport};
use crate::overlay::OverlayRect;

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// Matrix taking displayed coordinates to user space.
pub(crate) fn display_matrix(page_box: &PageBox, rotation: Rotation) -> [f64; 6] {
    let (x0, y0) = (page_box.llx, page_box.lly);
    let (w, h) = (page_box.width(), page_box.height());
    match rotation {
        Rotation::None => [1.0, 0.0, 0.0, 1.0, x0, y0],
        Rotation::Degrees90 => [0.0, 1.0, -1.0, 0.0, x0 + w, y0],
        Rotation::Degrees180 => [-1.0, 0.0, 0.0, -1.0, x0 + w, y0 + h],
        Rotation::Degrees270 => [0.0, -1.0, 1.0, 0.0, x0, y0 + h],
    }
}

/// Open a graphics state in displayed space.
pub(crate) fn begin_displayed(page_box: &PageBox, rotation: Rotation) -> Vec<Operation> {
    let m = display_matrix(page_box, rotation);
    vec![
        Operation::new("q", vec![]),
        Operation::new("cm", m.iter().map(|v| real(*v)).collect()),
    ]
}

/// White-fill `rects` (y down, points) on a page displayed at `displayed`.
pub(crate) fn erase_operations(rects: &[OverlayRect], displayed: Viewport) -> Vec<Operation> {
    if rects.is_empty() {
        return Vec::new();
    }
    let mut ops = vec![Operation::new(
        "rg",
        vec![real(1.0), real(1.0), real(1.0)],
    )];
    for rect in rects {
        let y_up = displayed.height - rect.y - rect.height;
        ops.push(Operation::new(
            "re",
            vec![real(rect.x), real(y_up), real(rect.width), real(rect.height)],
        ));
    }
    ops.push(Operation::new("f", vec![]));
    ops
}

/// Encode `operations` into content stream bytes.
pub(crate) fn encode(operations: Vec<Operation>) -> Result<Vec<u8>, ProcessError> {
    Content { operations }.encode().map_err(ProcessError::from)
}

fn content_refs(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            // Indirect array of streams.
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Draw `overlay` above the page's existing content.
///
/// The original streams are wrapped in `q`/`Q` so state they leave behind
/// cannot displace the overlay.
pub(crate) fn wrap_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: Vec<u8>,
) -> Result<(), ProcessError> {
    let original = content_refs(doc, page_id);

    let mut suffix = b"Q\n".to_vec();
    suffix.extend_from_slice(&overlay);

    let prefix_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let suffix_id = doc.add_object(Stream::new(dictionary! {}, suffix));

    let mut contents = Vec::with_capacity(original.len() + 2);
    contents.push(Object::Reference(prefix_id));
    contents.extend(original);
    contents.push(Object::Reference(suffix_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| ProcessError::Pdf(format!("page {:?}: {}", page_id, e)))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}
