//! Page lookup and page-level edits on a loaded document

use crate::error::PdfSignError;
use crate::geometry::PageSize;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Inherited attributes are looked up at most this many levels up the page tree
const MAX_TREE_DEPTH: usize = 32;

/// Visible area of a single page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// Lower-left corner of the visible box
    pub origin_x: f64,
    pub origin_y: f64,
    pub size: PageSize,
}

impl Default for PageBox {
    /// US Letter, used when a page has no usable MediaBox
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            size: PageSize::letter(),
        }
    }
}

/// Object id of a 1-based page, or `None` when out of range
pub fn page_id(doc: &Document, page: u32) -> Option<ObjectId> {
    doc.get_pages().get(&page).copied()
}

/// The box viewers display: the CropBox clipped to the MediaBox, or the
/// MediaBox alone when there is no usable CropBox. Both may be inherited
/// through `/Parent`.
pub fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let Some(media) = inherited(doc, page_id, b"MediaBox").and_then(|obj| parse_rect(doc, obj))
    else {
        return PageBox::default();
    };
    let media = normalize_rect(media);

    let visible = inherited(doc, page_id, b"CropBox")
        .and_then(|obj| parse_rect(doc, obj))
        .and_then(|crop| intersect(normalize_rect(crop), media))
        .unwrap_or(media);

    let [x1, y1, x2, y2] = visible;
    PageBox {
        origin_x: x1,
        origin_y: y1,
        size: PageSize {
            width: x2 - x1,
            height: y2 - y1,
        },
    }
}

/// Reorder corners to `[left, bottom, right, top]`
fn normalize_rect([x1, y1, x2, y2]: [f64; 4]) -> [f64; 4] {
    [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)]
}

/// Overlap of two normalized rectangles, `None` when it has no area
fn intersect(a: [f64; 4], b: [f64; 4]) -> Option<[f64; 4]> {
    let r = [a[0].max(b[0]), a[1].max(b[1]), a[2].min(b[2]), a[3].min(b[3])];
    (r[2] > r[0] && r[3] > r[1]).then_some(r)
}

/// Look up a possibly inherited page attribute
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn parse_rect(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let arr = resolve(doc, obj)?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut values = [0.0f64; 4];
    for (slot, item) in values.iter_mut().zip(arr) {
        *slot = number(resolve(doc, item)?)?;
    }
    Some(values)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Register `xobject_id` under `name` in the page's own `/Resources`.
///
/// The page gets a private copy of its resources (inherited or behind a
/// reference, with a referenced `/XObject` subdictionary inlined) so the
/// new entry does not leak to pages sharing them. Dangling references
/// count as empty dictionaries.
pub fn add_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    name: &[u8],
    xobject_id: ObjectId,
) -> Result<(), PdfSignError> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();
    xobjects.set(name.to_vec(), Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| PdfSignError::DocumentLoad(e.to_string()))?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Current `/Contents` of a page as a list of stream references
fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, PdfSignError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| PdfSignError::DocumentLoad(e.to_string()))?;

    Ok(match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            // Indirect array of streams
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        _ => Vec::new(),
    })
}

/// Wrap the existing page content in `q`/`Q` so its graphics state cannot
/// leak into appended drawing. Saves the content leaves open are closed too.
pub fn isolate_content(doc: &mut Document, page_id: ObjectId) -> Result<(), PdfSignError> {
    let existing = content_refs(doc, page_id)?;
    let unclosed = doc
        .get_page_content(page_id)
        .ok()
        .and_then(|bytes| Content::decode(&bytes).ok())
        .map(|content| unclosed_saves(&content))
        .unwrap_or(0);

    let mut close = b"\n".to_vec();
    for _ in 0..=unclosed {
        close.extend_from_slice(b"Q\n");
    }

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let close_id = doc.add_object(Stream::new(Dictionary::new(), close));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(close_id));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| PdfSignError::DocumentLoad(e.to_string()))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Number of `q` still open at the end of `content`
fn unclosed_saves(content: &Content) -> usize {
    content
        .operations
        .iter()
        .fold(0usize, |depth, op| match op.operator.as_str() {
            "q" => depth + 1,
            "Q" => depth.saturating_sub(1),
            _ => depth,
        })
}

/// Append a content stream to the end of the page's `/Contents`
pub fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), PdfSignError> {
    let mut contents = content_refs(doc, page_id)?;
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), content));
    contents.push(Object::Reference(stream_id));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| PdfSignError::DocumentLoad(e.to_string()))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}
