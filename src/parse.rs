use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Result, TaggingError};
use crate::geo::Rect;
use crate::logging::PDF_OPERATIONS;

/// US Letter, used when a page tree carries no MediaBox at all.
const DEFAULT_MEDIA_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

pub fn load_pdf<P: AsRef<Path>>(path: P) -> Result<Document> {
    let doc = Document::load(path)?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(TaggingError::Encrypted);
    }
    Ok(doc)
}

/// A page the engine is tagging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    /// 1-based page number.
    pub number: u32,
    pub id: ObjectId,
    pub height: f64,
}

/// Resolve a 0-based page index from the plan to the document's page.
pub fn page_at(doc: &Document, index: i64) -> Result<PageInfo> {
    let reported = index.saturating_add(1);
    let number = index
        .checked_add(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(TaggingError::PageOutOfRange(reported))?;
    let id = *doc
        .get_pages()
        .get(&number)
        .ok_or(TaggingError::PageOutOfRange(reported))?;
    let height = media_box(doc, id)?.height().abs();
    Ok(PageInfo { number, id, height })
}

/// Follow an indirect reference, if `object` is one.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

pub fn object_to_f64(doc: &Document, object: &Object) -> Option<f64> {
    match resolve(doc, object).ok()? {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Look `key` up on the page, walking `/Parent` links for inheritable
/// attributes such as `/Resources` and `/MediaBox`.
fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut current = page_id;
    // Guard against cyclic /Parent chains.
    for _ in 0..64 {
        let dict = doc.get_dictionary(current)?;
        if let Ok(value) = dict.get(key) {
            return Ok(Some(resolve(doc, value)?));
        }
        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => current = parent,
            Err(_) => return Ok(None),
        }
    }
    Ok(None)
}

pub fn media_box(doc: &Document, page_id: ObjectId) -> Result<Rect> {
    let Some(Object::Array(values)) = resolve_inherited(doc, page_id, b"MediaBox")? else {
        warn!(target: PDF_OPERATIONS, ?page_id, "page has no MediaBox, assuming US Letter");
        return Ok(DEFAULT_MEDIA_BOX);
    };
    let numbers: Vec<f64> = values
        .iter()
        .filter_map(|v| object_to_f64(doc, v))
        .collect();
    match numbers.as_slice() {
        [x0, y0, x1, y1] => Ok(Rect::new(*x0, *y0, *x1, *y1)),
        _ => {
            warn!(target: PDF_OPERATIONS, ?page_id, "malformed MediaBox, assuming US Letter");
            Ok(DEFAULT_MEDIA_BOX)
        }
    }
}

pub fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Option<&Dictionary>> {
    Ok(resolve_inherited(doc, page_id, b"Resources")?.and_then(|obj| obj.as_dict().ok()))
}

/// Content streams of a page, in drawing order.
pub fn content_stream_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    doc.get_page_contents(page_id)
}

/// Decoded bytes of one content stream.
pub fn read_content(doc: &Document, stream_id: ObjectId) -> Result<Vec<u8>> {
    let stream = doc.get_object(stream_id)?.as_stream()?;
    if stream.dict.has(b"Filter") {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

/// Replace a content stream's bytes. Streams that were filtered are
/// compressed again when `recompress` is set.
pub fn write_content(
    doc: &mut Document,
    stream_id: ObjectId,
    content: Vec<u8>,
    recompress: bool,
) -> Result<()> {
    let stream = doc.get_object_mut(stream_id)?.as_stream_mut()?;
    let was_filtered = stream.dict.has(b"Filter");
    stream.set_plain_content(content);
    if was_filtered && recompress {
        stream.compress()?;
    }
    debug!(target: PDF_OPERATIONS, ?stream_id, was_filtered, "rewrote content stream");
    Ok(())
}

/// Add a new content stream after the page's existing ones.
pub fn append_content_stream(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<ObjectId> {
    let stream_id = doc.add_object(Stream::new(dictionary! {}, content));

    let existing = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();
    let contents = match existing {
        None => Object::Reference(stream_id),
        Some(Object::Array(mut items)) => {
            items.push(Object::Reference(stream_id));
            Object::Array(items)
        }
        Some(Object::Reference(id)) => match doc.get_object_mut(id)? {
            Object::Array(items) => {
                items.push(Object::Reference(stream_id));
                return Ok(stream_id);
            }
            _ => Object::Array(vec![Object::Reference(id), Object::Reference(stream_id)]),
        },
        Some(_) => Object::Reference(stream_id),
    };
    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", contents);
    Ok(stream_id)
}
