//! Small helpers for reading lopdf objects.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Follow one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// A dictionary entry with references resolved.
pub(crate) fn get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|obj| resolve(doc, obj))
}

pub(crate) fn get_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    get(doc, dict, key).and_then(|obj| obj.as_dict().ok())
}

pub(crate) fn get_array<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Vec<Object>> {
    get(doc, dict, key).and_then(|obj| obj.as_array().ok())
}

pub(crate) fn get_name(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    get(doc, dict, key)
        .and_then(|obj| obj.as_name().ok())
        .map(|name| String::from_utf8_lossy(name).into_owned())
}

pub(crate) fn get_number(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<f64> {
    get(doc, dict, key).and_then(number)
}

/// Integer or real value as `f64`.
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Numbers of an array, or `None` if any element is not a number.
pub(crate) fn numbers(doc: &Document, items: &[Object]) -> Option<Vec<f64>> {
    items.iter().map(|obj| number(resolve(doc, obj))).collect()
}

/// Look up a page attribute, walking up the page tree through `/Parent`.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Page trees are shallow; the bound guards against /Parent cycles.
    for _ in 0..64 {
        if let Some(value) = get(doc, current, key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Decoded bytes of a stream, decompressing when it has filters.
pub(crate) fn stream_bytes(stream: &lopdf::Stream) -> lopdf::Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content()
    } else {
        Ok(stream.content.clone())
    }
}
