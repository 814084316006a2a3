// lopdf helper - Pure Rust PDF operations shared by the extraction strategies
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::types::{find_pdf_header, ExtractionError, MediaType, RawDocument};

// Page trees deeper than this are treated as malformed
const MAX_INHERITANCE_DEPTH: usize = 16;
const MAX_REFERENCE_HOPS: usize = 8;

/// Load a PDF document from memory using lopdf
pub fn load_pdf(bytes: &[u8]) -> Result<Document, ExtractionError> {
    if find_pdf_header(bytes).is_none() {
        return Err(ExtractionError::UnsupportedFormat(
            "missing %PDF header".to_string(),
        ));
    }
    let document = Document::load_mem(bytes)?;
    if document.is_encrypted() {
        return Err(ExtractionError::UnsupportedFormat(
            "document is encrypted".to_string(),
        ));
    }
    Ok(document)
}

/// Execute an operation with a PDF document loaded from a raw upload.
/// Image uploads are refused before any parsing happens.
pub fn with_pdf<F, R>(doc: &RawDocument, f: F) -> Result<R, ExtractionError>
where
    F: FnOnce(&Document) -> Result<R, ExtractionError>,
{
    if doc.media_type() == MediaType::Image {
        return Err(ExtractionError::UnsupportedFormat(
            "image upload has no document structure".to_string(),
        ));
    }
    let document = load_pdf(doc.bytes())?;
    f(&document)
}

/// First `limit` pages as (1-based page number, object id)
pub fn page_ids(document: &Document, limit: usize) -> Vec<(u32, ObjectId)> {
    document.get_pages().into_iter().take(limit).collect()
}

/// Decoded content stream operations for one page
pub fn page_operations(
    document: &Document,
    page_id: ObjectId,
) -> Result<Vec<Operation>, ExtractionError> {
    let data = document.get_page_content(page_id)?;
    if data.is_empty() {
        return Ok(Vec::new());
    }
    Ok(Content::decode(&data)?.operations)
}

/// Follow indirect references until a direct object is reached
pub fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_REFERENCE_HOPS {
        match current {
            Object::Reference(id) => current = document.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// Page resources, inherited from the page tree when the page has none
pub fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = document.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(resources) = current.get(b"Resources") {
            return resolve(document, resources)?.as_dict().ok();
        }
        let parent = current.get(b"Parent").ok()?;
        current = resolve(document, parent)?.as_dict().ok()?;
    }
    None
}

/// Image XObjects referenced from a page's resources
pub fn page_image_streams(document: &Document, page_id: ObjectId) -> Vec<&Stream> {
    let Some(resources) = page_resources(document, page_id) else {
        return Vec::new();
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(document, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_name, obj)| resolve(document, obj)?.as_stream().ok())
        .filter(|stream| name_equals(document, &stream.dict, b"Subtype", b"Image"))
        .collect()
}

/// True when the stream holds a bare JPEG (a single DCTDecode filter)
pub fn is_jpeg_stream(document: &Document, stream: &Stream) -> bool {
    match stream.dict.get(b"Filter").ok().and_then(|f| resolve(document, f)) {
        Some(Object::Name(name)) => name == b"DCTDecode",
        Some(Object::Array(filters)) => {
            filters.len() == 1 && matches!(&filters[0], Object::Name(name) if name == b"DCTDecode")
        }
        _ => false,
    }
}

fn name_equals(document: &Document, dict: &Dictionary, key: &[u8], expected: &[u8]) -> bool {
    match dict.get(key).ok().and_then(|obj| resolve(document, obj)) {
        Some(Object::Name(name)) => name == expected,
        _ => false,
    }
}

/// Numeric operand as f32
pub fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Turn PDF string bytes into text: UTF-16BE with BOM, UTF-8 with BOM,
/// otherwise a single-byte encoding read as Latin-1.
pub fn decode_pdf_bytes(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes
        .iter()
        .map(|&b| b as char)
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect()
}

/// Undo literal-string escapes (`\n`, `\(`, octal `\ddd`, line continuations)
pub fn unescape_literal(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        if b != b'\\' || i + 1 >= raw.len() {
            out.push(b);
            i += 1;
            continue;
        }
        let next = raw[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'0'..=b'7' => {
                let mut value = u32::from(next - b'0');
                let mut digits = 1;
                while digits < 3 && i < raw.len() && (b'0'..=b'7').contains(&raw[i]) {
                    value = value * 8 + u32::from(raw[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                out.push((value & 0xFF) as u8);
            }
            // Line continuation
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => {}
            other => out.push(other),
        }
    }
    out
}

/// Decode a hex string body, ignoring whitespace; an odd final digit is padded with 0
pub fn decode_hex(raw: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = raw
        .iter()
        .filter_map(|b| (*b as char).to_digit(16).map(|d| d as u8))
        .collect();
    digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_literal() {
        assert_eq!(unescape_literal(br"a\(b\)c"), b"a(b)c");
        assert_eq!(unescape_literal(br"tab\there"), b"tab\there");
        assert_eq!(unescape_literal(br"\101\102C"), b"ABC");
        assert_eq!(unescape_literal(b"split\\\nline"), b"splitline");
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex(b"48 65 6C6C6F"), b"Hello");
        assert_eq!(decode_hex(b"4"), vec![0x40]);
    }

    #[test]
    fn test_decode_utf16_with_bom() {
        let bytes = [0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(decode_pdf_bytes(&bytes), "Hi");
    }

    #[test]
    fn test_decode_latin1_drops_control_bytes() {
        assert_eq!(decode_pdf_bytes(b"caf\xE9\x01"), "café");
    }

    #[test]
    fn test_load_pdf_rejects_non_pdf() {
        let err = load_pdf(b"GIF89a....").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(number(&Object::Integer(3)), Some(3.0));
        assert_eq!(number(&Object::Real(1.5)), Some(1.5));
        assert_eq!(number(&Object::Null), None);
    }
}
