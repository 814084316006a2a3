// Document analyzer - structural fingerprint of an upload, used to explain
// extraction failures and to pick remediation advice
use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::lopdf_helper::{page_ids, page_image_streams, page_operations};
use crate::config::ExtractionConfig;
use crate::types::{find_pdf_header, ExtractionError, FailureKind, MediaType, RawDocument};

/// Structural classification of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentClass {
    TextDocument,
    ValidContainerNoText,
    ScannedImageContent,
    ImageFile,
    Encrypted,
    CorruptedContainer,
    NotRecognized,
    Oversized,
    Empty,
}

impl DocumentClass {
    /// Overall failure kind reported when no strategy produced usable text
    pub fn failure_kind(self) -> FailureKind {
        match self {
            DocumentClass::ValidContainerNoText
            | DocumentClass::ScannedImageContent
            | DocumentClass::ImageFile => FailureKind::NoExtractableText,
            DocumentClass::Encrypted
            | DocumentClass::CorruptedContainer
            | DocumentClass::NotRecognized => FailureKind::UnsupportedFormat,
            DocumentClass::TextDocument => FailureKind::InsufficientContent,
            DocumentClass::Oversized => FailureKind::OversizedDocument,
            DocumentClass::Empty => FailureKind::EmptyDocument,
        }
    }

    /// Remediation advice for a user whose upload landed in this class
    pub fn suggestions(self) -> Vec<String> {
        let advice: &[&str] = match self {
            DocumentClass::TextDocument => &[
                "The text layer is too short to study from; try a longer document",
                "Paste the text directly if only part of the document is relevant",
            ],
            DocumentClass::ValidContainerNoText => &[
                "The PDF has no text layer; export it again with text enabled",
                "Run the document through OCR software before uploading",
                "Copy and paste the text directly if you have access to it",
            ],
            DocumentClass::ScannedImageContent => &[
                "The PDF appears to contain scanned pages; run OCR software such as tesseract first",
                "Upload a text-based version of the document if one exists",
            ],
            DocumentClass::ImageFile => &[
                "Image uploads need OCR; install tesseract so text can be recognized",
                "Upload a text-based PDF instead",
            ],
            DocumentClass::Encrypted => {
                &["Remove the password protection and upload the file again"]
            }
            DocumentClass::CorruptedContainer => &[
                "The file appears damaged; re-export or re-download it and try again",
                "Open and save the document in a PDF viewer to repair it",
            ],
            DocumentClass::NotRecognized => &["Upload a PDF or an image file"],
            DocumentClass::Oversized => {
                &["Split the document into smaller files and upload them separately"]
            }
            DocumentClass::Empty => &["The file is empty; check the upload and try again"],
        };
        advice.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            DocumentClass::TextDocument => "document has a text layer",
            DocumentClass::ValidContainerNoText => {
                "valid container format but no text objects found"
            }
            DocumentClass::ScannedImageContent => "apparent scanned/image content",
            DocumentClass::ImageFile => "image file",
            DocumentClass::Encrypted => "encrypted document",
            DocumentClass::CorruptedContainer => {
                "container header present but structure is damaged"
            }
            DocumentClass::NotRecognized => "not a recognized container",
            DocumentClass::Oversized => "document exceeds the size limit",
            DocumentClass::Empty => "document is empty",
        };
        f.write_str(description)
    }
}

/// Everything learned about a document without extracting its text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInspection {
    pub source: String,
    pub file_size: usize,
    pub file_size_formatted: String,
    pub media_type: MediaType,
    pub is_pdf: bool,
    pub pdf_version: Option<String>,
    pub page_count: usize,
    pub encrypted: bool,
    pub has_text_layer: bool,
    pub image_count: usize,
    pub is_image_based: bool,
    pub classification: DocumentClass,
    pub recommendations: Vec<String>,
}

impl DocumentInspection {
    fn new(doc: &RawDocument) -> Self {
        Self {
            source: doc.source().to_string(),
            file_size: doc.len(),
            file_size_formatted: format_bytes(doc.len()),
            media_type: doc.media_type(),
            is_pdf: false,
            pdf_version: None,
            page_count: 0,
            encrypted: false,
            has_text_layer: false,
            image_count: 0,
            is_image_based: false,
            classification: DocumentClass::NotRecognized,
            recommendations: Vec::new(),
        }
    }

    fn classified(mut self, class: DocumentClass) -> Self {
        self.classification = class;
        self.recommendations = class.suggestions();
        self
    }
}

/// Document analyzer for fingerprinting uploads
pub struct DocumentAnalyzer {
    max_document_bytes: usize,
    max_pages: usize,
}

impl DocumentAnalyzer {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_document_bytes: config.max_document_bytes,
            max_pages: config.max_pages,
        }
    }

    pub fn inspect(&self, doc: &RawDocument) -> DocumentInspection {
        let inspection = DocumentInspection::new(doc);
        let bytes = doc.bytes();

        if doc.is_empty() {
            return inspection.classified(DocumentClass::Empty);
        }
        if doc.len() > self.max_document_bytes {
            return inspection.classified(DocumentClass::Oversized);
        }

        if let Some(offset) = find_pdf_header(bytes) {
            return self.inspect_pdf(inspection, bytes, offset);
        }

        if doc.media_type() == MediaType::Image || MediaType::sniff(bytes) == MediaType::Image {
            let mut inspection = inspection;
            inspection.image_count = 1;
            inspection.is_image_based = true;
            return inspection.classified(DocumentClass::ImageFile);
        }

        inspection.classified(DocumentClass::NotRecognized)
    }

    fn inspect_pdf(
        &self,
        mut inspection: DocumentInspection,
        bytes: &[u8],
        header_offset: usize,
    ) -> DocumentInspection {
        inspection.is_pdf = true;
        inspection.pdf_version = header_version(&bytes[header_offset..]);

        let document = match Document::load_mem(bytes) {
            Ok(document) => document,
            Err(e) => {
                let error = ExtractionError::from(e);
                debug!("Container failed to load: {}", error);
                let message = error.to_string().to_lowercase();
                if message.contains("encrypt")
                    || message.contains("decrypt")
                    || contains(bytes, b"/Encrypt")
                {
                    inspection.encrypted = true;
                    return inspection.classified(DocumentClass::Encrypted);
                }
                return inspection.classified(DocumentClass::CorruptedContainer);
            }
        };

        if document.is_encrypted() {
            inspection.encrypted = true;
            inspection.page_count = document.get_pages().len();
            return inspection.classified(DocumentClass::Encrypted);
        }

        inspection.page_count = document.get_pages().len();
        if inspection.page_count == 0 {
            return inspection.classified(DocumentClass::ValidContainerNoText);
        }

        for (_, page_id) in page_ids(&document, self.max_pages) {
            inspection.image_count += page_image_streams(&document, page_id).len();
            if !inspection.has_text_layer {
                inspection.has_text_layer = page_operations(&document, page_id)
                    .map(|ops| ops.iter().any(shows_text))
                    .unwrap_or(false);
            }
        }
        inspection.is_image_based = inspection.image_count > 0 && !inspection.has_text_layer;

        let class = if inspection.has_text_layer {
            DocumentClass::TextDocument
        } else if inspection.is_image_based {
            DocumentClass::ScannedImageContent
        } else {
            DocumentClass::ValidContainerNoText
        };
        inspection.classified(class)
    }
}

/// True for a text-show operator with at least one non-empty string operand
fn shows_text(op: &lopdf::content::Operation) -> bool {
    if !matches!(op.operator.as_str(), "Tj" | "TJ" | "'" | "\"") {
        return false;
    }
    op.operands.iter().any(|operand| match operand {
        Object::String(bytes, _) => bytes.iter().any(|b| !b.is_ascii_whitespace()),
        Object::Array(items) => items
            .iter()
            .any(|item| matches!(item, Object::String(bytes, _) if !bytes.is_empty())),
        _ => false,
    })
}

/// Version from a `%PDF-x.y` header, e.g. "1.7"
fn header_version(header: &[u8]) -> Option<String> {
    let rest = header.get(5..)?;
    let version: String = rest
        .iter()
        .take(8)
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|&b| b as char)
        .collect();
    (!version.is_empty()).then_some(version)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Human readable byte count: "0 B", "512 B", "1.5 KB", "12 MB"
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 || value >= 10.0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
