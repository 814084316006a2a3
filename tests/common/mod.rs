// Shared fixtures - PDFs are built in-process with lopdf, never checked in
#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use studykit::pdf_extraction::StrategyOutput;
use studykit::{ExtractionError, ExtractionStrategy, MediaType, OcrProvider, RawDocument};

pub const LINE_ONE: &str = "Mitochondria produce most of the energy a cell needs.";
pub const LINE_TWO: &str = "Ribosomes assemble proteins from amino acids.";

/// Bytes handed to the OCR mock as the embedded "JPEG"
pub const FAKE_JPEG: &[u8] =
    &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9];

/// PDF with one page per entry in `pages`, every page sharing the same
/// resources. `trailer` runs last so fixtures can add trailer entries.
fn build_pdf<F, T>(pages: Vec<Vec<Operation>>, resources: F, compress: bool, trailer: T) -> Vec<u8>
where
    F: FnOnce(&mut Document) -> lopdf::Dictionary,
    T: FnOnce(&mut Document),
{
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();
    let resources = resources(&mut doc);

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id =
            doc.add_object(Stream::new(dictionary! {}, content.encode().expect("content encodes")));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources.clone(),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::Reference(page_id));
    }
    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => kids.len() as i64,
        "Kids" => kids,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    trailer(&mut doc);
    if compress {
        doc.compress();
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture PDF serializes");
    bytes
}

fn single_page_pdf<F>(operations: Vec<Operation>, resources: F, compress: bool) -> Vec<u8>
where
    F: FnOnce(&mut Document) -> lopdf::Dictionary,
{
    build_pdf(vec![operations], resources, compress, |_| {})
}

fn font_resources(_doc: &mut Document) -> lopdf::Dictionary {
    dictionary! {
        "Font" => dictionary! {
            "F1" => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            },
        },
    }
}

/// Text-layer PDF with two lines 16pt apart
pub fn text_pdf() -> Vec<u8> {
    let operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
        Operation::new("Tj", vec![Object::string_literal(LINE_ONE)]),
        Operation::new("Td", vec![0.into(), (-16).into()]),
        Operation::new("Tj", vec![Object::string_literal(LINE_TWO)]),
        Operation::new("ET", vec![]),
    ];
    single_page_pdf(operations, font_resources, true)
}

fn vector_operations() -> Vec<Operation> {
    vec![
        Operation::new("m", vec![0.into(), 0.into()]),
        Operation::new("l", vec![100.into(), 100.into()]),
        Operation::new("S", vec![]),
    ]
}

/// Valid container, one page, only vector graphics
pub fn empty_text_pdf() -> Vec<u8> {
    single_page_pdf(vector_operations(), |_| dictionary! {}, true)
}

/// Page text for [`text_pages_pdf`]
pub fn page_sentence(page: usize) -> String {
    format!("Page {} explains how enzymes speed up chemical reactions.", page)
}

/// One line of distinct text on each of `count` pages
pub fn text_pages_pdf(count: usize) -> Vec<u8> {
    let pages = (1..=count)
        .map(|page| {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(page_sentence(page))]),
                Operation::new("ET", vec![]),
            ]
        })
        .collect();
    build_pdf(pages, font_resources, true, |_| {})
}

/// Standard security handler entry in the trailer; the pages carry no text
/// so nothing can be recovered from the raw bytes either
pub fn encrypted_pdf() -> Vec<u8> {
    build_pdf(vec![vector_operations()], |_| dictionary! {}, true, |doc| {
        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => 1,
            "R" => 2,
            "Length" => 40,
            "P" => -4,
            "O" => Object::string_literal(vec![0x4Fu8; 32]),
            "U" => Object::string_literal(vec![0x55u8; 32]),
        });
        doc.trailer.set("Encrypt", encrypt_id);
    })
}

fn image_page() -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("cm", vec![612.into(), 0.into(), 0.into(), 792.into(), 0.into(), 0.into()]),
        Operation::new("Do", vec!["Im1".into()]),
        Operation::new("Q", vec![]),
    ]
}

/// Scanned-style page: a single DCTDecode image XObject and no text
pub fn image_only_pdf() -> Vec<u8> {
    single_page_pdf(image_page(), image_resources, false)
}

/// `count` scanned-style pages, each drawing the embedded JPEG
pub fn scanned_pages_pdf(count: usize) -> Vec<u8> {
    build_pdf(vec![image_page(); count], image_resources, false, |_| {})
}

fn image_resources(doc: &mut Document) -> lopdf::Dictionary {
    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        FAKE_JPEG.to_vec(),
    );
    let image_id = doc.add_object(image);
    dictionary! {
        "XObject" => dictionary! { "Im1" => image_id },
    }
}

/// PDF header and a text object, but no xref table or trailer
pub fn corrupted_pdf() -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n1 0 obj\n<< /Length 88 >>\nstream\n".to_vec();
    bytes.extend_from_slice(format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET\n", LINE_ONE).as_bytes());
    bytes.extend_from_slice(b"endstream\nendobj\n%%EOF\n");
    bytes
}

pub fn png_image() -> Vec<u8> {
    let mut png = std::io::Cursor::new(Vec::new());
    image::RgbImage::new(8, 8)
        .write_to(&mut png, image::ImageFormat::Png)
        .expect("fixture PNG encodes");
    png.into_inner()
}

pub fn pdf(bytes: Vec<u8>) -> RawDocument {
    RawDocument::new(bytes, MediaType::Pdf, "fixture.pdf")
}

/// Strategy that counts calls and always returns the same text
pub struct CountingStrategy {
    pub calls: Arc<AtomicUsize>,
    pub text: &'static str,
}

impl CountingStrategy {
    pub fn boxed(text: &'static str) -> (Box<dyn ExtractionStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Box::new(Self {
            calls: Arc::clone(&calls),
            text,
        });
        (strategy, calls)
    }
}

impl ExtractionStrategy for CountingStrategy {
    fn name(&self) -> &str {
        "counting"
    }

    fn attempt(&self, _doc: &RawDocument) -> Result<StrategyOutput, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(StrategyOutput::new(self.text.to_string(), 1))
    }
}

/// OCR stand-in that records the bytes it was given
pub struct MockOcr {
    pub available: bool,
    pub calls: AtomicUsize,
    pub last_input: std::sync::Mutex<Vec<u8>>,
}

impl MockOcr {
    pub fn new(available: bool) -> Arc<Self> {
        Arc::new(Self {
            available,
            calls: AtomicUsize::new(0),
            last_input: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrProvider for MockOcr {
    fn name(&self) -> &str {
        "mock-ocr"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_input.lock() {
            *last = image.to_vec();
        }
        Ok("Scanned page: the water cycle moves water between sea and sky.".to_string())
    }
}
