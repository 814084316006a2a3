// Positional text reconstruction - walks content streams and rebuilds line
// breaks from the vertical position of each text-show operation
use lopdf::content::Operation;
use lopdf::Object;
use tracing::{debug, warn};

use super::lopdf_helper::{decode_pdf_bytes, number, page_ids, page_operations, with_pdf};
use super::strategy::{ExtractionStrategy, StrategyOutput};
use super::text_quality::normalize_whitespace;
use crate::config::ExtractionConfig;
use crate::types::{ExtractionError, RawDocument};

pub const POSITIONAL_RECONSTRUCTION: &str = "positional-text-reconstruction";

// TJ displacement (thousandths of text space) wide enough to be a word gap
const TJ_WORD_GAP: f32 = -250.0;

pub struct PositionalReconstruction {
    max_pages: usize,
    line_break_delta: f32,
}

impl PositionalReconstruction {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_pages: config.max_positional_pages,
            line_break_delta: config.line_break_delta,
        }
    }
}

impl ExtractionStrategy for PositionalReconstruction {
    fn name(&self) -> &str {
        POSITIONAL_RECONSTRUCTION
    }

    fn attempt(&self, doc: &RawDocument) -> Result<StrategyOutput, ExtractionError> {
        with_pdf(doc, |document| {
            let pages = page_ids(document, self.max_pages);
            if pages.is_empty() {
                return Err(ExtractionError::NoExtractableText(
                    "document has no pages".to_string(),
                ));
            }

            let mut text = String::new();
            for (page_number, page_id) in &pages {
                let operations = match page_operations(document, *page_id) {
                    Ok(ops) => ops,
                    Err(e) => {
                        warn!("Page {} content stream unreadable: {}", page_number, e);
                        continue;
                    }
                };
                let page_text = reconstruct_page(&operations, self.line_break_delta);
                debug!(
                    "Page {}: {} operations, {} characters",
                    page_number,
                    operations.len(),
                    page_text.len()
                );
                if !page_text.trim().is_empty() {
                    text.push_str(&page_text);
                    text.push_str("\n\n");
                }
            }

            let text = normalize_whitespace(&text);
            if text.is_empty() {
                return Err(ExtractionError::NoExtractableText(format!(
                    "no text-show operations in {} page(s)",
                    pages.len()
                )));
            }

            Ok(StrategyOutput::new(text, pages.len()))
        })
    }
}

/// Text state tracked while walking one page
struct TextCursor {
    y: f32,
    leading: f32,
    last_y: Option<f32>,
    line_break_delta: f32,
    out: String,
}

impl TextCursor {
    fn new(line_break_delta: f32) -> Self {
        Self {
            y: 0.0,
            leading: 0.0,
            last_y: None,
            line_break_delta,
            out: String::new(),
        }
    }

    fn next_line(&mut self) {
        self.y -= self.leading;
    }

    fn show(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        match self.last_y {
            Some(last) if (self.y - last).abs() > self.line_break_delta => self.out.push('\n'),
            Some(_) => {
                if !self.out.ends_with(' ') && !chunk.starts_with(' ') {
                    self.out.push(' ');
                }
            }
            None => {}
        }
        self.out.push_str(chunk);
        self.last_y = Some(self.y);
    }
}

/// Rebuild one page's text. Vertical movement beyond `line_break_delta`
/// starts a new line; horizontal layout is approximated with single spaces.
pub fn reconstruct_page(operations: &[Operation], line_break_delta: f32) -> String {
    let mut cursor = TextCursor::new(line_break_delta);

    for op in operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => cursor.y = 0.0,
            "Tm" => {
                if let Some(f) = operands.get(5).and_then(number) {
                    cursor.y = f;
                }
            }
            "Td" => {
                if let Some(ty) = operands.get(1).and_then(number) {
                    cursor.y += ty;
                }
            }
            "TD" => {
                if let Some(ty) = operands.get(1).and_then(number) {
                    cursor.y += ty;
                    cursor.leading = -ty;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    cursor.leading = leading;
                }
            }
            "T*" => cursor.next_line(),
            "Tj" => {
                if let Some(chunk) = operands.first().and_then(string_operand) {
                    cursor.show(&chunk);
                }
            }
            "'" => {
                cursor.next_line();
                if let Some(chunk) = operands.first().and_then(string_operand) {
                    cursor.show(&chunk);
                }
            }
            "\"" => {
                cursor.next_line();
                if let Some(chunk) = operands.get(2).and_then(string_operand) {
                    cursor.show(&chunk);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    cursor.show(&join_tj_array(items));
                }
            }
            _ => {}
        }
    }

    cursor.out
}

fn string_operand(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_pdf_bytes(bytes)),
        _ => None,
    }
}

/// Concatenate a TJ array, turning large negative displacements into spaces
fn join_tj_array(items: &[Object]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => out.push_str(&decode_pdf_bytes(bytes)),
            other => {
                if let Some(displacement) = number(other) {
                    if displacement < TJ_WORD_GAP && !out.ends_with(' ') {
                        out.push(' ');
                    }
                }
            }
        }
    }
    out
}
