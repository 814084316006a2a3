// Structural parse - lopdf decodes the page tree and fonts and pulls the text layer
use tracing::{debug, warn};

use super::lopdf_helper::{page_ids, with_pdf};
use super::strategy::{ExtractionStrategy, StrategyOutput};
use super::text_quality::normalize_whitespace;
use crate::config::ExtractionConfig;
use crate::types::{ExtractionError, RawDocument};

pub const STRUCTURAL_PARSE: &str = "structural-parse";

pub struct StructuralParse {
    max_pages: usize,
}

impl StructuralParse {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_pages: config.max_pages,
        }
    }
}

impl ExtractionStrategy for StructuralParse {
    fn name(&self) -> &str {
        STRUCTURAL_PARSE
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
            for (page_number, _) in &pages {
                // One bad page does not sink the document
                match document.extract_text(&[*page_number]) {
                    Ok(page_text) => {
                        let page_text = page_text.trim();
                        debug!("Page {} yielded {} characters", page_number, page_text.len());
                        if !page_text.is_empty() {
                            text.push_str(page_text);
                            text.push_str("\n\n");
                        }
                    }
                    Err(e) => warn!("Page {} text extraction failed: {}", page_number, e),
                }
            }

            let text = normalize_whitespace(&text);
            if text.is_empty() {
                return Err(ExtractionError::NoExtractableText(format!(
                    "no text objects found in {} page(s)",
                    pages.len()
                )));
            }

            Ok(StrategyOutput::new(text, pages.len()))
        })
    }
}
