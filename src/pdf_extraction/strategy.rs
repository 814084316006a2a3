// Extraction strategy contract
use crate::types::{ExtractionError, RawDocument};

/// Text produced by one successful strategy attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutput {
    pub text: String,
    pub pages_processed: usize,
}

impl StrategyOutput {
    pub fn new(text: String, pages_processed: usize) -> Self {
        Self {
            text,
            pages_processed,
        }
    }
}

/// One self-contained technique for turning document bytes into text.
///
/// Implementations must be deterministic for the same bytes, free of side
/// effects visible to the caller, and must cap their own work (pages, segments,
/// images) so malformed input cannot make them run unbounded.
pub trait ExtractionStrategy: Send + Sync {
    /// Stable identifier reported in results and diagnostics.
    fn name(&self) -> &str;

    fn attempt(&self, doc: &RawDocument) -> Result<StrategyOutput, ExtractionError>;
}
