// PDF extraction module
pub mod coordinator;
pub mod document_analyzer;
pub mod lopdf_helper;
pub mod ocr_delegate;
pub mod positional;
pub mod raw_scan;
pub mod strategy;
pub mod structural;
pub mod text_quality;

pub use coordinator::{
    ExtractionCoordinator, ExtractionDiagnostic, ExtractionResult, StrategyAttempt,
};
pub use document_analyzer::{format_bytes, DocumentAnalyzer, DocumentClass, DocumentInspection};
pub use ocr_delegate::{CommandOcrProvider, OcrDelegate, OcrProvider, EXTERNAL_OCR_DELEGATE};
pub use positional::{PositionalReconstruction, POSITIONAL_RECONSTRUCTION};
pub use raw_scan::{RawPatternScan, RAW_PATTERN_SCAN};
pub use strategy::{ExtractionStrategy, StrategyOutput};
pub use structural::{StructuralParse, STRUCTURAL_PARSE};
pub use text_quality::calculate_quality_score;
