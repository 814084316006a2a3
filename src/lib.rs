// studykit - text extraction and study material synthesis
pub mod config;
pub mod loader;
pub mod pdf_extraction;
pub mod study;
pub mod types;

pub use config::{AnalysisConfig, ExtractionConfig, QuizConfig, StudyConfig, SummaryConfig};
pub use loader::{DocumentLoader, FileLoader};
pub use pdf_extraction::{
    DocumentClass, DocumentInspection, ExtractionCoordinator, ExtractionDiagnostic,
    ExtractionResult, ExtractionStrategy, OcrProvider,
};
pub use study::{
    validate_study_input, ContentAnalysis, ContentAnalyzer, QuizGrade, QuizSynthesizer,
    SummarySynthesizer,
};
pub use types::{
    ConfigError, ExtractionError, FailureKind, MediaType, QuestionKind, QuizQuestion, RawDocument,
    StudyInputError, StudyMaterial, StudyQuiz, StudySummary,
};

use pdf_extraction::DocumentAnalyzer;

/// Run the default strategy chain over one document.
pub fn extract_text(doc: &RawDocument, config: &ExtractionConfig) -> ExtractionResult {
    ExtractionCoordinator::new(config.clone()).extract(doc)
}

/// Structural fingerprint of a document, without extracting its text.
pub fn inspect_document(doc: &RawDocument, config: &ExtractionConfig) -> DocumentInspection {
    DocumentAnalyzer::new(config).inspect(doc)
}

/// Analyze `text` once and build both the summary and a quiz of up to
/// `desired_questions` questions from it. The caller is expected to have
/// filtered the text with [`validate_study_input`].
pub fn generate_study_material(
    text: &str,
    desired_questions: usize,
    config: &StudyConfig,
) -> Result<StudyMaterial, ConfigError> {
    let analysis = ContentAnalyzer::new(config.analysis.clone())?.analyze(text);
    let summary = SummarySynthesizer::new(config.summary.clone()).summarize(text, &analysis);
    let quiz = QuizSynthesizer::new(config.quiz.clone(), &config.analysis)?
        .generate_quiz(&analysis, desired_questions);
    Ok(StudyMaterial { summary, quiz })
}
