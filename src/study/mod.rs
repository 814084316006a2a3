// Study material engine - content analysis, summary and quiz synthesis
pub mod analyzer;
pub mod grading;
pub mod quiz;
pub mod summary;
pub mod validation;

pub use analyzer::{
    Complexity, ContentAnalysis, ContentAnalyzer, ContentInsights, CueSet, ReadingLevel,
};
pub use grading::{PerformanceLevel, QuestionResult, QuizGrade};
pub use quiz::QuizSynthesizer;
pub use summary::SummarySynthesizer;
pub use validation::validate_study_input;
