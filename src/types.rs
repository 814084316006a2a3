// Core types and errors for studykit
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared media type of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Pdf,
    Image,
    Unknown,
}

impl MediaType {
    /// Sniff the media type from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if find_pdf_header(bytes).is_some() {
            MediaType::Pdf
        } else if image::guess_format(bytes).is_ok() {
            MediaType::Image
        } else {
            MediaType::Unknown
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => MediaType::Pdf,
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tif" | "tiff" | "webp" => MediaType::Image,
            _ => MediaType::Unknown,
        }
    }
}

/// Offset of `%PDF-` within the first KiB, if any. Some producers prepend junk.
pub fn find_pdf_header(bytes: &[u8]) -> Option<usize> {
    let window = &bytes[..bytes.len().min(1024)];
    window.windows(5).position(|w| w == b"%PDF-")
}

/// Raw bytes of one uploaded document. Immutable once fetched.
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Vec<u8>,
    media_type: MediaType,
    source: String,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, media_type: MediaType, source: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type,
            source: source.into(),
        }
    }

    /// Build a document whose media type is taken from its magic bytes.
    pub fn sniffed(bytes: Vec<u8>, source: impl Into<String>) -> Self {
        let media_type = MediaType::sniff(&bytes);
        Self::new(bytes, media_type, source)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Extractive study summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySummary {
    pub summary_text: String,
    pub key_points: Vec<String>,
    pub study_tips: Vec<String>,
}

/// Which analysis category a question was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Definition,
    Fact,
    Example,
    Process,
    Conceptual,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuestionKind::Definition => "definition",
            QuestionKind::Fact => "fact",
            QuestionKind::Example => "example",
            QuestionKind::Process => "process",
            QuestionKind::Conceptual => "conceptual",
        };
        f.write_str(name)
    }
}

/// A multiple-choice question. The option array is fixed at four entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub prompt_text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub options: [String; 4],
    pub correct_index: usize,
    pub explanation: String,
}

impl QuizQuestion {
    pub fn correct_answer(&self) -> &str {
        &self.options[self.correct_index]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyQuiz {
    pub questions: Vec<QuizQuestion>,
}

impl StudyQuiz {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Summary and quiz produced from one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyMaterial {
    pub summary: StudySummary,
    pub quiz: StudyQuiz,
}

/// Serializable category of an extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    EmptyDocument,
    OversizedDocument,
    UnsupportedFormat,
    NoExtractableText,
    StrategyUnavailable,
    InsufficientContent,
    ErrorEcho,
    StrategyPanicked,
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("document is empty")]
    EmptyDocument,

    #[error("document is {size} bytes, limit is {limit}")]
    OversizedDocument { size: usize, limit: usize },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("no extractable text: {0}")]
    NoExtractableText(String),

    #[error("strategy unavailable: {0}")]
    StrategyUnavailable(String),

    #[error("only {chars} characters extracted, need {minimum}")]
    InsufficientContent { chars: usize, minimum: usize },

    #[error("extracted text looks like an echoed error message")]
    ErrorEcho,

    #[error("strategy panicked: {0}")]
    StrategyPanicked(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractionError::EmptyDocument => FailureKind::EmptyDocument,
            ExtractionError::OversizedDocument { .. } => FailureKind::OversizedDocument,
            ExtractionError::UnsupportedFormat(_) | ExtractionError::Pdf(_) => {
                FailureKind::UnsupportedFormat
            }
            ExtractionError::NoExtractableText(_) => FailureKind::NoExtractableText,
            ExtractionError::StrategyUnavailable(_) => FailureKind::StrategyUnavailable,
            ExtractionError::InsufficientContent { .. } => FailureKind::InsufficientContent,
            ExtractionError::ErrorEcho => FailureKind::ErrorEcho,
            ExtractionError::StrategyPanicked(_) => FailureKind::StrategyPanicked,
            ExtractionError::Io(_) => FailureKind::Io,
        }
    }
}

/// Reasons text handed to `generate_study_material` should be refused by the host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StudyInputError {
    #[error("content is too short ({chars} characters, need {minimum})")]
    InsufficientContent { chars: usize, minimum: usize },

    #[error("content looks like an error message from a failed upstream step")]
    ErrorEcho,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid cue pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_pdf_with_leading_junk() {
        assert_eq!(MediaType::sniff(b"\r\n%PDF-1.7\n..."), MediaType::Pdf);
        assert_eq!(MediaType::sniff(b"hello world"), MediaType::Unknown);
    }

    #[test]
    fn test_sniff_png() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(MediaType::sniff(&png), MediaType::Image);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(MediaType::from_extension("PDF"), MediaType::Pdf);
        assert_eq!(MediaType::from_extension("jpeg"), MediaType::Image);
        assert_eq!(MediaType::from_extension("docx"), MediaType::Unknown);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ExtractionError::EmptyDocument.kind(), FailureKind::EmptyDocument);
        assert_eq!(
            ExtractionError::UnsupportedFormat("x".into()).kind(),
            FailureKind::UnsupportedFormat
        );
        assert_eq!(
            ExtractionError::InsufficientContent { chars: 3, minimum: 15 }.to_string(),
            "only 3 characters extracted, need 15"
        );
    }
}
