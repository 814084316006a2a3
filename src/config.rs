// Configuration for studykit - every tunable threshold and word list lives here
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::ConfigError;

/// Environment variable pointing at a TOML config file.
pub const CONFIG_ENV_VAR: &str = "STUDYKIT_CONFIG";

/// Top-level configuration, one table per subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub extraction: ExtractionConfig,
    pub analysis: AnalysisConfig,
    pub summary: SummaryConfig,
    pub quiz: QuizConfig,
}

impl StudyConfig {
    /// Parse a TOML file. Missing keys fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve configuration the way the CLI does: `$STUDYKIT_CONFIG`, then
    /// `<config dir>/studykit/config.toml`, then built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            debug!("Loading config from ${}: {}", CONFIG_ENV_VAR, path);
            return Self::from_file(path);
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                debug!("Loading config from {}", path.display());
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("studykit").join("config.toml"))
}

/// Extraction pipeline limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum trimmed character count for a result to be acceptable.
    pub min_text_chars: usize,
    /// Page cap for the structural parse.
    pub max_pages: usize,
    /// Page cap for positional reconstruction.
    pub max_positional_pages: usize,
    /// Vertical movement (in points) that starts a new line.
    pub line_break_delta: f32,
    /// Maximum number of `BT ... ET` segments the raw scan reads.
    pub max_raw_segments: usize,
    /// Raw-scan string fragments shorter than this are dropped.
    pub raw_token_min_chars: usize,
    /// Raw-scan output below this quality score is rejected.
    pub raw_min_quality: f32,
    /// Documents larger than this are rejected before any strategy runs.
    pub max_document_bytes: usize,
    /// Maximum number of embedded images handed to the OCR delegate.
    pub max_ocr_images: usize,
    /// Upper bound on inflated stream size during the raw scan.
    pub max_inflated_bytes: usize,
    /// Phrases that mark text as an echoed error message rather than content.
    pub error_echo_markers: Vec<String>,
    /// Error echoes are short; longer text is never treated as one.
    pub echo_max_chars: usize,
    /// A command-line OCR engine is killed after this long on one image.
    pub ocr_timeout_secs: u64,
    /// Wall-clock limit the CLI puts on a whole extraction.
    pub extraction_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 15,
            max_pages: 20,
            max_positional_pages: 15,
            line_break_delta: 5.0,
            max_raw_segments: 50,
            raw_token_min_chars: 3,
            raw_min_quality: 0.6,
            max_document_bytes: 50 * 1024 * 1024,
            max_ocr_images: 4,
            max_inflated_bytes: 8 * 1024 * 1024,
            error_echo_markers: to_strings(&[
                "unable to extract text",
                "text extraction failed",
                "failed to extract",
                "pdf parsing failed",
                "api access denied",
                "an error occurred",
                "please try again",
                "error:",
            ]),
            echo_max_chars: 500,
            ocr_timeout_secs: 60,
            extraction_timeout_secs: 300,
        }
    }
}

/// Content analysis word lists and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub min_sentence_chars: usize,
    pub min_token_chars: usize,
    pub key_term_limit: usize,
    pub stop_words: Vec<String>,
    /// Checked in order; multi-word cues come first so the definition split
    /// prefers "defined as" over a bare "is".
    pub definition_cues: Vec<String>,
    pub example_cues: Vec<String>,
    pub process_cues: Vec<String>,
    pub fact_min_chars: usize,
    pub fact_max_chars: usize,
    pub concept_min_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_sentence_chars: 15,
            min_token_chars: 3,
            key_term_limit: 15,
            stop_words: to_strings(&[
                "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her",
                "was", "one", "our", "out", "day", "get", "has", "him", "his", "how", "man",
                "new", "now", "old", "see", "two", "way", "who", "boy", "did", "its", "let",
                "put", "say", "she", "too", "use", "may", "come", "than", "into", "very",
                "what", "know", "just", "first", "also", "your", "work", "life", "only",
                "over", "think", "where", "after", "back", "other", "many", "time", "would",
                "there", "could", "more", "been", "were", "said", "with", "this", "that",
                "these", "those", "have", "does", "will", "should", "might", "from", "they",
                "them", "their", "which", "when", "then", "each", "such", "some",
            ]),
            definition_cues: to_strings(&[
                "defined as",
                "refers to",
                "known as",
                "means",
                "called",
                "is",
                "are",
            ]),
            example_cues: to_strings(&[
                "for example",
                "for instance",
                "such as",
                "example",
                "examples",
                "including",
                "include",
                "like",
            ]),
            process_cues: to_strings(&[
                "step",
                "steps",
                "process",
                "processes",
                "method",
                "methods",
                "approach",
                "technique",
                "techniques",
                "procedure",
                "algorithm",
                "algorithms",
            ]),
            fact_min_chars: 31,
            fact_max_chars: 199,
            concept_min_chars: 41,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Text shorter than this gets the generic fallback summary.
    pub min_content_chars: usize,
    pub lede_sentences: usize,
    pub middle_sentences: usize,
    pub closing_sentences: usize,
    pub review_points: Vec<String>,
    pub study_tips: Vec<String>,
    pub fallback_summary: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            min_content_chars: 50,
            lede_sentences: 3,
            middle_sentences: 2,
            closing_sentences: 2,
            review_points: to_strings(&[
                "Review the fundamental principles regularly",
                "Practice applying concepts to real scenarios",
                "Connect new information to existing knowledge",
                "Test understanding through active recall",
            ]),
            study_tips: to_strings(&[
                "Break the content into smaller, manageable sections",
                "Use active recall techniques while studying",
                "Create visual aids or mind maps for complex topics",
                "Practice explaining concepts in your own words",
                "Review regularly using spaced repetition",
            ]),
            fallback_summary: "This content covers important concepts and provides valuable \
                information for study purposes. The material includes key definitions, \
                explanations, and practical applications that are essential for \
                understanding the subject matter."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Correct-answer text is cut to this many characters (plus an ellipsis).
    pub option_max_chars: usize,
    pub explanation_max_chars: usize,
    /// When false the correct answer always sits at index 0.
    pub shuffle_options: bool,
    pub shuffle_seed: u64,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            option_max_chars: 80,
            explanation_max_chars: 120,
            shuffle_options: false,
            shuffle_seed: 0,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
