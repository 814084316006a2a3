// Extraction coordinator - runs strategies in priority order until one
// produces acceptable text, otherwise explains why none did
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::document_analyzer::{DocumentAnalyzer, DocumentClass};
use super::ocr_delegate::{OcrDelegate, OcrProvider};
use super::positional::PositionalReconstruction;
use super::raw_scan::RawPatternScan;
use super::strategy::{ExtractionStrategy, StrategyOutput};
use super::structural::StructuralParse;
use super::text_quality::{calculate_quality_score, is_error_echo};
use crate::config::ExtractionConfig;
use crate::types::{ExtractionError, FailureKind, RawDocument};

/// Outcome of one coordinator run. A failed result never carries text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub text: String,
    pub strategy_name: Option<String>,
    pub succeeded: bool,
    pub quality_score: f32,
    pub pages_processed: usize,
    pub elapsed_ms: u64,
    pub diagnostic: Option<ExtractionDiagnostic>,
}

impl ExtractionResult {
    fn success(strategy: &str, output: StrategyOutput, elapsed_ms: u64) -> Self {
        Self {
            quality_score: calculate_quality_score(&output.text),
            text: output.text,
            strategy_name: Some(strategy.to_string()),
            succeeded: true,
            pages_processed: output.pages_processed,
            elapsed_ms,
            diagnostic: None,
        }
    }

    fn failure(diagnostic: ExtractionDiagnostic, elapsed_ms: u64) -> Self {
        Self {
            text: String::new(),
            strategy_name: None,
            succeeded: false,
            quality_score: 0.0,
            pages_processed: 0,
            elapsed_ms,
            diagnostic: Some(diagnostic),
        }
    }

    /// Succeeded, long enough, and not an echoed error message.
    pub fn is_acceptable(&self, config: &ExtractionConfig) -> bool {
        self.succeeded
            && self.text.trim().chars().count() >= config.min_text_chars
            && !is_error_echo(&self.text, &config.error_echo_markers, config.echo_max_chars)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.diagnostic.as_ref().map(|d| d.failure)
    }
}

/// Why extraction failed, per strategy and overall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionDiagnostic {
    pub failure: FailureKind,
    pub classification: DocumentClass,
    pub attempts: Vec<StrategyAttempt>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAttempt {
    pub strategy: String,
    pub kind: FailureKind,
    pub reason: String,
    pub elapsed_ms: u64,
    /// The strategy was unavailable and never ran
    pub skipped: bool,
}

pub struct ExtractionCoordinator {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    config: ExtractionConfig,
}

impl ExtractionCoordinator {
    /// Default priority order: structural parse, positional reconstruction, raw scan
    pub fn new(config: ExtractionConfig) -> Self {
        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(StructuralParse::new(&config)),
            Box::new(PositionalReconstruction::new(&config)),
            Box::new(RawPatternScan::new(&config)),
        ];
        Self { strategies, config }
    }

    pub fn with_strategies(
        config: ExtractionConfig,
        strategies: Vec<Box<dyn ExtractionStrategy>>,
    ) -> Self {
        Self { strategies, config }
    }

    /// Append the OCR delegate as the lowest-priority strategy
    pub fn with_ocr(mut self, provider: Arc<dyn OcrProvider>) -> Self {
        let delegate = OcrDelegate::new(provider, &self.config);
        self.strategies.push(Box::new(delegate));
        self
    }

    pub fn push_strategy(&mut self, strategy: Box<dyn ExtractionStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Never panics and never returns an error; failures come back as data.
    #[instrument(skip_all, fields(source = doc.source(), bytes = doc.len()))]
    pub fn extract(&self, doc: &RawDocument) -> ExtractionResult {
        let started = Instant::now();

        if doc.is_empty() {
            return self.fail_early(ExtractionError::EmptyDocument, DocumentClass::Empty, started);
        }
        if doc.len() > self.config.max_document_bytes {
            let error = ExtractionError::OversizedDocument {
                size: doc.len(),
                limit: self.config.max_document_bytes,
            };
            return self.fail_early(error, DocumentClass::Oversized, started);
        }

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let name = strategy.name();
            let attempt_started = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| strategy.attempt(doc)))
                .unwrap_or_else(|payload| {
                    Err(ExtractionError::StrategyPanicked(panic_message(payload)))
                })
                .and_then(|output| self.accept(output));
            let elapsed_ms = attempt_started.elapsed().as_millis() as u64;

            match outcome {
                Ok(output) => {
                    info!(
                        "{} succeeded: {} characters in {}ms",
                        name,
                        output.text.chars().count(),
                        elapsed_ms
                    );
                    return ExtractionResult::success(name, output, elapsed(started));
                }
                Err(error) => {
                    let skipped = matches!(error, ExtractionError::StrategyUnavailable(_));
                    if skipped {
                        debug!("{} skipped: {}", name, error);
                    } else {
                        warn!("{} failed after {}ms: {}", name, elapsed_ms, error);
                    }
                    attempts.push(StrategyAttempt {
                        strategy: name.to_string(),
                        kind: error.kind(),
                        reason: error.to_string(),
                        elapsed_ms,
                        skipped,
                    });
                }
            }
        }

        let inspection = DocumentAnalyzer::new(&self.config).inspect(doc);
        let class = inspection.classification;
        warn!("All {} strategies failed; document classified as {}", attempts.len(), class);

        let diagnostic = ExtractionDiagnostic {
            failure: class.failure_kind(),
            classification: class,
            attempts,
            suggestions: inspection.recommendations,
        };
        ExtractionResult::failure(diagnostic, elapsed(started))
    }

    /// Trim and check a strategy's output against the acceptability rules
    fn accept(&self, output: StrategyOutput) -> Result<StrategyOutput, ExtractionError> {
        let text = output.text.trim();
        let chars = text.chars().count();
        if chars < self.config.min_text_chars {
            return Err(ExtractionError::InsufficientContent {
                chars,
                minimum: self.config.min_text_chars,
            });
        }
        if is_error_echo(text, &self.config.error_echo_markers, self.config.echo_max_chars) {
            return Err(ExtractionError::ErrorEcho);
        }
        Ok(StrategyOutput::new(text.to_string(), output.pages_processed))
    }

    fn fail_early(
        &self,
        error: ExtractionError,
        class: DocumentClass,
        started: Instant,
    ) -> ExtractionResult {
        warn!("Rejected before any strategy ran: {}", error);
        let diagnostic = ExtractionDiagnostic {
            failure: error.kind(),
            classification: class,
            attempts: Vec::new(),
            suggestions: class.suggestions(),
        };
        ExtractionResult::failure(diagnostic, elapsed(started))
    }
}

fn elapsed(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
