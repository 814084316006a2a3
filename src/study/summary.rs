// Extractive summary - lede, middle and closing sentences plus templated key points
use std::collections::HashSet;
use tracing::{debug, instrument};

use super::analyzer::ContentAnalysis;
use crate::config::SummaryConfig;
use crate::types::StudySummary;

#[derive(Debug, Clone, Default)]
pub struct SummarySynthesizer {
    config: SummaryConfig,
}

impl SummarySynthesizer {
    pub fn new(config: SummaryConfig) -> Self {
        Self { config }
    }

    /// The summary only ever reuses source sentences; short or sentence-less
    /// input gets the configured fallback text instead.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn summarize(&self, text: &str, analysis: &ContentAnalysis) -> StudySummary {
        let sentences = &analysis.sentences;
        let too_short = text.trim().chars().count() < self.config.min_content_chars;
        let summary_text = if too_short || sentences.is_empty() {
            debug!("Content too short for an extractive summary, using fallback");
            self.config.fallback_summary.clone()
        } else {
            self.excerpt(sentences)
        };

        StudySummary {
            summary_text,
            key_points: self.key_points(&analysis.key_terms),
            study_tips: self.config.study_tips.clone(),
        }
    }

    fn excerpt(&self, sentences: &[String]) -> String {
        let total = sentences.len();
        let lede_end = self.config.lede_sentences.min(total);
        let closing_start = total.saturating_sub(self.config.closing_sentences).max(lede_end);
        let middle_end = (lede_end + self.config.middle_sentences).min(closing_start);

        let mut seen = HashSet::new();
        sentences[..lede_end]
            .iter()
            .chain(&sentences[lede_end..middle_end])
            .chain(&sentences[closing_start..])
            .filter(|s| seen.insert(s.as_str()))
            .map(|s| with_terminal_punctuation(s))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn key_points(&self, key_terms: &[String]) -> Vec<String> {
        let mut points = Vec::new();
        let groups = [
            ("Main focus: ", 0..2, " and "),
            ("Key concepts include: ", 2..4, ", "),
            ("Important topics: ", 4..6, " and "),
        ];
        for (label, range, separator) in groups {
            let terms = key_terms.get(range.start..range.end.min(key_terms.len()));
            if let Some(terms) = terms.filter(|t| !t.is_empty()) {
                points.push(format!("{}{}", label, terms.join(separator)));
            }
        }
        points.extend(self.config.review_points.iter().cloned());
        points
    }
}

fn with_terminal_punctuation(sentence: &str) -> String {
    if sentence.ends_with(['.', '!', '?']) {
        sentence.to_string()
    } else {
        format!("{}.", sentence)
    }
}
