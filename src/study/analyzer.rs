// Content analyzer - sentence segmentation, key-term ranking and cue-based
// sentence classification
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

use crate::config::AnalysisConfig;
use crate::types::ConfigError;

/// Case-insensitive whole-word phrase matcher built from a cue list.
/// Cues keep their configured order so callers can prefer earlier ones.
#[derive(Debug, Clone)]
pub struct CueSet {
    patterns: Vec<Regex>,
}

impl CueSet {
    pub fn new(cues: &[String]) -> Result<Self, ConfigError> {
        let patterns = cues
            .iter()
            .map(|cue| cue.trim())
            .filter(|cue| !cue.is_empty())
            .map(|cue| {
                let words: Vec<String> = cue.split_whitespace().map(regex::escape).collect();
                Regex::new(&format!(r"(?i)\b{}\b", words.join(r"\s+")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    /// Split around the first occurrence of the earliest-listed cue that
    /// appears, returning (before, after) trimmed.
    pub fn split_first<'a>(&self, text: &'a str) -> Option<(&'a str, &'a str)> {
        self.patterns.iter().find_map(|p| {
            p.find(text)
                .map(|m| (text[..m.start()].trim(), text[m.end()..].trim()))
        })
    }
}

/// Sentences and key terms derived from one text. Every category keeps the
/// order sentences appear in; a sentence may land in several categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    pub sentences: Vec<String>,
    pub key_terms: Vec<String>,
    pub definitions: Vec<String>,
    pub facts: Vec<String>,
    pub examples: Vec<String>,
    pub processes: Vec<String>,
    pub concepts: Vec<String>,
}

impl ContentAnalysis {
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty() && self.key_terms.is_empty()
    }

    /// Counts per category plus rough complexity and reading level
    pub fn insights(&self, text: &str) -> ContentInsights {
        let chars = text.chars().count();
        let content_complexity = if chars > 2000 {
            Complexity::High
        } else if chars > 1000 {
            Complexity::Medium
        } else {
            Complexity::Basic
        };
        let reading_level = match self.concepts.len() {
            n if n > 10 => ReadingLevel::Advanced,
            n if n > 5 => ReadingLevel::Intermediate,
            _ => ReadingLevel::Beginner,
        };

        ContentInsights {
            key_terms_found: self.key_terms.len(),
            definitions_found: self.definitions.len(),
            facts_found: self.facts.len(),
            examples_found: self.examples.len(),
            processes_found: self.processes.len(),
            concepts_found: self.concepts.len(),
            content_complexity,
            reading_level,
            top_keywords: self.key_terms.iter().take(5).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    Basic,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadingLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentInsights {
    pub key_terms_found: usize,
    pub definitions_found: usize,
    pub facts_found: usize,
    pub examples_found: usize,
    pub processes_found: usize,
    pub concepts_found: usize,
    pub content_complexity: Complexity,
    pub reading_level: ReadingLevel,
    pub top_keywords: Vec<String>,
}

/// Stateless apart from its configuration; `analyze` is a pure function of the text.
#[derive(Debug, Clone)]
pub struct ContentAnalyzer {
    config: AnalysisConfig,
    stop_words: HashSet<String>,
    definition_cues: CueSet,
    example_cues: CueSet,
    process_cues: CueSet,
}

impl ContentAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            definition_cues: CueSet::new(&config.definition_cues)?,
            example_cues: CueSet::new(&config.example_cues)?,
            process_cues: CueSet::new(&config.process_cues)?,
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn analyze(&self, text: &str) -> ContentAnalysis {
        let sentences = split_sentences(text, self.config.min_sentence_chars);
        let key_terms = self.rank_key_terms(text);
        let key_set: HashSet<&str> = key_terms.iter().map(String::as_str).collect();

        let mut analysis = ContentAnalysis {
            key_terms: key_terms.clone(),
            ..ContentAnalysis::default()
        };

        for sentence in &sentences {
            let length = sentence.chars().count();
            let mentions_key_term = self.tokens(sentence).any(|t| key_set.contains(t.as_str()));
            let is_definition = self.definition_cues.is_match(sentence);
            let is_example = self.example_cues.is_match(sentence);
            let is_process = self.process_cues.is_match(sentence);

            if is_definition {
                analysis.definitions.push(sentence.clone());
            }
            if is_example {
                analysis.examples.push(sentence.clone());
            }
            if is_process {
                analysis.processes.push(sentence.clone());
            }
            if mentions_key_term
                && !sentence.contains('?')
                && (self.config.fact_min_chars..=self.config.fact_max_chars).contains(&length)
            {
                analysis.facts.push(sentence.clone());
            }
            if mentions_key_term && length >= self.config.concept_min_chars {
                analysis.concepts.push(sentence.clone());
            }
        }
        analysis.sentences = sentences;

        debug!(
            "Analyzed {} sentences: {} key terms, {} definitions, {} facts, {} examples, \
             {} processes, {} concepts",
            analysis.sentences.len(),
            analysis.key_terms.len(),
            analysis.definitions.len(),
            analysis.facts.len(),
            analysis.examples.len(),
            analysis.processes.len(),
            analysis.concepts.len()
        );
        analysis
    }

    /// Lowercase alphabetic tokens that are long enough and not stop words
    pub fn tokens<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty() && word.chars().all(char::is_alphabetic))
            .map(str::to_lowercase)
            .filter(move |word| {
                word.chars().count() >= self.config.min_token_chars
                    && !self.stop_words.contains(word)
            })
    }

    /// Descending frequency, ties broken by first occurrence
    fn rank_key_terms(&self, text: &str) -> Vec<String> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for (position, token) in self.tokens(text).enumerate() {
            counts.entry(token).or_insert((0, position)).0 += 1;
        }

        let mut ranked: Vec<(String, usize, usize)> = counts
            .into_iter()
            .map(|(term, (count, first))| (term, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked
            .into_iter()
            .take(self.config.key_term_limit)
            .map(|(term, _, _)| term)
            .collect()
    }
}

/// Split on runs of `.`, `!` or `?` followed by whitespace (or the end of the
/// text) and on blank lines. Whitespace inside a sentence collapses to single
/// spaces; bodies shorter than `min_chars` are noise and duplicates are dropped.
pub fn split_sentences(text: &str, min_chars: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut seen = HashSet::new();

    for paragraph in paragraphs(text) {
        let mut current = String::new();
        let mut chars = paragraph.chars().peekable();
        while let Some(c) = chars.next() {
            current.push(c);
            if matches!(c, '.' | '!' | '?') {
                match chars.peek() {
                    Some(next) if next.is_whitespace() => {
                        push_sentence(&mut sentences, &mut seen, &current, min_chars);
                        current.clear();
                    }
                    _ => {}
                }
            }
        }
        push_sentence(&mut sentences, &mut seen, &current, min_chars);
    }

    sentences
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join(" "));
    }
    blocks
}

fn push_sentence(
    sentences: &mut Vec<String>,
    seen: &mut HashSet<String>,
    raw: &str,
    min_chars: usize,
) {
    let sentence = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let body = sentence.trim_end_matches(['.', '!', '?']);
    if body.chars().count() < min_chars {
        return;
    }
    if seen.insert(sentence.clone()) {
        sentences.push(sentence);
    }
}
