// Quiz synthesis - one generator per analysis category, templated distractors
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use tracing::{debug, instrument};

use super::analyzer::{ContentAnalysis, CueSet};
use crate::config::{AnalysisConfig, QuizConfig};
use crate::types::{ConfigError, QuestionKind, QuizQuestion, StudyQuiz};

const DEFINITION_DISTRACTORS: [&str; 2] = [
    "A general term without specific technical meaning",
    "An outdated approach that has been replaced by modern methods",
];
const FACT_DISTRACTORS: [&str; 3] = [
    "This statement contradicts the information provided in the content",
    "This represents a common misconception about the topic",
    "This is partially correct but missing key details mentioned",
];
const EXAMPLE_DISTRACTORS: [&str; 3] = [
    "A theoretical concept without practical real-world applications",
    "An example from a different field not discussed in the content",
    "A historical reference that is no longer relevant today",
];
const PROCESS_DISTRACTORS: [&str; 3] = [
    "A random approach without systematic methodology or structure",
    "An inefficient method that wastes time and resources",
    "A theoretical framework without practical implementation steps",
];
const CONCEPTUAL_DISTRACTORS: [&str; 3] = [
    "They represent completely separate and unrelated concepts",
    "One is significantly more important than the other in all contexts",
    "They are mentioned only briefly without detailed explanation",
];

// Longest subject phrase taken from before a definition cue
const MAX_SUBJECT_WORDS: usize = 4;

/// Builds multiple-choice quizzes from a [`ContentAnalysis`]. Holds no state
/// between calls.
#[derive(Debug, Clone)]
pub struct QuizSynthesizer {
    config: QuizConfig,
    definition_cues: CueSet,
}

/// Bookkeeping for one quiz under construction
struct QuizDraft<'a> {
    analysis: &'a ContentAnalysis,
    questions: Vec<QuizQuestion>,
    prompts: HashSet<String>,
    used_sources: HashSet<&'a str>,
}

impl<'a> QuizDraft<'a> {
    fn new(analysis: &'a ContentAnalysis) -> Self {
        Self {
            analysis,
            questions: Vec::new(),
            prompts: HashSet::new(),
            used_sources: HashSet::new(),
        }
    }

    fn is_fresh(&self, source: &str) -> bool {
        !self.used_sources.contains(source)
    }

    fn push(&mut self, source: &'a str, question: QuizQuestion) {
        self.used_sources.insert(source);
        self.prompts.insert(question.prompt_text.clone());
        self.questions.push(question);
    }
}

type Generator = for<'a> fn(&QuizSynthesizer, &QuizDraft<'a>) -> Option<(&'a str, QuizQuestion)>;

impl QuizSynthesizer {
    pub fn new(config: QuizConfig, analysis_config: &AnalysisConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            config,
            definition_cues: CueSet::new(&analysis_config.definition_cues)?,
        })
    }

    /// Up to `desired` questions, never more than the analysis supports.
    /// Prompts are unique and every question has exactly four options.
    #[instrument(skip_all, fields(desired = desired))]
    pub fn generate_quiz(&self, analysis: &ContentAnalysis, desired: usize) -> StudyQuiz {
        let generators: [(QuestionKind, Generator); 5] = [
            (QuestionKind::Definition, Self::definition_question),
            (QuestionKind::Fact, Self::plain_fact_question),
            (QuestionKind::Example, Self::example_question),
            (QuestionKind::Process, Self::process_question),
            (QuestionKind::Conceptual, Self::conceptual_question),
        ];

        let mut draft = QuizDraft::new(analysis);
        for (kind, generator) in generators {
            if draft.questions.len() >= desired {
                break;
            }
            match generator(self, &draft) {
                Some((source, question)) => draft.push(source, question),
                None => debug!("No source material for a {} question", kind),
            }
        }

        // Top up with further fact questions until the pool runs dry
        while draft.questions.len() < desired {
            match self.fact_question(&draft) {
                Some((source, question)) => draft.push(source, question),
                None => break,
            }
        }

        let mut questions = draft.questions;
        if self.config.shuffle_options {
            let mut rng = StdRng::seed_from_u64(self.config.shuffle_seed);
            for question in &mut questions {
                shuffle_options(question, &mut rng);
            }
        }

        debug!("Generated {} of {} requested questions", questions.len(), desired);
        StudyQuiz { questions }
    }

    fn definition_question<'a>(&self, draft: &QuizDraft<'a>) -> Option<(&'a str, QuizQuestion)> {
        let analysis = draft.analysis;
        analysis
            .definitions
            .iter()
            .filter(|s| draft.is_fresh(s))
            .find_map(|sentence| {
                let (before, after) = self.definition_cues.split_first(sentence)?;
                let subject = definition_subject(before)?;
                let meaning = strip_terminal(after);
                if meaning.is_empty() {
                    return None;
                }
                let prompt = format!("According to the content, what is {}?", subject);
                if draft.prompts.contains(&prompt) {
                    return None;
                }

                let other = analysis
                    .key_terms
                    .get(1)
                    .map(|t| capitalize(t))
                    .unwrap_or_else(|| "Another concept".to_string());
                let question = QuizQuestion {
                    prompt_text: prompt,
                    kind: QuestionKind::Definition,
                    options: [
                        truncate(meaning, self.config.option_max_chars),
                        DEFINITION_DISTRACTORS[0].to_string(),
                        format!("{} that serves a different purpose entirely", other),
                        DEFINITION_DISTRACTORS[1].to_string(),
                    ],
                    correct_index: 0,
                    explanation: format!(
                        "The content clearly defines {} as: {}",
                        subject,
                        truncate(meaning, self.config.explanation_max_chars)
                    ),
                };
                Some((sentence.as_str(), question))
            })
    }

    /// Fact question for the category pass. Sentences that also carry a
    /// definition, example or process cue are left to those generators.
    fn plain_fact_question<'a>(&self, draft: &QuizDraft<'a>) -> Option<(&'a str, QuizQuestion)> {
        self.fact_from(draft, true)
    }

    /// Fact question for the top-up loop, drawing on every fact sentence.
    fn fact_question<'a>(&self, draft: &QuizDraft<'a>) -> Option<(&'a str, QuizQuestion)> {
        self.fact_from(draft, false)
    }

    /// Each fact question names a key term found in its sentence, so repeated
    /// fact questions get distinct prompts.
    fn fact_from<'a>(
        &self,
        draft: &QuizDraft<'a>,
        plain_only: bool,
    ) -> Option<(&'a str, QuizQuestion)> {
        let analysis = draft.analysis;
        analysis
            .facts
            .iter()
            .filter(|s| draft.is_fresh(s))
            .filter(|s| !plain_only || !has_cue_category(analysis, s))
            .find_map(|sentence| {
                let lower = sentence.to_lowercase();
                let words: HashSet<&str> = lower
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                    .collect();
                let (term, prompt) = analysis
                    .key_terms
                    .iter()
                    .filter(|term| words.contains(term.as_str()))
                    .map(|term| {
                        let prompt =
                            format!("Which statement about {} is supported by the content?", term);
                        (term, prompt)
                    })
                    .find(|(_, prompt)| !draft.prompts.contains(prompt))?;

                let question = QuizQuestion {
                    prompt_text: prompt,
                    kind: QuestionKind::Fact,
                    options: with_distractors(
                        truncate(strip_terminal(sentence), self.config.option_max_chars),
                        &FACT_DISTRACTORS,
                    ),
                    correct_index: 0,
                    explanation: format!(
                        "The content specifically provides this information about {}.",
                        term
                    ),
                };
                Some((sentence.as_str(), question))
            })
    }

    fn example_question<'a>(&self, draft: &QuizDraft<'a>) -> Option<(&'a str, QuizQuestion)> {
        let analysis = draft.analysis;
        self.templated_question(
            draft,
            &analysis.examples,
            QuestionKind::Example,
            "Which example or application is mentioned in the content?",
            &EXAMPLE_DISTRACTORS,
            "The content provides this as a specific example or practical application.",
        )
    }

    fn process_question<'a>(&self, draft: &QuizDraft<'a>) -> Option<(&'a str, QuizQuestion)> {
        let analysis = draft.analysis;
        self.templated_question(
            draft,
            &analysis.processes,
            QuestionKind::Process,
            "What process or methodology is described in the content?",
            &PROCESS_DISTRACTORS,
            "The content outlines this specific process or methodology.",
        )
    }

    /// Relation between the two top key terms, backed by a concept sentence
    /// that mentions both.
    fn conceptual_question<'a>(&self, draft: &QuizDraft<'a>) -> Option<(&'a str, QuizQuestion)> {
        let analysis = draft.analysis;
        let (first, second) = match analysis.key_terms.as_slice() {
            [a, b, ..] => (a, b),
            _ => return None,
        };
        let prompt = format!("How are {} and {} related in this content?", first, second);
        if draft.prompts.contains(&prompt) {
            return None;
        }

        let sentence = analysis.concepts.iter().filter(|s| draft.is_fresh(s)).find(|s| {
            let lower = s.to_lowercase();
            let words: HashSet<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
            words.contains(first.as_str()) && words.contains(second.as_str())
        })?;

        let question = QuizQuestion {
            prompt_text: prompt,
            kind: QuestionKind::Conceptual,
            options: with_distractors(
                truncate(strip_terminal(sentence), self.config.option_max_chars),
                &CONCEPTUAL_DISTRACTORS,
            ),
            correct_index: 0,
            explanation: format!(
                "The content demonstrates how {} and {} are interconnected and complement each other.",
                first, second
            ),
        };
        Some((sentence.as_str(), question))
    }

    fn templated_question<'a>(
        &self,
        draft: &QuizDraft<'a>,
        pool: &'a [String],
        kind: QuestionKind,
        prompt: &str,
        distractors: &[&str; 3],
        explanation: &str,
    ) -> Option<(&'a str, QuizQuestion)> {
        if draft.prompts.contains(prompt) {
            return None;
        }
        let sentence = pool.iter().find(|s| draft.is_fresh(s))?;
        let question = QuizQuestion {
            prompt_text: prompt.to_string(),
            kind,
            options: with_distractors(
                truncate(strip_terminal(sentence), self.config.option_max_chars),
                distractors,
            ),
            correct_index: 0,
            explanation: explanation.to_string(),
        };
        Some((sentence.as_str(), question))
    }
}

fn has_cue_category(analysis: &ContentAnalysis, sentence: &str) -> bool {
    analysis
        .definitions
        .iter()
        .chain(&analysis.examples)
        .chain(&analysis.processes)
        .any(|s| s == sentence)
}

fn with_distractors(correct: String, distractors: &[&str; 3]) -> [String; 4] {
    [
        correct,
        distractors[0].to_string(),
        distractors[1].to_string(),
        distractors[2].to_string(),
    ]
}

/// Permute the options and follow the correct answer to its new slot
fn shuffle_options(question: &mut QuizQuestion, rng: &mut StdRng) {
    let mut order = [0usize, 1, 2, 3];
    order.shuffle(rng);
    let original = question.options.clone();
    question.options = order.map(|i| original[i].clone());
    question.correct_index = order
        .iter()
        .position(|&i| i == question.correct_index)
        .unwrap_or(question.correct_index);
}

/// Subject of a definition: the clause after the last comma, without a
/// trailing copula, at most a few words long.
fn definition_subject(before_cue: &str) -> Option<String> {
    let clause = before_cue.rsplit(',').next().unwrap_or(before_cue);
    let mut words: Vec<&str> = clause.split_whitespace().collect();
    while let Some(last) = words.last() {
        if matches!(last.to_lowercase().as_str(), "is" | "are" | "was" | "were") {
            words.pop();
        } else {
            break;
        }
    }
    let start = words.len().saturating_sub(MAX_SUBJECT_WORDS);
    let subject = words[start..].join(" ");
    let subject = subject.trim_matches(|c: char| !c.is_alphanumeric());
    (!subject.is_empty()).then(|| subject.to_string())
}

fn strip_terminal(sentence: &str) -> &str {
    sentence.trim().trim_end_matches(['.', '!', '?']).trim_end()
}

/// Cut to `max_chars` characters, appending "..." only when something was cut
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
