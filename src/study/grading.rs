// Quiz grading
use serde::{Deserialize, Serialize};

use crate::types::StudyQuiz;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl PerformanceLevel {
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            p if p >= 80 => PerformanceLevel::Excellent,
            p if p >= 60 => PerformanceLevel::Good,
            p if p >= 40 => PerformanceLevel::Fair,
            _ => PerformanceLevel::NeedsImprovement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub selected_index: Option<usize>,
    pub correct_index: usize,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizGrade {
    pub score: usize,
    pub total_questions: usize,
    pub percentage: u32,
    pub performance: PerformanceLevel,
    pub results: Vec<QuestionResult>,
}

impl StudyQuiz {
    /// Grade one attempt. `answers[i]` is the option chosen for question `i`;
    /// missing or `None` answers count as wrong.
    pub fn grade(&self, answers: &[Option<usize>]) -> QuizGrade {
        let results: Vec<QuestionResult> = self
            .questions
            .iter()
            .enumerate()
            .map(|(i, question)| {
                let selected_index = answers.get(i).copied().flatten();
                QuestionResult {
                    selected_index,
                    correct_index: question.correct_index,
                    is_correct: selected_index == Some(question.correct_index),
                    explanation: question.explanation.clone(),
                }
            })
            .collect();

        let score = results.iter().filter(|r| r.is_correct).count();
        let total_questions = results.len();
        let percentage = if total_questions == 0 {
            0
        } else {
            ((score as f64 / total_questions as f64) * 100.0).round() as u32
        };

        QuizGrade {
            score,
            total_questions,
            percentage,
            performance: PerformanceLevel::from_percentage(percentage),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(PerformanceLevel::from_percentage(100), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_percentage(80), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_percentage(67), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_percentage(40), PerformanceLevel::Fair);
        assert_eq!(PerformanceLevel::from_percentage(39), PerformanceLevel::NeedsImprovement);
    }

    #[test]
    fn test_empty_quiz() {
        let grade = StudyQuiz::default().grade(&[Some(0)]);
        assert_eq!(grade.percentage, 0);
        assert_eq!(grade.total_questions, 0);
        assert_eq!(grade.performance, PerformanceLevel::NeedsImprovement);
    }
}
