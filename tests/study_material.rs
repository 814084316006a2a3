// Study engine - analysis, summary and quiz behaviour on realistic passages
use rstest::rstest;
use std::collections::HashSet;

use studykit::study::PerformanceLevel;
use studykit::{
    generate_study_material, validate_study_input, AnalysisConfig, ContentAnalyzer, QuestionKind,
    QuizConfig, QuizSynthesizer, StudyConfig, StudyInputError, SummarySynthesizer,
};

const PHOTOSYNTHESIS: &str =
    "Photosynthesis is defined as the conversion of light energy into chemical energy. \
    For example, plants use sunlight to produce glucose. The process involves three steps.";

const CELL_BIOLOGY: &str = "The cell is the basic unit of life in every living organism.\n\n\
    Mitochondria produce most of the chemical energy that a cell needs to survive. \
    Ribosomes assemble proteins by linking amino acids in a precise order. \
    Examples of organelles include the nucleus, the mitochondria and the ribosomes. \
    Mitosis follows a process with several distinct steps called phases.\n\n\
    Mitochondria and ribosomes both depend on instructions stored in the nucleus of the cell. \
    Scientists still study how mitochondria evolved from ancient free living bacteria.";

fn analyzer() -> ContentAnalyzer {
    ContentAnalyzer::new(AnalysisConfig::default()).unwrap()
}

fn quiz_synthesizer() -> QuizSynthesizer {
    QuizSynthesizer::new(QuizConfig::default(), &AnalysisConfig::default()).unwrap()
}

#[test]
fn test_one_question_per_category() {
    let analysis = analyzer().analyze(PHOTOSYNTHESIS);
    assert_eq!(analysis.definitions.len(), 1);
    assert_eq!(analysis.examples.len(), 1);
    assert_eq!(analysis.processes.len(), 1);
    // Every sentence is also a fact, but the category pass leaves cue sentences to their own kind
    assert_eq!(analysis.facts.len(), 3);
    assert!(analysis.facts.iter().all(|fact| {
        analysis.definitions.contains(fact)
            || analysis.examples.contains(fact)
            || analysis.processes.contains(fact)
    }));

    let quiz = quiz_synthesizer().generate_quiz(&analysis, 3);
    let kinds: Vec<_> = quiz.questions.iter().map(|q| q.kind).collect();
    assert_eq!(
        kinds,
        vec![QuestionKind::Definition, QuestionKind::Example, QuestionKind::Process]
    );
    assert_eq!(
        quiz.questions[0].correct_answer(),
        "the conversion of light energy into chemical energy"
    );
}

#[test]
fn test_cue_free_text_yields_only_fact_questions() {
    let text = "Frozen water forms solid ice in winter. \
                Boiling water releases invisible steam into the air. \
                Glaciers hold huge amounts of fresh water near the poles.";
    let analysis = analyzer().analyze(text);
    assert!(analysis.definitions.is_empty());
    assert!(analysis.examples.is_empty());
    assert!(analysis.processes.is_empty());
    assert_eq!(analysis.facts.len(), 3);

    let quiz = quiz_synthesizer().generate_quiz(&analysis, 5);
    assert_eq!(quiz.len(), 3);
    assert!(quiz.questions.iter().all(|q| q.kind == QuestionKind::Fact));
}

#[test]
fn test_empty_text_analyzes_to_nothing() {
    let analysis = analyzer().analyze("");
    assert!(analysis.is_empty());
    assert!(analysis.key_terms.is_empty());
    assert!(quiz_synthesizer().generate_quiz(&analysis, 5).is_empty());
}

#[test]
fn test_analysis_is_repeatable() {
    let analyzer = analyzer();
    assert_eq!(analyzer.analyze(CELL_BIOLOGY), analyzer.analyze(CELL_BIOLOGY));
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(5)]
#[case(12)]
fn test_quiz_shape(#[case] desired: usize) {
    let analysis = analyzer().analyze(CELL_BIOLOGY);
    let quiz = quiz_synthesizer().generate_quiz(&analysis, desired);

    assert!(quiz.len() <= desired);
    assert!(!quiz.is_empty());

    let prompts: HashSet<_> = quiz.questions.iter().map(|q| q.prompt_text.as_str()).collect();
    assert_eq!(prompts.len(), quiz.len());

    for question in &quiz.questions {
        assert_eq!(question.options.len(), 4);
        assert!(question.correct_index < 4);
        assert!(!question.correct_answer().is_empty());
        assert!(!question.explanation.is_empty());
    }
}

#[test]
fn test_key_terms_rank_by_frequency() {
    let analysis = analyzer().analyze(CELL_BIOLOGY);
    assert_eq!(analysis.key_terms[0], "mitochondria");
    assert!(analysis.key_terms.len() <= AnalysisConfig::default().key_term_limit);
    assert!(!analysis.key_terms.iter().any(|t| t == "the" || t == "and"));
}

#[test]
fn test_summary_reuses_source_sentences() {
    let analysis = analyzer().analyze(CELL_BIOLOGY);
    let summary = SummarySynthesizer::default().summarize(CELL_BIOLOGY, &analysis);

    assert!(summary.summary_text.starts_with("The cell is the basic unit of life"));
    assert!(summary.key_points[0].starts_with("Main focus: "));
    assert!(!summary.study_tips.is_empty());
}

#[test]
fn test_short_text_gets_fallback_summary() {
    let text = "Cells divide.";
    let analysis = analyzer().analyze(text);
    let summary = SummarySynthesizer::default().summarize(text, &analysis);
    assert_eq!(summary.summary_text, StudyConfig::default().summary.fallback_summary);
}

#[test]
fn test_generate_study_material() {
    let material = generate_study_material(CELL_BIOLOGY, 4, &StudyConfig::default()).unwrap();
    assert_eq!(material.quiz.len(), 4);
    assert!(!material.summary.summary_text.is_empty());

    let json = serde_json::to_value(&material).unwrap();
    assert!(json["summary"]["summaryText"].is_string());
    assert!(json["quiz"]["questions"][0]["promptText"].is_string());
    assert!(json["quiz"]["questions"][0]["type"].is_string());
}

#[test]
fn test_grading_an_attempt() {
    let material = generate_study_material(PHOTOSYNTHESIS, 3, &StudyConfig::default()).unwrap();
    let quiz = material.quiz;
    let mut answers: Vec<Option<usize>> =
        quiz.questions.iter().map(|q| Some(q.correct_index)).collect();

    let perfect = quiz.grade(&answers);
    assert_eq!(perfect.score, 3);
    assert_eq!(perfect.percentage, 100);
    assert_eq!(perfect.performance, PerformanceLevel::Excellent);

    answers[0] = Some((quiz.questions[0].correct_index + 1) % 4);
    answers[1] = None;
    let partial = quiz.grade(&answers);
    assert_eq!(partial.score, 1);
    assert_eq!(partial.percentage, 33);
    assert_eq!(partial.performance, PerformanceLevel::NeedsImprovement);
    assert!(!partial.results[0].is_correct);
    assert_eq!(partial.results[1].selected_index, None);
}

#[test]
fn test_seeded_shuffle_keeps_correct_answer() {
    let config = QuizConfig {
        shuffle_options: true,
        shuffle_seed: 9,
        ..QuizConfig::default()
    };
    let analysis = analyzer().analyze(CELL_BIOLOGY);
    let plain = quiz_synthesizer().generate_quiz(&analysis, 5);
    let shuffled = QuizSynthesizer::new(config, &AnalysisConfig::default())
        .unwrap()
        .generate_quiz(&analysis, 5);

    assert_eq!(plain.len(), shuffled.len());
    for (a, b) in plain.questions.iter().zip(&shuffled.questions) {
        assert_eq!(a.prompt_text, b.prompt_text);
        assert_eq!(a.correct_answer(), b.correct_answer());
    }
}

#[rstest]
#[case::too_short(
    "Too short to study.",
    Err(StudyInputError::InsufficientContent { chars: 19, minimum: 50 })
)]
#[case::error_echo(
    "Unable to extract text from this PDF. Please try again.",
    Err(StudyInputError::ErrorEcho)
)]
#[case::genuine(PHOTOSYNTHESIS, Ok(()))]
fn test_study_input_validation(
    #[case] text: &str,
    #[case] expected: Result<(), StudyInputError>,
) {
    assert_eq!(validate_study_input(text, &StudyConfig::default()), expected);
}
