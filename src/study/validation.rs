// Host-side filter for text handed to the study engine
use crate::config::StudyConfig;
use crate::pdf_extraction::text_quality::is_error_echo;
use crate::types::StudyInputError;

/// Refuse text that is an echoed upstream error, or too short to study from.
pub fn validate_study_input(text: &str, config: &StudyConfig) -> Result<(), StudyInputError> {
    let extraction = &config.extraction;
    if is_error_echo(text, &extraction.error_echo_markers, extraction.echo_max_chars) {
        return Err(StudyInputError::ErrorEcho);
    }

    let chars = text.trim().chars().count();
    let minimum = config.summary.min_content_chars;
    if chars < minimum {
        return Err(StudyInputError::InsufficientContent { chars, minimum });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        let config = StudyConfig::default();
        assert_eq!(
            validate_study_input("   short   ", &config),
            Err(StudyInputError::InsufficientContent { chars: 5, minimum: 50 })
        );
        assert_eq!(
            validate_study_input(
                "Error: PDF parsing failed. Please try again later, or upload a new file.",
                &config
            ),
            Err(StudyInputError::ErrorEcho)
        );
        let genuine = "Photosynthesis converts light energy into chemical energy stored in glucose.";
        assert_eq!(validate_study_input(genuine, &config), Ok(()));
    }
}
