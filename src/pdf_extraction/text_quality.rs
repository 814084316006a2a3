// Text quality heuristics for extracted text

/// Calculate quality score for extracted text (0.0-1.0)
pub fn calculate_quality_score(text: &str) -> f32 {
    if text.trim().is_empty() {
        return 0.0;
    }

    let checks = [
        text.chars().count() > 10,         // Has content
        has_sentence_structure(text),      // Has sentences
        !is_mostly_gibberish(text),        // Not gibberish
        has_dictionary_words(text),        // Has real words
        has_reasonable_whitespace(text),   // Proper formatting
    ];

    let passed = checks.iter().filter(|&&x| x).count() as f32;
    passed / checks.len() as f32
}

fn has_sentence_structure(text: &str) -> bool {
    text.contains(". ") || text.contains(".\n") || text.trim_end().ends_with('.')
}

/// Vowel ratio outside the range natural language falls in
fn is_mostly_gibberish(text: &str) -> bool {
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 {
        return true;
    }

    let vowel_count = text
        .chars()
        .filter(|c| "aeiouAEIOU".contains(*c))
        .count();
    let vowel_ratio = vowel_count as f32 / letters as f32;

    vowel_ratio < 0.15 || vowel_ratio > 0.7
}

/// Words should be mostly alphabetic and of reasonable length
fn has_dictionary_words(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return false;
    }

    let valid_words = words
        .iter()
        .filter(|w| {
            let len = w.chars().count();
            (2..=20).contains(&len)
        })
        .filter(|w| {
            let len = w.chars().count() as f32;
            let alpha = w.chars().filter(|c| c.is_alphabetic()).count() as f32;
            alpha / len > 0.7
        })
        .count();

    valid_words as f32 / words.len() as f32 > 0.5
}

fn has_reasonable_whitespace(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }

    let whitespace_count = text.chars().filter(|c| c.is_whitespace()).count();
    let whitespace_ratio = whitespace_count as f32 / total as f32;

    whitespace_ratio > 0.05 && whitespace_ratio < 0.5
}

/// Short text containing a known failure phrase is an error message that
/// leaked through as content, not document text.
pub fn is_error_echo(text: &str, markers: &[String], max_chars: usize) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() >= max_chars {
        return false;
    }
    let lower = trimmed.to_lowercase();
    markers
        .iter()
        .any(|marker| !marker.is_empty() && lower.contains(&marker.to_lowercase()))
}

/// Collapse runs of horizontal whitespace, trim each line and keep at most
/// one blank line between blocks.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        out.push_str(&collapsed);
        blank_run = 0;
    }

    out
}
