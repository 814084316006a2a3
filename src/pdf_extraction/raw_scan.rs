// Raw pattern scan - last resort for containers lopdf cannot open. Treats the
// upload as opaque bytes and pulls string operands out of BT ... ET blocks.
use flate2::read::ZlibDecoder;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::io::Read;
use tracing::debug;

use super::lopdf_helper::{decode_hex, decode_pdf_bytes, unescape_literal};
use super::strategy::{ExtractionStrategy, StrategyOutput};
use super::text_quality::{calculate_quality_score, normalize_whitespace};
use crate::config::ExtractionConfig;
use crate::types::{ExtractionError, MediaType, RawDocument};

pub const RAW_PATTERN_SCAN: &str = "raw-pattern-scan";

static TEXT_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s-u)\bBT\b(.*?)\bET\b").expect("text object pattern"));

// Literal `( ... )` with escapes, or hex `< ... >`
static STRING_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s-u)\(((?:[^()\\]|\\.)*)\)|<([0-9A-Fa-f\s]*)>").expect("string token pattern")
});

const KERNING_GAP: f32 = -250.0;
// How far back from a `stream` keyword the dictionary is searched for filters
const STREAM_HEADER_WINDOW: usize = 512;

pub struct RawPatternScan {
    max_segments: usize,
    token_min_chars: usize,
    min_quality: f32,
    max_inflated_bytes: usize,
}

impl RawPatternScan {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_segments: config.max_raw_segments,
            token_min_chars: config.raw_token_min_chars,
            min_quality: config.raw_min_quality,
            max_inflated_bytes: config.max_inflated_bytes,
        }
    }

    /// Scan one buffer, appending runs of text to `runs`. Returns segments consumed.
    fn scan_buffer(&self, buffer: &[u8], budget: usize, runs: &mut Vec<String>) -> usize {
        let mut used = 0;
        for segment in TEXT_OBJECT.captures_iter(buffer).take(budget) {
            used += 1;
            let Some(body) = segment.get(1) else { continue };
            let text = text_object_runs(body.as_bytes())
                .into_iter()
                .filter(|run| run.trim().chars().count() >= self.token_min_chars)
                .collect::<Vec<_>>()
                .join(" ");
            if !text.trim().is_empty() {
                runs.push(text);
            }
        }
        used
    }
}

impl ExtractionStrategy for RawPatternScan {
    fn name(&self) -> &str {
        RAW_PATTERN_SCAN
    }

    fn attempt(&self, doc: &RawDocument) -> Result<StrategyOutput, ExtractionError> {
        if doc.media_type() == MediaType::Image {
            return Err(ExtractionError::UnsupportedFormat(
                "image upload has no text operators".to_string(),
            ));
        }

        let bytes = doc.bytes();
        let mut runs = Vec::new();
        let mut budget = self.max_segments;

        budget -= self.scan_buffer(bytes, budget, &mut runs).min(budget);

        let mut inflated_streams = 0;
        for stream in flate_streams(bytes, self.max_segments, self.max_inflated_bytes) {
            if budget == 0 {
                break;
            }
            inflated_streams += 1;
            budget -= self.scan_buffer(&stream, budget, &mut runs).min(budget);
        }
        debug!(
            "Raw scan: {} text runs, {} inflated streams, {} segments left",
            runs.len(),
            inflated_streams,
            budget
        );

        let text = normalize_whitespace(&runs.join("\n"));
        if text.is_empty() {
            return Err(ExtractionError::NoExtractableText(
                "no text-show tokens found in raw bytes".to_string(),
            ));
        }

        let quality = calculate_quality_score(&text);
        if quality < self.min_quality {
            return Err(ExtractionError::NoExtractableText(format!(
                "raw scan output quality {:.2} is below {:.2}",
                quality, self.min_quality
            )));
        }

        Ok(StrategyOutput::new(text, 0))
    }
}

/// Split one text object into runs of text. Strings separated only by
/// kerning numbers belong to the same run; any operator in between starts a
/// new run.
fn text_object_runs(body: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut last_end: Option<usize> = None;

    for token in STRING_TOKEN.captures_iter(body) {
        let Some(whole) = token.get(0) else { continue };
        let decoded = if let Some(literal) = token.get(1) {
            decode_pdf_bytes(&unescape_literal(literal.as_bytes()))
        } else if let Some(hex) = token.get(2) {
            decode_pdf_bytes(&decode_hex(hex.as_bytes()))
        } else {
            continue;
        };

        if let Some(end) = last_end {
            match kerning_gap(&body[end..whole.start()]) {
                Some(widest) => {
                    if widest < KERNING_GAP && !current.ends_with(' ') {
                        current.push(' ');
                    }
                }
                None => runs.push(std::mem::take(&mut current)),
            }
        }
        current.push_str(&decoded);
        last_end = Some(whole.end());
    }

    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// If the bytes between two strings are only TJ kerning numbers, return the
/// most negative one (0.0 when there are none). `None` means an operator sits
/// between them.
fn kerning_gap(between: &[u8]) -> Option<f32> {
    let between = std::str::from_utf8(between).ok()?;
    let mut widest = 0.0f32;
    for part in between.split_whitespace() {
        let value: f32 = part.parse().ok()?;
        widest = widest.min(value);
    }
    Some(widest)
}

/// Inflate `FlateDecode` streams found by scanning for `stream` keywords.
/// Corrupted streams keep whatever decompressed before the error.
fn flate_streams(bytes: &[u8], max_streams: usize, max_inflated: usize) -> Vec<Vec<u8>> {
    let mut streams = Vec::new();
    let mut cursor = 0;

    while streams.len() < max_streams {
        let Some(offset) = find(&bytes[cursor..], b"stream") else {
            break;
        };
        let keyword = cursor + offset;
        cursor = keyword + b"stream".len();
        if keyword >= 3 && &bytes[keyword - 3..keyword] == b"end" {
            continue;
        }

        let mut start = cursor;
        if bytes.get(start) == Some(&b'\r') {
            start += 1;
        }
        if bytes.get(start) == Some(&b'\n') {
            start += 1;
        }
        let Some(length) = find(&bytes[start..], b"endstream") else {
            break;
        };
        let end = start + length;
        cursor = end + b"endstream".len();

        let header = &bytes[keyword.saturating_sub(STREAM_HEADER_WINDOW)..keyword];
        let header = match rfind(header, b"obj") {
            Some(pos) => &header[pos..],
            None => header,
        };
        if find(header, b"/FlateDecode").is_none() {
            continue;
        }

        let mut inflated = Vec::new();
        let mut decoder = ZlibDecoder::new(&bytes[start..end]).take(max_inflated as u64);
        if let Err(e) = decoder.read_to_end(&mut inflated) {
            debug!("Stream at byte {} inflated partially: {}", start, e);
        }
        if !inflated.is_empty() {
            streams.push(inflated);
        }
    }

    streams
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
