// External OCR delegate - hands page images to an out-of-process recognizer
use image::ImageFormat;
use once_cell::sync::OnceCell;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::lopdf_helper::{is_jpeg_stream, page_ids, page_image_streams, with_pdf};
use super::strategy::{ExtractionStrategy, StrategyOutput};
use super::text_quality::normalize_whitespace;
use crate::config::ExtractionConfig;
use crate::types::{ExtractionError, MediaType, RawDocument};

pub const EXTERNAL_OCR_DELEGATE: &str = "external-ocr-delegate";

const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Anything that can turn encoded image bytes into text.
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Checked before every attempt; an unavailable provider is skipped.
    fn is_available(&self) -> bool {
        true
    }

    fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError>;
}

/// Runs a command-line OCR engine (tesseract by default) on a temp file.
/// `{input}` in the argument list is replaced with the temp file path.
/// The engine is killed if a single image runs past the timeout.
pub struct CommandOcrProvider {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    available: OnceCell<bool>,
}

impl CommandOcrProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_ENGINE_TIMEOUT,
            available: OnceCell::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tesseract() -> Self {
        Self::new("tesseract", vec!["{input}".to_string(), "stdout".to_string()])
    }

    /// Formats the engine reads directly are passed through; anything else
    /// the image crate can decode is re-encoded as PNG.
    fn prepare(image: &[u8]) -> Result<Vec<u8>, ExtractionError> {
        match image::guess_format(image) {
            Ok(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Tiff | ImageFormat::Bmp) => {
                Ok(image.to_vec())
            }
            _ => {
                let decoded = image::load_from_memory(image)
                    .map_err(|e| ExtractionError::UnsupportedFormat(e.to_string()))?;
                let mut png = Cursor::new(Vec::new());
                decoded
                    .write_to(&mut png, ImageFormat::Png)
                    .map_err(|e| ExtractionError::UnsupportedFormat(e.to_string()))?;
                Ok(png.into_inner())
            }
        }
    }
}

impl Default for CommandOcrProvider {
    fn default() -> Self {
        Self::tesseract()
    }
}

impl OcrProvider for CommandOcrProvider {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            Command::new(&self.program)
                .arg("--version")
                .output()
                .map(|output| output.status.success())
                .unwrap_or(false)
        })
    }

    fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError> {
        let prepared = Self::prepare(image)?;
        let mut input = NamedTempFile::new()?;
        input.write_all(&prepared)?;
        input.flush()?;

        let path = input.path().to_string_lossy().into_owned();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{input}", &path))
            .collect();

        // Output goes to files so a chatty engine never blocks on a full pipe
        let mut stdout = tempfile::tempfile()?;
        let mut stderr = tempfile::tempfile()?;
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(stdout.try_clone()?)
            .stderr(stderr.try_clone()?)
            .spawn()?;

        let status = wait_with_deadline(&mut child, &self.program, self.timeout)?;
        if !status.success() {
            let stderr = read_back(&mut stderr)?;
            return Err(ExtractionError::NoExtractableText(format!(
                "{} failed: {}",
                self.program,
                stderr.trim()
            )));
        }

        read_back(&mut stdout)
    }
}

fn wait_with_deadline(
    child: &mut Child,
    program: &str,
    timeout: Duration,
) -> Result<ExitStatus, ExtractionError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            warn!("{} still running after {:?}, killing it", program, timeout);
            if let Err(e) = child.kill() {
                debug!("Kill failed, {} probably exited: {}", program, e);
            }
            child.wait()?;
            return Err(ExtractionError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{} timed out after {:?}", program, timeout),
            )));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

// The child shares the file offset, so rewind before reading
fn read_back(file: &mut std::fs::File) -> Result<String, ExtractionError> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Strategy wrapper around an [`OcrProvider`]. Image uploads go to the
/// provider as-is; for PDFs each embedded JPEG is recognized in page order.
pub struct OcrDelegate {
    provider: Arc<dyn OcrProvider>,
    max_pages: usize,
    max_images: usize,
}

impl OcrDelegate {
    pub fn new(provider: Arc<dyn OcrProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            max_pages: config.max_pages,
            max_images: config.max_ocr_images,
        }
    }

    fn recognize_pdf(&self, doc: &RawDocument) -> Result<StrategyOutput, ExtractionError> {
        with_pdf(doc, |document| {
            let mut text = String::new();
            let mut images_seen = 0;
            let mut pages_with_images = 0;
            let mut last_error = None;

            for (page_number, page_id) in page_ids(document, self.max_pages) {
                if images_seen >= self.max_images {
                    break;
                }
                let jpegs: Vec<_> = page_image_streams(document, page_id)
                    .into_iter()
                    .filter(|stream| is_jpeg_stream(document, stream))
                    .take(self.max_images - images_seen)
                    .collect();
                if jpegs.is_empty() {
                    continue;
                }
                pages_with_images += 1;

                for stream in jpegs {
                    images_seen += 1;
                    match self.provider.recognize(&stream.content) {
                        Ok(recognized) => {
                            debug!(
                                "Page {}: OCR returned {} characters",
                                page_number,
                                recognized.len()
                            );
                            text.push_str(&recognized);
                            text.push_str("\n\n");
                        }
                        Err(e) => {
                            warn!("Page {}: OCR failed: {}", page_number, e);
                            last_error = Some(e);
                        }
                    }
                }
            }

            if images_seen == 0 {
                return Err(ExtractionError::NoExtractableText(
                    "no embedded JPEG images to recognize".to_string(),
                ));
            }

            let text = normalize_whitespace(&text);
            if text.is_empty() {
                return Err(last_error.unwrap_or_else(|| {
                    ExtractionError::NoExtractableText(format!(
                        "OCR found no text in {} image(s)",
                        images_seen
                    ))
                }));
            }
            Ok(StrategyOutput::new(text, pages_with_images))
        })
    }
}

impl ExtractionStrategy for OcrDelegate {
    fn name(&self) -> &str {
        EXTERNAL_OCR_DELEGATE
    }

    fn attempt(&self, doc: &RawDocument) -> Result<StrategyOutput, ExtractionError> {
        if !self.provider.is_available() {
            return Err(ExtractionError::StrategyUnavailable(format!(
                "OCR provider '{}' is not available",
                self.provider.name()
            )));
        }

        if doc.media_type() != MediaType::Image {
            return self.recognize_pdf(doc);
        }

        let text = normalize_whitespace(&self.provider.recognize(doc.bytes())?);
        if text.is_empty() {
            return Err(ExtractionError::NoExtractableText(
                "OCR found no text in image".to_string(),
            ));
        }
        Ok(StrategyOutput::new(text, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedOcr {
        available: bool,
        calls: AtomicUsize,
    }

    impl OcrProvider for FixedOcr {
        fn name(&self) -> &str {
            "fixed"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn recognize(&self, _image: &[u8]) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("  Chlorophyll absorbs   light energy.  ".to_string())
        }
    }

    fn delegate(available: bool) -> (Arc<FixedOcr>, OcrDelegate) {
        let provider = Arc::new(FixedOcr {
            available,
            calls: AtomicUsize::new(0),
        });
        let strategy = OcrDelegate::new(provider.clone(), &ExtractionConfig::default());
        (provider, strategy)
    }

    #[test]
    fn test_image_upload_goes_straight_to_provider() {
        let (provider, strategy) = delegate(true);
        let doc = RawDocument::new(vec![0xFF, 0xD8, 0xFF, 0xE0], MediaType::Image, "scan.jpg");
        let output = strategy.attempt(&doc).unwrap();
        assert_eq!(output.text, "Chlorophyll absorbs light energy.");
        assert_eq!(output.pages_processed, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unavailable_provider_is_never_called() {
        let (provider, strategy) = delegate(false);
        let doc = RawDocument::new(vec![0xFF, 0xD8, 0xFF, 0xE0], MediaType::Image, "scan.jpg");
        let err = strategy.attempt(&doc).unwrap_err();
        assert!(matches!(err, ExtractionError::StrategyUnavailable(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let provider = CommandOcrProvider::new("studykit-no-such-ocr-binary", Vec::new());
        assert!(!provider.is_available());
    }

    #[test]
    fn test_prepare_rejects_garbage() {
        assert!(CommandOcrProvider::prepare(b"not an image").is_err());
    }

    fn png() -> Vec<u8> {
        let mut png = Cursor::new(Vec::new());
        image::RgbImage::new(4, 4).write_to(&mut png, ImageFormat::Png).unwrap();
        png.into_inner()
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_output_is_read_back() {
        let provider =
            CommandOcrProvider::new("echo", vec!["Chlorophyll absorbs light".to_string()]);
        assert_eq!(provider.recognize(&png()).unwrap().trim(), "Chlorophyll absorbs light");
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_engine_is_killed() {
        let provider = CommandOcrProvider::new("sleep", vec!["10".to_string()])
            .with_timeout(Duration::from_millis(200));
        let started = Instant::now();

        let err = provider.recognize(&png()).unwrap_err();

        assert!(matches!(&err, ExtractionError::Io(e) if e.kind() == io::ErrorKind::TimedOut));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
