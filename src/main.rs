// studykit CLI - extract text from a document and turn it into study material
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use studykit::pdf_extraction::CommandOcrProvider;
use studykit::{
    inspect_document, validate_study_input, ContentAnalyzer, DocumentLoader, ExtractionCoordinator,
    ExtractionResult, FileLoader, QuizSynthesizer, RawDocument, StudyConfig, StudyMaterial,
    SummarySynthesizer,
};

#[derive(Parser, Debug)]
#[command(
    name = "studykit",
    author,
    version,
    about = "Extract text from documents and generate study material"
)]
struct Cli {
    /// TOML config file (defaults to $STUDYKIT_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract text from a PDF or image
    Extract {
        file: PathBuf,
        /// Print the full extraction result as JSON
        #[arg(long)]
        json: bool,
        /// Fall back to tesseract OCR when nothing else works
        #[arg(long)]
        ocr: bool,
    },
    /// Print a structural report of a document
    Inspect { file: PathBuf },
    /// Extract, then generate a summary and quiz
    Study {
        /// Document to extract text from
        #[arg(required_unless_present = "text_file")]
        file: Option<PathBuf>,
        /// Use plain text from this file instead of extracting
        #[arg(long, conflicts_with = "file")]
        text_file: Option<PathBuf>,
        #[arg(short, long, default_value_t = 5)]
        questions: usize,
        #[arg(long)]
        ocr: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => StudyConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => StudyConfig::load().context("Failed to load config")?,
    };

    match cli.command {
        Commands::Extract { file, json, ocr } => extract(&file, json, ocr, &config).await,
        Commands::Inspect { file } => inspect(&file, &config),
        Commands::Study {
            file,
            text_file,
            questions,
            ocr,
        } => {
            let text = match (file, text_file) {
                (_, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (Some(path), None) => extract_for_study(&path, ocr, &config).await?,
                (None, None) => bail!("Either a document or --text-file is required"),
            };
            study(text, questions, config).await
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "studykit=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn coordinator(ocr: bool, config: &StudyConfig) -> ExtractionCoordinator {
    let coordinator = ExtractionCoordinator::new(config.extraction.clone());
    if ocr {
        let engine = CommandOcrProvider::tesseract()
            .with_timeout(Duration::from_secs(config.extraction.ocr_timeout_secs));
        coordinator.with_ocr(Arc::new(engine))
    } else {
        coordinator
    }
}

fn load(file: &Path) -> Result<RawDocument> {
    FileLoader::new()
        .fetch(&file.to_string_lossy())
        .with_context(|| format!("Failed to read {}", file.display()))
}

/// Extraction is blocking (lopdf, OCR subprocesses), so it runs on the
/// blocking pool and the CLI stops waiting after `limit`.
async fn bounded_extract(
    coordinator: ExtractionCoordinator,
    doc: RawDocument,
    limit: Duration,
) -> Result<ExtractionResult> {
    let source = doc.source().to_string();
    let task = tokio::task::spawn_blocking(move || coordinator.extract(&doc));
    match timeout(limit, task).await {
        Ok(joined) => joined.context("Extraction task failed"),
        Err(_) => bail!("Extraction of {} timed out after {:?}", source, limit),
    }
}

async fn run_extraction(file: &Path, ocr: bool, config: &StudyConfig) -> Result<ExtractionResult> {
    let doc = load(file)?;
    let limit = Duration::from_secs(config.extraction.extraction_timeout_secs);
    bounded_extract(coordinator(ocr, config), doc, limit).await
}

async fn extract(file: &Path, json: bool, ocr: bool, config: &StudyConfig) -> Result<()> {
    let result = run_extraction(file, ocr, config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.succeeded {
        println!("{}", result.text);
    }

    if let Some(diagnostic) = &result.diagnostic {
        if !json {
            eprintln!("Extraction failed: {}", diagnostic.classification);
            for attempt in &diagnostic.attempts {
                eprintln!("  {}: {}", attempt.strategy, attempt.reason);
            }
            for suggestion in &diagnostic.suggestions {
                eprintln!("  - {}", suggestion);
            }
        }
        bail!("No usable text extracted from {}", file.display());
    }
    Ok(())
}

fn inspect(file: &Path, config: &StudyConfig) -> Result<()> {
    let doc = load(file)?;
    let inspection = inspect_document(&doc, &config.extraction);
    println!("{}", serde_json::to_string_pretty(&inspection)?);
    Ok(())
}

async fn extract_for_study(file: &Path, ocr: bool, config: &StudyConfig) -> Result<String> {
    let result = run_extraction(file, ocr, config).await?;
    match &result.diagnostic {
        None => {
            info!(
                "Extracted {} characters with {}",
                result.text.len(),
                result.strategy_name.as_deref().unwrap_or("unknown")
            );
            Ok(result.text)
        }
        Some(diagnostic) => bail!(
            "No usable text extracted from {} ({}). {}",
            file.display(),
            diagnostic.classification,
            diagnostic.suggestions.join(" ")
        ),
    }
}

/// Summary and quiz share one immutable analysis and run as separate blocking tasks
async fn study(text: String, questions: usize, config: StudyConfig) -> Result<()> {
    validate_study_input(&text, &config).context("Text is not suitable for study material")?;

    let analyzer = ContentAnalyzer::new(config.analysis.clone())?;
    let analysis = Arc::new(analyzer.analyze(&text));
    debug!("Key terms: {:?}", analysis.key_terms);

    let text = Arc::new(text);
    let summary_task = {
        let analysis = Arc::clone(&analysis);
        let text = Arc::clone(&text);
        let synthesizer = SummarySynthesizer::new(config.summary.clone());
        tokio::task::spawn_blocking(move || synthesizer.summarize(&text, &analysis))
    };
    let quiz_task = {
        let analysis = Arc::clone(&analysis);
        let synthesizer = QuizSynthesizer::new(config.quiz.clone(), &config.analysis)?;
        tokio::task::spawn_blocking(move || synthesizer.generate_quiz(&analysis, questions))
    };

    let (summary, quiz) = tokio::try_join!(summary_task, quiz_task).context("Study task failed")?;
    let material = StudyMaterial { summary, quiz };
    println!("{}", serde_json::to_string_pretty(&material)?);
    Ok(())
}
