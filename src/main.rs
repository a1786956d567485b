use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use pdf_chapterizer::config::Settings;
use pdf_chapterizer::models::{ChapterPartition, DetectionSource};
use pdf_chapterizer::services::chapterizer::{Strategy, describe, detect, select_chapters};
use pdf_chapterizer::services::document::{Document, PdfDocument};
use pdf_chapterizer::services::extractor::{default_output_dir, extract_chapters};
use pdf_chapterizer::services::llm::GeminiClient;
use pdf_chapterizer::services::logger::{Logger, TracingLogger};
use pdf_chapterizer::session::{DocumentDetector, Outcome, Session, StdinConsole};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Toc,
    Ai,
    Manual,
}

#[derive(Parser, Debug)]
#[command(name = "pdf-chapterizer", version, about = "Split a PDF book into one PDF per chapter.")]
struct Cli {
    /// PDF file to split
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Detect with one strategy and extract without prompting
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Ranges for the manual strategy, e.g. "1:5-20, 2:21-45"
    #[arg(short, long, value_name = "RANGES")]
    ranges: Option<String>,

    /// Subtracted from book page numbers to get PDF page numbers
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    offset: i64,

    /// Defaults to <FILE stem>_chapters_<source> next to the input
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Only extract these chapter numbers, e.g. 1,3,5
    #[arg(short, long, value_delimiter = ',', value_name = "NUMS")]
    chapters: Vec<u32>,

    /// List the detected chapters without writing anything
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = run() {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env();
    let logger = TracingLogger;

    if !cli.input.is_file() {
        bail!("File not found or is not a file at '{}'", cli.input.display());
    }

    let doc = PdfDocument::open(&cli.input)?;
    logger.info(&format!(
        "Opened '{}', {} pages.",
        cli.input.file_name().unwrap_or_default().to_string_lossy(),
        doc.page_count()
    ));

    let accepted = match cli.strategy {
        Some(strategy) => Some(detect_once(&doc, strategy, &cli, &settings, &logger)?),
        None => {
            let mut detector = DocumentDetector::new(&doc, &settings, &logger);
            let mut console = StdinConsole;
            match Session::new(&mut detector, &mut console, &logger).run() {
                Outcome::Accepted { source, chapters } => Some((source, chapters)),
                Outcome::Cancelled => None,
            }
        }
    };

    let Some((source, chapters)) = accepted else {
        return Ok(());
    };

    let selected = select_chapters(&chapters, &cli.chapters, &logger);
    if selected.is_empty() {
        bail!("No chapters selected for extraction");
    }

    if cli.dry_run {
        logger.info("Dry run; nothing written.");
        return Ok(());
    }

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&cli.input, source));
    logger.info(&format!(
        "Proceeding with chapter ranges obtained via: {}",
        source.label()
    ));

    let report = extract_chapters(&doc, &selected, &output_dir, cli.offset, &logger)
        .context("Chapter extraction failed")?;
    if !report.skipped.is_empty() {
        logger.warn(&format!(
            "{} chapter(s) skipped because the offset moved them outside the document",
            report.skipped.len()
        ));
    }

    Ok(())
}

fn detect_once(
    doc: &PdfDocument,
    strategy: StrategyArg,
    cli: &Cli,
    settings: &Settings,
    logger: &dyn Logger,
) -> Result<(DetectionSource, ChapterPartition)> {
    let (source, chapters) = match strategy {
        StrategyArg::Toc => {
            let chapters = detect(doc, Strategy::Toc, logger)?;
            if chapters.is_empty() {
                bail!("No chapters found via TOC. Try --strategy ai or --strategy manual.");
            }
            (DetectionSource::Toc, chapters)
        }
        StrategyArg::Ai => {
            let client = GeminiClient::from_settings(settings)?;
            (DetectionSource::Ai, detect(doc, Strategy::Model(&client), logger)?)
        }
        StrategyArg::Manual => {
            let ranges = cli
                .ranges
                .as_deref()
                .context("--ranges is required with --strategy manual")?;
            (DetectionSource::Manual, detect(doc, Strategy::Manual(ranges), logger)?)
        }
    };

    logger.info(&format!("Chapters found via {}:", source.label()));
    describe(&chapters, logger);
    Ok((source, chapters))
}
