use crate::error::ChapterError;
use crate::models::{ChapterPartition, ChapterRange, DetectionSource};
use crate::services::ai::ModelRangeResolver;
use crate::services::document::Document;
use crate::services::llm::ModelClient;
use crate::services::logger::Logger;
use crate::services::manual::parse_manual_ranges;
use crate::services::toc::chapters_from_toc;

/// The three ways of finding chapter boundaries.
pub enum Strategy<'a> {
    Toc,
    Model(&'a dyn ModelClient),
    Manual(&'a str),
}

impl Strategy<'_> {
    pub fn source(&self) -> DetectionSource {
        match self {
            Strategy::Toc => DetectionSource::Toc,
            Strategy::Model(_) => DetectionSource::Ai,
            Strategy::Manual(_) => DetectionSource::Manual,
        }
    }
}

/// Runs exactly one strategy against the document.
///
/// `Toc` may return an empty partition; the other two fail instead.
pub fn detect(
    doc: &dyn Document,
    strategy: Strategy<'_>,
    logger: &dyn Logger,
) -> Result<ChapterPartition, ChapterError> {
    match strategy {
        Strategy::Toc => Ok(chapters_from_toc(doc, logger)),
        Strategy::Model(client) => ModelRangeResolver::new(client).resolve(doc, logger),
        Strategy::Manual(input) => parse_manual_ranges(input, doc.page_count() as i64),
    }
}

/// Keeps the chapters whose numbers are listed, in partition order.
///
/// An empty selection keeps everything.
pub fn select_chapters(
    chapters: &[ChapterRange],
    numbers: &[u32],
    logger: &dyn Logger,
) -> ChapterPartition {
    if numbers.is_empty() {
        return chapters.to_vec();
    }

    for n in numbers {
        if !chapters.iter().any(|c| c.chapter_num == *n) {
            logger.warn(&format!(
                "Warning: Chapter {} is not in the detected list; ignoring it.",
                n
            ));
        }
    }

    chapters
        .iter()
        .filter(|c| numbers.contains(&c.chapter_num))
        .cloned()
        .collect()
}

pub fn describe(chapters: &[ChapterRange], logger: &dyn Logger) {
    for c in chapters {
        logger.info(&format!(
            "  Chap {}: '{}' (Pages {}-{})",
            c.chapter_num, c.title, c.start_page, c.end_page
        ));
    }
}
