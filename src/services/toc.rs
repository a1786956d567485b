use crate::models::{ChapterPartition, ChapterRange, OutlineEntry};
use crate::services::document::Document;
use crate::services::logger::Logger;
use regex::Regex;
use std::sync::OnceLock;

fn chapter_title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:(?:chapter|part|section)\s+(?:\d+|[IVXLCDM]+)|(?:introduction|conclusion|appendix|foreword|preface))",
        )
        .expect("chapter title pattern is valid")
    })
}

/// Whether a top-level outline title reads like a chapter heading.
pub fn looks_like_chapter(title: &str) -> bool {
    let title = title.trim();
    if chapter_title_pattern().is_match(title) {
        return true;
    }

    // Short, all-caps titles are usually stylized headings
    title.split_whitespace().count() < 5 && title == title.to_uppercase()
}

/// Builds a chapter partition from the document outline.
///
/// An empty result means the outline held nothing usable; it is not an error.
pub fn chapters_from_toc(doc: &dyn Document, logger: &dyn Logger) -> ChapterPartition {
    chapters_from_outline(&doc.outline(), doc.page_count() as i64, logger)
}

pub fn chapters_from_outline(
    outline: &[OutlineEntry],
    total_pages: i64,
    logger: &dyn Logger,
) -> ChapterPartition {
    let top_level = || outline.iter().filter(|e| e.level == 1 && e.page > 0);

    // Step 1: chapter-like level 1 entries
    let mut candidates: Vec<&OutlineEntry> =
        top_level().filter(|e| looks_like_chapter(&e.title)).collect();

    // Step 2: otherwise every level 1 entry
    if candidates.is_empty() {
        logger.info("Could not reliably identify chapters from Level 1 TOC entries.");
        candidates = top_level().collect();
    }

    if candidates.is_empty() {
        return Vec::new();
    }

    // Step 3: order by page and drop entries sharing a page with the one before
    candidates.sort_by_key(|e| e.page);

    let mut unique: Vec<&OutlineEntry> = Vec::with_capacity(candidates.len());
    for entry in candidates {
        if unique.last().is_some_and(|prev| prev.page == entry.page) {
            logger.info(&format!(
                "Note: Ignoring duplicate TOC entry for page {}: '{}'",
                entry.page,
                entry.title.trim()
            ));
        } else {
            unique.push(entry);
        }
    }

    // Step 4: stitch each chapter to the start of the next
    let mut chapters = Vec::with_capacity(unique.len());
    let mut chapter_num = 1;

    for (i, entry) in unique.iter().enumerate() {
        let title = entry.title.trim();
        let start_page = entry.page;
        let end_page = match unique.get(i + 1) {
            Some(next) if next.page > start_page => next.page - 1,
            Some(next) => {
                logger.warn(&format!(
                    "Warning: Chapter '{}' (pg {}) followed by chapter '{}' (pg {}). Adjusting range.",
                    title,
                    start_page,
                    next.title.trim(),
                    next.page
                ));
                start_page
            }
            None => total_pages,
        };

        if start_page <= end_page {
            chapters.push(ChapterRange::new(chapter_num, title, start_page, end_page));
            chapter_num += 1;
        } else {
            logger.warn(&format!(
                "Warning: Skipping chapter '{}' due to invalid page range ({}-{}).",
                title, start_page, end_page
            ));
        }
    }

    chapters
}
