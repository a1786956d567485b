use crate::error::ChapterError;
use crate::models::{ChapterPartition, ChapterRange};

pub const MANUAL_FORMAT_HINT: &str =
    "Expected format: 1:5-20, 2:21-45, ... (ChapterNum:StartPage-EndPage)";

/// Parses `ChapterNum:StartPage-EndPage` entries separated by commas.
///
/// The first bad entry rejects the whole batch.
pub fn parse_manual_ranges(
    input: &str,
    total_pages: i64,
) -> Result<ChapterPartition, ChapterError> {
    let mut chapters = Vec::new();

    for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        chapters.push(parse_entry(entry, total_pages)?);
    }

    if chapters.is_empty() {
        return Err(ChapterError::Validation("no chapter ranges entered".to_string()));
    }

    chapters.sort_by_key(|c: &ChapterRange| c.chapter_num);

    for pair in chapters.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.chapter_num == next.chapter_num {
            return Err(ChapterError::Validation(format!(
                "chapter {} is listed more than once",
                next.chapter_num
            )));
        }
    }

    // Overlap is checked in page order, independent of numbering
    let mut by_page: Vec<&ChapterRange> = chapters.iter().collect();
    by_page.sort_by_key(|c| c.start_page);
    for pair in by_page.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next.start_page <= prev.end_page {
            return Err(ChapterError::Validation(format!(
                "chapter {} ({}-{}) overlaps chapter {} ({}-{})",
                next.chapter_num,
                next.start_page,
                next.end_page,
                prev.chapter_num,
                prev.start_page,
                prev.end_page
            )));
        }
    }

    Ok(chapters)
}

fn parse_entry(entry: &str, total_pages: i64) -> Result<ChapterRange, ChapterError> {
    let malformed = || {
        ChapterError::Validation(format!(
            "'{}' is not of the form ChapterNum:StartPage-EndPage",
            entry
        ))
    };

    let (chapter, pages) = entry.split_once(':').ok_or_else(malformed)?;
    let (start, end) = pages.split_once('-').ok_or_else(malformed)?;

    let chapter_num: i64 = parse_int(chapter, entry)?;
    let start_page: i64 = parse_int(start, entry)?;
    let end_page: i64 = parse_int(end, entry)?;

    if chapter_num < 1 || chapter_num > u32::MAX as i64 {
        return Err(ChapterError::Validation(format!(
            "invalid chapter number {} in '{}'",
            chapter_num, entry
        )));
    }

    if start_page < 1 || end_page < start_page || end_page > total_pages {
        return Err(ChapterError::Validation(format!(
            "Invalid range for chapter {}: {}-{} (Total Pages: {})",
            chapter_num, start_page, end_page, total_pages
        )));
    }

    Ok(ChapterRange::new(
        chapter_num as u32,
        format!("Chapter {} (Manual)", chapter_num),
        start_page,
        end_page,
    ))
}

fn parse_int(token: &str, entry: &str) -> Result<i64, ChapterError> {
    token.trim().parse::<i64>().map_err(|_| {
        ChapterError::Validation(format!("'{}' in '{}' is not an integer", token.trim(), entry))
    })
}
