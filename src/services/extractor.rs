use crate::error::ChapterError;
use crate::models::{ChapterRange, DetectionSource, ExtractionReport, SkipReason, SkippedChapter};
use crate::services::document::Document;
use crate::services::logger::Logger;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Where a chapter lands in the physical document once the offset is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Inclusive 0-based physical pages.
    Pages { first: usize, last: usize, clamped: bool },
    Skip(SkipReason),
}

/// Maps a logical range onto physical page indices.
///
/// `offset` is subtracted from logical page numbers: if book page 1 is the
/// fifth page of the PDF, the offset is -4.
pub fn reconcile(chapter: &ChapterRange, offset: i64, total_physical: usize) -> Placement {
    // Saturates on extreme offsets so the chapter lands in a skip instead of wrapping
    let physical_start = chapter.start_page.saturating_sub(offset).saturating_sub(1);
    let mut physical_end = chapter.end_page.saturating_sub(offset).saturating_sub(1);

    if physical_start < 0 {
        return Placement::Skip(SkipReason::BeforeStart { physical_start });
    }

    let last_index = total_physical as i64 - 1;
    let clamped = physical_end > last_index;
    if clamped {
        physical_end = last_index;
    }

    if physical_start > physical_end {
        return Placement::Skip(SkipReason::Inverted {
            physical_start,
            physical_end,
        });
    }

    Placement::Pages {
        first: physical_start as usize,
        last: physical_end as usize,
        clamped,
    }
}

fn illegal_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"[\\/*?:"<>|]"#).expect("illegal character pattern is valid")
    })
}

fn whitespace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

fn chapter_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:chapter|part|section|appendix|introduction|conclusion|foreword|preface)_")
            .expect("chapter prefix pattern is valid")
    })
}

pub fn sanitize_filename(title: &str) -> String {
    let safe = illegal_chars().replace_all(title, "");
    whitespace().replace_all(&safe, "_").into_owned()
}

/// File name for a chapter; stable for a given number and title.
pub fn output_file_name(chapter: &ChapterRange) -> String {
    let safe_title = sanitize_filename(&chapter.title);
    if chapter_prefix().is_match(&safe_title) {
        format!("{}.pdf", safe_title)
    } else {
        format!("Chapter_{:02}_{}.pdf", chapter.chapter_num, safe_title)
    }
}

/// `<dir of input>/<input stem>_chapters_<source>`
pub fn default_output_dir(input: &Path, source: DetectionSource) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("book");
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{}_chapters_{}", stem, source.label()))
}

/// Writes one PDF per chapter into `output_dir`.
///
/// Chapters the offset pushes out of the document are skipped with a
/// warning. The first write failure aborts the rest of the batch.
pub fn extract_chapters(
    doc: &dyn Document,
    chapters: &[ChapterRange],
    output_dir: &Path,
    offset: i64,
    logger: &dyn Logger,
) -> Result<ExtractionReport, ChapterError> {
    std::fs::create_dir_all(output_dir).map_err(|e| ChapterError::io(output_dir, e))?;

    if offset != 0 {
        logger.info(&format!("Applying page offset of {} during extraction", offset));
    }

    let total_physical = doc.page_count();
    let mut report = ExtractionReport::default();
    let mut names_used = HashSet::new();

    for (i, chapter) in chapters.iter().enumerate() {
        let title = &chapter.title;
        let (start, end) = (chapter.start_page, chapter.end_page);

        let (first, last) = match reconcile(chapter, offset, total_physical) {
            Placement::Skip(reason) => {
                match &reason {
                    SkipReason::BeforeStart { physical_start } => logger.warn(&format!(
                        "Warning: Chapter '{}' (Original: {}-{}) adjusted start page {} is less than 1 after applying offset {}. Skipping.",
                        title, start, end, physical_start.saturating_add(1), offset
                    )),
                    SkipReason::Inverted { physical_start, physical_end } => logger.warn(&format!(
                        "Warning: Chapter '{}' (Original: {}-{}) adjusted start page {} is greater than adjusted end page {} after applying offset {}. Skipping.",
                        title,
                        start,
                        end,
                        physical_start.saturating_add(1),
                        physical_end.saturating_add(1),
                        offset
                    )),
                }
                report.skipped.push(SkippedChapter {
                    chapter_num: chapter.chapter_num,
                    title: title.clone(),
                    reason,
                });
                continue;
            }
            Placement::Pages { first, last, clamped } => {
                if clamped {
                    logger.warn(&format!(
                        "Warning: Chapter '{}' (Original: {}-{}) adjusted end page {} exceeds document total ({}) after applying offset {}. Clamping to max page.",
                        title,
                        start,
                        end,
                        end.saturating_sub(offset),
                        total_physical,
                        offset
                    ));
                }
                (first, last)
            }
        };

        let file_name = output_file_name(chapter);
        if !names_used.insert(file_name.clone()) {
            logger.warn(&format!(
                "Warning: Chapter '{}' maps to '{}', already written in this run. It will be overwritten.",
                title, file_name
            ));
        }
        let path = output_dir.join(file_name);
        logger.info(&format!(
            "Extracting chapter {}/{}: '{}': Original pages {}-{}, Adjusted PDF pages {} to {}",
            i + 1,
            chapters.len(),
            title,
            start,
            end,
            first,
            last
        ));

        if let Err(e) = doc.write_page_range(first, last, &path) {
            logger.error(&format!("Error during chapter extraction: {}", e));
            return Err(e);
        }
        report.written.push(path);
    }

    logger.success(&format!(
        "Successfully extracted {} of {} chapters to '{}'",
        report.written.len(),
        chapters.len(),
        output_dir.display()
    ));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;
    use crate::test_support::{FakeDocument, RecordingLogger};
    use tempfile::TempDir;

    #[test]
    fn test_offset_maps_to_zero_based_range() {
        let chapter = ChapterRange::new(1, "One", 5, 10);
        assert_eq!(
            reconcile(&chapter, 4, 100),
            Placement::Pages { first: 0, last: 5, clamped: false }
        );
    }

    #[test]
    fn test_offset_before_document_start() {
        let chapter = ChapterRange::new(1, "One", 5, 10);
        assert_eq!(
            reconcile(&chapter, 10, 100),
            Placement::Skip(SkipReason::BeforeStart { physical_start: -6 })
        );
    }

    #[test]
    fn test_negative_offset_shifts_forward() {
        let chapter = ChapterRange::new(1, "One", 1, 3);
        assert_eq!(
            reconcile(&chapter, -4, 100),
            Placement::Pages { first: 4, last: 6, clamped: false }
        );
    }

    #[test]
    fn test_end_clamped_to_document() {
        let chapter = ChapterRange::new(3, "Three", 90, 100);
        assert_eq!(
            reconcile(&chapter, -5, 100),
            Placement::Pages { first: 94, last: 99, clamped: true }
        );
    }

    #[test]
    fn test_range_entirely_past_end_is_inverted() {
        let chapter = ChapterRange::new(3, "Three", 98, 100);
        assert_eq!(
            reconcile(&chapter, -5, 100),
            Placement::Skip(SkipReason::Inverted { physical_start: 102, physical_end: 99 })
        );
    }

    #[test]
    fn test_extreme_offsets_skip_instead_of_overflowing() {
        let chapter = ChapterRange::new(1, "One", 5, 10);
        assert!(matches!(
            reconcile(&chapter, i64::MIN, 100),
            Placement::Skip(SkipReason::Inverted { physical_end: 99, .. })
        ));
        assert!(matches!(
            reconcile(&chapter, i64::MAX, 100),
            Placement::Skip(SkipReason::BeforeStart { .. })
        ));

        let dir = TempDir::new().unwrap();
        let doc = FakeDocument::with_pages(100);
        let logger = RecordingLogger::default();
        let report = extract_chapters(&doc, &[chapter], dir.path(), i64::MIN, &logger).unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert!(doc.written_ranges().is_empty());
    }

    #[test]
    fn test_file_names() {
        let name = |num, title: &str| output_file_name(&ChapterRange::new(num, title, 1, 1));

        assert_eq!(name(1, "Chapter 1: The Start"), "Chapter_1_The_Start.pdf");
        assert_eq!(name(2, "part  II / Rise?"), "part_II_Rise.pdf");
        assert_eq!(name(3, "Chapter 3 (Manual)"), "Chapter_3_(Manual).pdf");
        assert_eq!(name(4, "The Long Winter"), "Chapter_04_The_Long_Winter.pdf");
        assert_eq!(name(5, "Introduction"), "Chapter_05_Introduction.pdf");
        assert_eq!(name(12, "Appendix A"), "Appendix_A.pdf");
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Path::new("/books/rust book.pdf"), DetectionSource::Toc),
            PathBuf::from("/books/rust book_chapters_TOC")
        );
        assert_eq!(
            default_output_dir(Path::new("novel.pdf"), DetectionSource::Manual),
            PathBuf::from("novel_chapters_Manual")
        );
    }

    #[test]
    fn test_sanitize_strips_illegal_characters() {
        assert_eq!(sanitize_filename(r#"a\b/c*d?e:f"g<h>i|j"#), "abcdefghij");
        assert_eq!(sanitize_filename("  spaced \t out\n"), "_spaced_out_");
    }

    #[test]
    fn test_skips_and_continues() {
        let dir = TempDir::new().unwrap();
        let doc = FakeDocument::with_pages(100);
        let logger = RecordingLogger::default();
        let chapters = vec![
            ChapterRange::new(1, "Chapter 1", 5, 10),
            ChapterRange::new(2, "Chapter 2", 11, 40),
        ];

        let report = extract_chapters(&doc, &chapters, dir.path(), 10, &logger).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].chapter_num, 1);
        assert_eq!(report.written.len(), 1);
        assert_eq!(doc.written_ranges(), vec![(0, 29)]);
        assert_eq!(logger.count(LogLevel::Warning), 1);
        assert_eq!(logger.count(LogLevel::Success), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("book_chapters_TOC").join("nested");
        let doc = FakeDocument::with_pages(4);
        let logger = RecordingLogger::default();

        let chapters = [ChapterRange::new(1, "Chapter 1", 1, 4)];
        let report = extract_chapters(&doc, &chapters, &out, 0, &logger).unwrap();

        assert!(out.is_dir());
        assert_eq!(report.written, vec![out.join("Chapter_1.pdf")]);
        assert!(out.join("Chapter_1.pdf").is_file());
    }

    #[test]
    fn test_write_failure_aborts_batch() {
        let dir = TempDir::new().unwrap();
        let doc = FakeDocument {
            fail_writes_after: Some(1),
            ..FakeDocument::with_pages(30)
        };
        let logger = RecordingLogger::default();
        let chapters = vec![
            ChapterRange::new(1, "Chapter 1", 1, 10),
            ChapterRange::new(2, "Chapter 2", 11, 20),
            ChapterRange::new(3, "Chapter 3", 21, 30),
        ];

        let err = extract_chapters(&doc, &chapters, dir.path(), 0, &logger).unwrap_err();

        assert!(matches!(err, ChapterError::Io { .. }));
        assert_eq!(doc.written_ranges(), vec![(0, 9)]);
        assert_eq!(logger.count(LogLevel::Error), 1);
        assert_eq!(logger.count(LogLevel::Success), 0);
    }

    #[test]
    fn test_contiguous_partition_covers_every_page_once() {
        let dir = TempDir::new().unwrap();
        let doc = FakeDocument::with_pages(37);
        let logger = RecordingLogger::default();
        let chapters = vec![
            ChapterRange::new(1, "Preface", 1, 4),
            ChapterRange::new(2, "Chapter 1", 5, 19),
            ChapterRange::new(3, "Chapter 2", 20, 36),
            ChapterRange::new(4, "Index", 37, 37),
        ];

        extract_chapters(&doc, &chapters, dir.path(), 0, &logger).unwrap();

        let mut covered = vec![0u32; 37];
        for (first, last) in doc.written_ranges() {
            for page in first..=last {
                covered[page] += 1;
            }
        }
        assert!(covered.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_rerun_produces_same_names() {
        let dir = TempDir::new().unwrap();
        let chapters = vec![
            ChapterRange::new(1, "Introduction", 1, 3),
            ChapterRange::new(2, "Chapter 1: Setup", 4, 9),
        ];
        let logger = RecordingLogger::default();

        let first = FakeDocument::with_pages(9);
        extract_chapters(&first, &chapters, dir.path(), 0, &logger).unwrap();
        let second = FakeDocument::with_pages(9);
        extract_chapters(&second, &chapters, dir.path(), 0, &logger).unwrap();

        assert_eq!(first.written_names(), second.written_names());
        assert_eq!(
            first.written_names(),
            vec!["Chapter_01_Introduction.pdf", "Chapter_1_Setup.pdf"]
        );
    }

    #[test]
    fn test_repeated_file_name_is_reported() {
        let dir = TempDir::new().unwrap();
        let doc = FakeDocument::with_pages(20);
        let logger = RecordingLogger::default();
        let chapters = vec![
            ChapterRange::new(1, "Chapter 1", 1, 10),
            ChapterRange::new(2, "Chapter 1", 11, 20),
        ];

        let report = extract_chapters(&doc, &chapters, dir.path(), 0, &logger).unwrap();

        assert_eq!(doc.written_names(), vec!["Chapter_1.pdf", "Chapter_1.pdf"]);
        assert_eq!(report.written.len(), 2);
        assert_eq!(logger.count(LogLevel::Warning), 1);
        assert!(logger.contains("already written in this run"));
    }
}
