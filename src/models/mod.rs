use serde::{Deserialize, Serialize};
use std::fmt;

/// One chapter in logical (printed) page numbers, both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    pub chapter_num: u32,
    pub title: String,
    pub start_page: i64,
    pub end_page: i64,
}

impl ChapterRange {
    pub fn new(chapter_num: u32, title: impl Into<String>, start_page: i64, end_page: i64) -> Self {
        ChapterRange {
            chapter_num,
            title: title.into(),
            start_page,
            end_page,
        }
    }

    pub fn page_count(&self) -> i64 {
        self.end_page - self.start_page + 1
    }
}

/// Ordered chapters with unique, increasing numbers and no overlapping ranges.
pub type ChapterPartition = Vec<ChapterRange>;

/// A table-of-contents record. `page` is 1-based; zero or less means unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: usize,
    pub title: String,
    pub page: i64,
}

impl OutlineEntry {
    pub fn new(level: usize, title: impl Into<String>, page: i64) -> Self {
        OutlineEntry {
            level,
            title: title.into(),
            page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
    Debug,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Success => "SUCCESS",
            LogLevel::Debug => "DEBUG",
        };
        f.write_str(label)
    }
}

/// Where a confirmed partition came from. Used to name the output folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DetectionSource {
    Toc,
    Ai,
    Manual,
}

impl DetectionSource {
    pub fn label(&self) -> &'static str {
        match self {
            DetectionSource::Toc => "TOC",
            DetectionSource::Ai => "AI",
            DetectionSource::Manual => "Manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The offset moved the start before the first physical page.
    BeforeStart { physical_start: i64 },
    /// Nothing left after clamping the end to the document.
    Inverted { physical_start: i64, physical_end: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChapter {
    pub chapter_num: u32,
    pub title: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub written: Vec<std::path::PathBuf>,
    pub skipped: Vec<SkippedChapter>,
}
