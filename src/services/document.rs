use crate::error::ChapterError;
use crate::models::OutlineEntry;
use crate::services::outline::read_outline;
use std::path::{Path, PathBuf};

/// A paginated source the resolvers and the extractor read from.
///
/// Page indices are 0-based physical positions; outline pages are 1-based.
pub trait Document {
    fn page_count(&self) -> usize;

    fn page_text(&self, page_index: usize) -> Result<String, ChapterError>;

    /// Table-of-contents entries in document order. Empty when there is none.
    fn outline(&self) -> Vec<OutlineEntry>;

    /// Writes the inclusive physical range `[first, last]` as a standalone file.
    fn write_page_range(&self, first: usize, last: usize, dest: &Path) -> Result<(), ChapterError>;
}

/// PDF backed by `lopdf`.
pub struct PdfDocument {
    inner: lopdf::Document,
    path: PathBuf,
}

impl PdfDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ChapterError> {
        let path = path.as_ref();
        let inner = lopdf::Document::load(path).map_err(|e| {
            ChapterError::ExtractionInput(format!(
                "failed to open PDF '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(PdfDocument {
            inner,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Document for PdfDocument {
    fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    fn page_text(&self, page_index: usize) -> Result<String, ChapterError> {
        let page_number = page_index as u32 + 1;
        self.inner
            .extract_text(&[page_number])
            .map_err(|e| ChapterError::ExtractionInput(format!("page {}: {}", page_number, e)))
    }

    fn outline(&self) -> Vec<OutlineEntry> {
        read_outline(&self.inner)
    }

    fn write_page_range(&self, first: usize, last: usize, dest: &Path) -> Result<(), ChapterError> {
        let total = self.page_count();
        if first > last || last >= total {
            return Err(ChapterError::io(
                dest,
                format!("page range {}-{} is outside a {} page document", first, last, total),
            ));
        }

        let mut chapter = self.inner.clone();

        // lopdf numbers pages from 1
        let to_remove: Vec<u32> = (0..first)
            .chain(last + 1..total)
            .map(|index| index as u32 + 1)
            .collect();
        if !to_remove.is_empty() {
            chapter.delete_pages(&to_remove);
        }

        chapter.prune_objects();
        chapter.delete_zero_length_streams();
        chapter.renumber_objects();
        chapter.compress();

        chapter.save(dest).map_err(|e| ChapterError::io(dest, e))?;
        Ok(())
    }
}
