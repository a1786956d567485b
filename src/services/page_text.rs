use crate::services::document::Document;
use crate::services::logger::Logger;

const PROGRESS_EVERY: usize = 50;

/// Concatenates every page's text behind a `--- PAGE n ---` marker line.
///
/// Returns an empty string for a document without pages.
pub fn extract_text_with_page_markers(doc: &dyn Document, logger: &dyn Logger) -> String {
    let total = doc.page_count();
    if total == 0 {
        return String::new();
    }

    logger.info("Extracting text for AI analysis (this might take a moment)...");

    let mut full_text = String::new();
    for index in 0..total {
        let page_num = index + 1;
        let text = doc.page_text(index).unwrap_or_else(|e| {
            logger.debug(&format!("No text for page {}: {}", page_num, e));
            String::new()
        });

        full_text.push_str(&format!("\n--- PAGE {} ---\n{}\n", page_num, text));

        if page_num % PROGRESS_EVERY == 0 {
            logger.info(&format!("  ... extracted page {}/{}", page_num, total));
        }
    }

    logger.info("Text extraction complete.");
    full_text
}
