use crate::error::ChapterError;
use crate::models::{ChapterPartition, ChapterRange};
use crate::services::document::Document;
use crate::services::llm::{GenerationRequest, LlmError, ModelClient};
use crate::services::logger::Logger;
use crate::services::page_text::extract_text_with_page_markers;
use serde_json::Value;

/// Asks a text-generation model where the chapters are.
pub struct ModelRangeResolver<'a> {
    client: &'a dyn ModelClient,
}

impl<'a> ModelRangeResolver<'a> {
    pub fn new(client: &'a dyn ModelClient) -> Self {
        ModelRangeResolver { client }
    }

    pub fn resolve(
        &self,
        doc: &dyn Document,
        logger: &dyn Logger,
    ) -> Result<ChapterPartition, ChapterError> {
        let total_pages = doc.page_count() as i64;

        // Step 1: page-tagged text
        let text = extract_text_with_page_markers(doc, logger);
        if text.is_empty() {
            return Err(ChapterError::ExtractionInput(
                "could not extract any text from the PDF".to_string(),
            ));
        }

        // Step 2: ask the model
        let request = GenerationRequest::new(build_prompt(&text, total_pages));
        logger.info(&format!(
            "Sending text ({} chars) to AI model '{}'...",
            text.chars().count(),
            self.client.model_name()
        ));

        let reply = self.client.generate(&request).map_err(|e| {
            if matches!(e, LlmError::RateLimited(_)) {
                logger.warn("  This might indicate you've hit the free tier limits.");
            }
            ChapterError::ModelResponse(format!("error during AI interaction: {}", e))
        })?;

        // Step 3: empty or blocked replies
        let raw = match reply.text.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.to_string(),
            _ => {
                logger.warn("Warning: AI response was empty.");
                if let Some(reason) = &reply.finish_reason {
                    logger.info(&format!("  Finish Reason: {}", reason));
                }
                let blocked = reply.block_reason.clone().or_else(|| {
                    reply.finish_reason.clone().filter(|reason| reason != "STOP")
                });
                return Err(match blocked {
                    Some(reason) => {
                        logger.warn("  Safety filters might have blocked the response.");
                        ChapterError::ModelResponse(format!(
                            "response blocked by safety filters ({})",
                            reason
                        ))
                    }
                    None => {
                        ChapterError::ModelResponse("model returned an empty response".to_string())
                    }
                });
            }
        };

        // Step 4: decode and validate
        logger.info("AI response received. Attempting to parse JSON...");
        let chapters = decode_chapters(&raw, total_pages, logger)?;
        logger.info("AI analysis complete. Found potential chapters.");
        Ok(chapters)
    }
}

pub fn build_prompt(text: &str, total_pages: i64) -> String {
    format!(
        r#"
Analyze the following text extracted from a PDF document with {total} pages.

Your task is to identify the main chapters (like Introduction, Chapter 1, Chapter 2, Part I, Part II, Appendix, etc.) and determine their start and end page numbers (1-based).

Provide the output STRICTLY in JSON format. The JSON should be a list of objects, where each object represents a chapter and has the following keys:
- "chapter_num": An integer representing the sequential order (starting from 1).
- "title": A concise title for the chapter/section.
- "start_page": The 1-based page number where the chapter begins.
- "end_page": The 1-based page number where the chapter ends.

Constraints:
- The first chapter must start on page 1 and the last chapter must end on page {total}.
- The end page of one chapter must be the page before the start page of the next, so the ranges are contiguous and never overlap.
- start_page and end_page must be integers within [1, {total}] with start_page <= end_page.

--- START OF DOCUMENT TEXT ---
{text}
--- END OF DOCUMENT TEXT ---

Respond ONLY with the JSON list. Do not include markdown backticks (```json ... ```) or any other text before or after the JSON.
"#,
        total = total_pages,
        text = text
    )
}

/// Removes an optional markdown code fence around a model reply.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Turns a raw model reply into a validated partition.
///
/// Items that fail validation are dropped with a warning. When nothing
/// survives the whole reply is rejected.
pub fn decode_chapters(
    raw: &str,
    total_pages: i64,
    logger: &dyn Logger,
) -> Result<ChapterPartition, ChapterError> {
    let body = strip_code_fence(raw);

    let value: Value = serde_json::from_str(body).map_err(|e| {
        logger.debug("--- AI Raw Response Start ---");
        logger.debug(body);
        logger.debug("--- AI Raw Response End ---");
        ChapterError::ModelResponse(format!("failed to parse AI response as JSON: {}", e))
    })?;

    let Value::Array(items) = value else {
        return Err(ChapterError::ModelResponse(
            "AI did not return a JSON list".to_string(),
        ));
    };

    let mut validated: Vec<ChapterRange> = items
        .iter()
        .filter_map(|item| validate_item(item, total_pages, logger))
        .collect();

    validated.sort_by_key(|c| c.chapter_num);

    // Keep the partition free of repeated numbers and overlapping ranges
    let mut chapters: ChapterPartition = Vec::with_capacity(validated.len());
    for chapter in validated {
        if let Some(prev) = chapters.last() {
            if chapter.chapter_num == prev.chapter_num {
                logger.warn(&format!(
                    "Warning: Skipping repeated chapter number {} from AI: '{}'",
                    chapter.chapter_num, chapter.title
                ));
                continue;
            }
            if chapter.start_page <= prev.end_page {
                logger.warn(&format!(
                    "Warning: Skipping chapter {} from AI: pages {}-{} overlap chapter {} (pages {}-{})",
                    chapter.chapter_num,
                    chapter.start_page,
                    chapter.end_page,
                    prev.chapter_num,
                    prev.start_page,
                    prev.end_page
                ));
                continue;
            }
            if chapter.start_page > prev.end_page + 1 {
                logger.warn(&format!(
                    "Warning: Pages {}-{} are not covered by any chapter from AI",
                    prev.end_page + 1,
                    chapter.start_page - 1
                ));
            }
        }
        chapters.push(chapter);
    }

    if chapters.is_empty() {
        return Err(ChapterError::ModelResponse(
            "AI response parsed, but no valid chapter ranges found".to_string(),
        ));
    }

    Ok(chapters)
}

fn validate_item(item: &Value, total_pages: i64, logger: &dyn Logger) -> Option<ChapterRange> {
    let Value::Object(fields) = item else {
        logger.warn(&format!("Warning: Skipping invalid item in AI response: {}", item));
        return None;
    };

    let number = |key: &str| match fields.get(key) {
        None | Some(Value::Null) => Some(0),
        Some(value) => coerce_int(value),
    };

    let (Some(chapter_num), Some(start_page), Some(end_page)) =
        (number("chapter_num"), number("start_page"), number("end_page"))
    else {
        logger.warn(&format!(
            "Warning: Skipping item due to non-integer page or chapter values: {}",
            item
        ));
        return None;
    };

    let title = match fields.get("title") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    let title = if title.is_empty() {
        format!("Chapter {} (AI)", chapter_num)
    } else {
        title
    };

    let number_ok = chapter_num > 0 && chapter_num <= u32::MAX as i64;
    if number_ok && 1 <= start_page && start_page <= end_page && end_page <= total_pages {
        Some(ChapterRange::new(chapter_num as u32, title, start_page, end_page))
    } else {
        logger.warn(&format!(
            "Warning: Skipping invalid range from AI: Chap {}, Pages {}-{}, Title: '{}'",
            chapter_num, start_page, end_page, title
        ));
        None
    }
}

/// Integers, integral strings and (truncated) floats.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
