pub mod ai;
pub mod chapterizer;
pub mod document;
pub mod extractor;
pub mod llm;
pub mod logger;
pub mod manual;
pub mod outline;
pub mod page_text;
pub mod toc;
