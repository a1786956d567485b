use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the detection strategies and the extractor.
///
/// Every message is meant to be shown to the user as-is.
#[derive(Error, Debug)]
pub enum ChapterError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("could not read document text: {0}")]
    ExtractionInput(String),
    #[error("model response error: {0}")]
    ModelResponse(String),
    #[error("invalid chapter ranges: {0}")]
    Validation(String),
    #[error("failed to write {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl ChapterError {
    pub fn io(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ChapterError::Io {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
