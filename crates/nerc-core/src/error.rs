use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during nerc core operations.
#[derive(Debug, Error)]
pub enum NercError {
    /// Invalid or missing configuration (language code, output directory, model path).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An input file or dataset does not exist.
    #[error("input does not exist: {}", path.display())]
    InputNotFound {
        /// Absolute path of the missing input.
        path: PathBuf,
    },

    /// A dataset line carries a tag outside the `O` / `B-*` / `I-*` vocabulary.
    #[error("malformed tag {tag:?} on line {line}")]
    MalformedTag {
        /// 1-based line number in the dataset.
        line: usize,
        /// The offending tag.
        tag: String,
    },

    /// An entity span does not address a valid slice of its text.
    #[error("invalid span {start}..{end} for text of length {len}")]
    InvalidSpan { start: usize, end: usize, len: usize },

    /// The model could not be loaded from disk.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The model was used before it was prepared for the requested operation.
    #[error("model error: {0}")]
    Model(String),

    /// Zip archive error.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    RegexError(#[from] regex::Error),
}

impl NercError {
    /// Builds an [`NercError::InputNotFound`] with the path made absolute.
    pub fn input_not_found(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let path = std::path::absolute(&path).unwrap_or(path);
        NercError::InputNotFound { path }
    }

    /// Returns `true` for configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, NercError::Configuration(_))
    }
}

/// Result type alias for nerc operations.
pub type Result<T> = std::result::Result<T, NercError>;
