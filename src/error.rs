//! Error types for tagmerge

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the tagmerge application
#[derive(Debug, Error)]
pub enum TagmergeError {
    #[error("Not a tagmerge project directory: {0}")]
    NotProjectDirectory(PathBuf),

    #[error("Text at position {position} does not match the tag's inner text")]
    TextMismatch { position: usize },

    #[error("No tag found at position {0}")]
    NoTagAtPosition(usize),

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Similarity threshold not met: {ratio:.2} overlap, at least {threshold:.2} required")]
    SimilarityTooLow { ratio: f64, threshold: f64 },

    #[error("Ambiguous sentence alignment: possible reordering or duplicate sentences")]
    AmbiguousAlignment,

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Reference count underflow for tag {0}: tag is not referenced")]
    DanglingReference(String),

    #[error("Not a comparison record: {0}")]
    NotComparisonDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl TagmergeError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TagmergeError::NotProjectDirectory(_) => 2,
            TagmergeError::SimilarityTooLow { .. } => 3,
            TagmergeError::AmbiguousAlignment => 4,
            TagmergeError::UnknownTag(_) => 5,
            _ => 1,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn display_with_suggestions(&self) -> String {
        match self {
            TagmergeError::NotProjectDirectory(path) => {
                format!(
                    "Not a tagmerge project directory: {}\n\n\
                    Suggestions:\n\
                    • Run 'tagmerge init' in this directory to create a project\n\
                    • Navigate to an existing tagmerge project directory",
                    path.display()
                )
            }
            TagmergeError::SimilarityTooLow { ratio, threshold } => {
                format!(
                    "The documents have only {:.0}% sentence overlap, but at least {:.0}% is required.\n\n\
                    The texts are likely not annotations of the same document.\n\
                    Suggestions:\n\
                    • Check that every input file annotates the same source text\n\
                    • Compare the plain texts with 'tagmerge show <file>'",
                    ratio * 100.0,
                    threshold * 100.0
                )
            }
            TagmergeError::AmbiguousAlignment => {
                "Ambiguous sentence alignment detected: possible reordering or duplicate \
                sentences with mismatched references.\n\n\
                Suggestions:\n\
                • Switch align_option to 'union' in .tagmerge/config.toml\n\
                • Remove duplicated sentences from the inputs"
                    .to_string()
            }
            TagmergeError::UnknownTag(id) => {
                format!(
                    "Unknown tag: '{}'\n\n\
                    Suggestions:\n\
                    • List the document's tags with 'tagmerge tags <file>'\n\
                    • The tag may have been deleted by an earlier edit",
                    id
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type using TagmergeError
pub type Result<T> = std::result::Result<T, TagmergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_project_directory_suggestion() {
        let err = TagmergeError::NotProjectDirectory(PathBuf::from("/tmp/test"));
        let msg = err.display_with_suggestions();
        assert!(msg.contains("tagmerge init"));
        assert!(msg.contains("Suggestions"));
    }

    #[test]
    fn test_similarity_too_low_message() {
        let err = TagmergeError::SimilarityTooLow {
            ratio: 0.42,
            threshold: 0.90,
        };
        let msg = err.display_with_suggestions();
        assert!(msg.contains("42%"));
        assert!(msg.contains("90%"));
        assert!(msg.contains("same document"));
    }

    #[test]
    fn test_ambiguous_alignment_suggests_union() {
        let err = TagmergeError::AmbiguousAlignment;
        let msg = err.display_with_suggestions();
        assert!(msg.contains("align_option"));
        assert!(msg.contains("union"));
    }

    #[test]
    fn test_exit_codes_distinguish_alignment_failures() {
        let too_low = TagmergeError::SimilarityTooLow {
            ratio: 0.1,
            threshold: 0.9,
        };
        assert_eq!(too_low.exit_code(), 3);
        assert_eq!(TagmergeError::AmbiguousAlignment.exit_code(), 4);
        assert_eq!(TagmergeError::TextMismatch { position: 0 }.exit_code(), 1);
    }

    #[test]
    fn test_other_errors_fallback() {
        let err = TagmergeError::Config("bad align_option".to_string());
        assert_eq!(
            err.display_with_suggestions(),
            "Configuration error: bad align_option"
        );
    }
}
