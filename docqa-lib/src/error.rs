//! Error types for docqa

use thiserror::Error;

/// Result type alias for docqa operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docqa operations
#[derive(Error, Debug)]
pub enum Error {
    /// Chunking or service parameters are out of range
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Failed to load or run the embedding model
    #[error("embedding error: {0}")]
    Embedding(String),

    /// A query was issued against a document that produced no chunks
    #[error("no document content to search")]
    EmptyCorpus,

    /// Search was attempted on an index holding zero vectors
    #[error("index contains no vectors")]
    EmptyIndex,

    /// Invalid argument provided
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A vector does not have the width the index was built with
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index and chunk list have drifted apart
    #[error("index holds {index} vectors but {chunks} chunks were supplied")]
    IndexCorpusMismatch { index: usize, chunks: usize },

    /// The external generation service failed
    #[error("generation error: {0}")]
    Generation(String),

    /// Configuration file could not be read or parsed
    #[error("config error: {0}")]
    Config(String),
}

/// Fieldless error category, for callers that only need to branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfiguration,
    EmbeddingFailure,
    EmptyCorpus,
    EmptyIndex,
    InvalidArgument,
    IndexCorpusMismatch,
    GenerationFailure,
}

impl Error {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfiguration(_) | Error::Config(_) => ErrorKind::InvalidConfiguration,
            Error::Embedding(_) => ErrorKind::EmbeddingFailure,
            Error::EmptyCorpus => ErrorKind::EmptyCorpus,
            Error::EmptyIndex => ErrorKind::EmptyIndex,
            Error::InvalidArgument(_) | Error::DimensionMismatch { .. } => {
                ErrorKind::InvalidArgument
            }
            Error::IndexCorpusMismatch { .. } => ErrorKind::IndexCorpusMismatch,
            Error::Generation(_) => ErrorKind::GenerationFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::Config("bad toml".into()).kind(),
            ErrorKind::InvalidConfiguration
        );
        assert_eq!(
            Error::DimensionMismatch { expected: 3, actual: 2 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(Error::EmptyIndex.kind(), ErrorKind::EmptyIndex);
        assert_eq!(
            Error::Generation("401".into()).kind(),
            ErrorKind::GenerationFailure
        );
    }

    #[test]
    fn test_mismatch_message() {
        let err = Error::IndexCorpusMismatch { index: 4, chunks: 5 };
        assert_eq!(
            err.to_string(),
            "index holds 4 vectors but 5 chunks were supplied"
        );
    }
}
