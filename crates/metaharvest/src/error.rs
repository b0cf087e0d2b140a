//! Error types for metaharvest.
//!
//! All fallible operations return [`Result`]. The error taxonomy mirrors the
//! propagation policy of the extraction pipeline:
//!
//! - **Contract violations** (`Validation`) always propagate to the immediate
//!   caller. A content handle with no content is a programming bug, not a
//!   data-quality issue.
//! - **Data-quality failures** (`Parse`, `UnsupportedEncoding`) are fatal to a
//!   single document only. Batch drivers log them and move on; sibling
//!   documents are unaffected.
//! - **Configuration failures** (`PathSyntax`, `SchemaNotFound`) surface when a
//!   schema is built or looked up, before any document is touched.
use thiserror::Error;

/// Result type alias using [`HarvestError`].
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Main error type for all metaharvest operations.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A document failed to parse. Fatal to that document, never to a batch.
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A path expression failed to compile. Raised at schema build time so a
    /// typo in a schema table is caught before any extraction runs.
    #[error("Invalid path expression `{expr}`: {message}")]
    PathSyntax { expr: String, message: String },

    /// Contract violation by the caller (empty content handle, invalid
    /// registry name). Always propagates.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No schema is registered under the requested format identifier.
    #[error("No schema registered for format '{0}'")]
    SchemaNotFound(String),

    /// The declared character encoding has no decoder.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}

impl HarvestError {
    /// Create a `Parse` error.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a `Parse` error with an underlying source.
    pub fn parse_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Parse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a `Validation` error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a `PathSyntax` error.
    pub fn path_syntax<S: Into<String>, M: Into<String>>(expr: S, message: M) -> Self {
        Self::PathSyntax {
            expr: expr.into(),
            message: message.into(),
        }
    }

    /// True for errors that are contained within one document's extraction
    /// (the batch driver logs and continues).
    pub fn is_document_scoped(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::UnsupportedEncoding(_) | Self::SchemaNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HarvestError = io_err.into();
        assert!(matches!(err, HarvestError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_parse_error() {
        let err = HarvestError::parse("unexpected end of document");
        assert_eq!(err.to_string(), "Parse error: unexpected end of document");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_parse_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad data");
        let err = HarvestError::parse_with_source("broken document", source);
        assert_eq!(err.to_string(), "Parse error: broken document");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_path_syntax_error() {
        let err = HarvestError::path_syntax("/a[", "unterminated predicate");
        assert_eq!(
            err.to_string(),
            "Invalid path expression `/a[`: unterminated predicate"
        );
    }

    #[test]
    fn test_validation_error() {
        let err = HarvestError::validation("content handle has no content");
        assert!(err.to_string().contains("Validation error"));
        assert!(!err.is_document_scoped());
    }

    #[test]
    fn test_schema_not_found() {
        let err = HarvestError::SchemaNotFound("onix3".to_string());
        assert_eq!(err.to_string(), "No schema registered for format 'onix3'");
        assert!(err.is_document_scoped());
    }

    #[test]
    fn test_document_scoped_classification() {
        assert!(HarvestError::parse("x").is_document_scoped());
        assert!(HarvestError::UnsupportedEncoding("x-unknown".into()).is_document_scoped());
        assert!(!HarvestError::validation("x").is_document_scoped());
        let io: HarvestError = std::io::Error::other("disk").into();
        assert!(!io.is_document_scoped());
    }
}
