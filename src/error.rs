//! Typed failures reported by the search service.

use thiserror::Error;

/// Errors returned by [`SearchService`](crate::domain::service::SearchService) operations.
///
/// Sink and store failures keep their original error as the source.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request is malformed in a way clamping cannot fix.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The index sink was unreachable or rejected a document.
    #[error("Indexing failed: {0:#}")]
    IndexingFailure(#[source] anyhow::Error),

    /// The index sink failed while answering a query.
    #[error("Search unavailable: {0:#}")]
    SearchUnavailable(#[source] anyhow::Error),

    /// The metadata store failed while resolving dependents.
    #[error("Metadata unavailable: {0:#}")]
    MetadataUnavailable(#[source] anyhow::Error),

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl SearchError {
    pub fn validation(message: impl Into<String>) -> Self {
        SearchError::Validation(message.into())
    }
}
