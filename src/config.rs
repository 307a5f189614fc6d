//! Service configuration.

/// Largest page a search or dependents request may ask for.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Page size used when a request does not specify one.
pub const DEFAULT_TAKE: i64 = 20;

/// Longest accepted query string, in characters.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 256;

/// Limits applied by the search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    pub max_page_size: usize,
    pub max_query_length: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
        }
    }
}

impl SearchConfig {
    /// Override the maximum page size. Zero is raised to one.
    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }
}
