//! Pagination envelope returned by the backend list endpoints.

use serde::{Deserialize, Serialize};

/// One page of results from a paginated endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The entries on this page, in server order.
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    /// Zero-based page index.
    pub page: u32,
    /// Requested page size.
    pub size: u32,
    /// Total entries across all pages.
    #[serde(default)]
    pub total_elements: u64,
    /// Total number of pages.
    #[serde(default)]
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// An empty page: the safe default when a read fails and the caller
    /// degrades to "no data" instead of propagating the error.
    pub fn empty(page: u32, size: u32) -> Self {
        Self {
            content: Vec::new(),
            page,
            size,
            total_elements: 0,
            total_pages: 0,
        }
    }
}
