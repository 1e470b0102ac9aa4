use serde::{Deserialize, Serialize};

// Define pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

pub fn default_page() -> usize {
    1
}

pub fn default_page_size() -> usize {
    20
}

/// Response wrapper that exposes an entity revision as an opaque etag.
///
/// The revision is round-tripped through the `If-Match` header on
/// conditional mutations; clients are never expected to interpret it.
#[derive(Debug, Serialize)]
pub struct VersionedBody<T> {
    pub etag: String,
    #[serde(flatten)]
    pub record: T,
}

impl<T> VersionedBody<T> {
    pub fn new(record: T, revision: u64) -> Self {
        Self {
            etag: revision.to_string(),
            record,
        }
    }
}
