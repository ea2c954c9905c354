//! Common types for domain models

use serde::{Deserialize, Serialize};

/// Paginated listing as returned by the forum backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    pub size: u32,
    /// Zero-based page index
    pub number: u32,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    /// An empty first page, used when a secondary listing fails to load
    pub fn empty(size: u32) -> Self {
        Self {
            content: Vec::new(),
            total_elements: 0,
            total_pages: 0,
            size,
            number: 0,
            first: true,
            last: true,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn has_next(&self) -> bool {
        self.total_pages > 0 && self.number < self.total_pages - 1
    }

    /// One-based page number for display
    pub fn display_number(&self) -> u32 {
        self.number + 1
    }

    /// Pagination controls are only shown with more than one page
    pub fn is_paginated(&self) -> bool {
        self.total_pages > 1
    }
}

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn first(size: u32) -> Self {
        Self { page: 0, size }
    }

    pub fn query(&self) -> [(&'static str, String); 2] {
        [("page", self.page.to_string()), ("size", self.size.to_string())]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Response of the provisioning check endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserExistsResponse {
    /// Missing field counts as "not provisioned"
    #[serde(default)]
    pub exists: bool,
}

/// Build an absolute URL for an image reference.
///
/// Absolute http(s) URLs are returned unchanged; relative paths are joined
/// onto `base_url` with a single slash.
pub fn build_image_url(base_url: &str, url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }

    let base = base_url.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{}{}", base, url)
    } else {
        format!("{}/{}", base, url)
    }
}

/// Whether `url` resolves to a usable absolute image URL
pub fn is_valid_image_url(base_url: &str, url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    url::Url::parse(&build_image_url(base_url, url)).is_ok()
}

/// Reject strings that are empty once trimmed
pub(crate) fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        Err(validator::ValidationError::new("blank"))
    } else {
        Ok(())
    }
}
