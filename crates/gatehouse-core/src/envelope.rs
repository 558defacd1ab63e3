//! Response envelopes shared by every API endpoint.

use serde::{Deserialize, Serialize};

/// Tracing metadata attached to every envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub correlation_id: String,
    pub timestamp: String,
    pub request_id: String,
    pub version: String,
}

/// Success envelope: `{ status, message, data, meta }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub data: T,
    #[serde(default)]
    pub meta: Meta,
}

impl<T> ApiResponse<T> {
    /// Wrap `data` in a success envelope.
    pub fn success(message: impl Into<String>, data: T, meta: Meta) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
            meta,
        }
    }

    /// Consume the envelope and keep only the payload.
    pub fn into_data(self) -> T {
        self.data
    }
}

/// Failure envelope: `{ status, code, message, errors? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ApiErrorBody {
    /// Build an error envelope with a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            code: Some(code.into()),
            message: Some(message.into()),
            errors: Vec::new(),
            meta: None,
        }
    }
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(default)]
    pub code: String,
}

/// Page position of a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    #[serde(default)]
    pub next_page: Option<u32>,
    #[serde(default)]
    pub prev_page: Option<u32>,
}

impl Pagination {
    /// Compute pagination for `total` items viewed `per_page` at a time.
    ///
    /// `page` is 1-based; a `per_page` of zero is treated as one.
    pub fn compute(total: u64, page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(u64::from(per_page)) as u32;
        let has_next = page < total_pages;
        let has_prev = page > 1;

        Self {
            total,
            page,
            per_page,
            total_pages,
            has_next,
            has_prev,
            next_page: has_next.then_some(page + 1),
            prev_page: has_prev.then(|| page - 1),
        }
    }
}

/// A list response: `{ data: T[], pagination }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
