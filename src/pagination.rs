use axum::{
    Json,
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Page size used when the client does not send one.
pub const DEFAULT_PER_PAGE: i64 = 10;
/// Upper bound applied to client-supplied page sizes.
pub const MAX_PER_PAGE: i64 = 100;

/// Response headers carrying the page metadata. They are also listed in the CORS
/// `expose_headers` so the browser client can read them.
pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("x-total-count");
pub const PAGE_HEADER: HeaderName = HeaderName::from_static("x-page");
pub const PER_PAGE_HEADER: HeaderName = HeaderName::from_static("x-per-page");
pub const TOTAL_PAGES_HEADER: HeaderName = HeaderName::from_static("x-total-pages");

/// PageRequest
///
/// A 1-based page number and a page size, already clamped: the page is at least 1 and
/// the size lies in `1..=MAX_PER_PAGE`. Raw query values go through [`PageRequest::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    per_page: i64,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    /// Number of rows to skip: `(page - 1) * per_page`.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

/// `ceil(total / per_page)`, or 0 for a non-positive page size.
pub fn total_pages(total: i64, per_page: i64) -> i64 {
    if per_page <= 0 || total <= 0 {
        return 0;
    }
    (total + per_page - 1) / per_page
}

/// Page
///
/// One slice of an ordered result set plus the metadata describing it. As a response it
/// renders the items as a JSON array and the metadata as `X-*` headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            items,
            total,
            page: request.page(),
            per_page: request.per_page(),
            total_pages: total_pages(total, request.per_page()),
        }
    }

    /// Cuts the requested page out of a fully materialized, already ordered result.
    pub fn from_ordered(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .collect();
        Self::new(items, request, total)
    }

    /// Converts the items while keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from(self.total));
        headers.insert(PAGE_HEADER, HeaderValue::from(self.page));
        headers.insert(PER_PAGE_HEADER, HeaderValue::from(self.per_page));
        headers.insert(TOTAL_PAGES_HEADER, HeaderValue::from(self.total_pages));
        (headers, Json(self.items)).into_response()
    }
}
