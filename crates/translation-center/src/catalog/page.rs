use anyhow::Result;
use serde::{Deserialize, Serialize};
use specta::Type;

use crate::error::CoreError;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// A validated, zero-based page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Validate raw bounds: `page >= 0` and `1 <= size <= MAX_PAGE_SIZE`.
    pub fn new(page: i64, size: i64) -> Result<Self> {
        let page = u32::try_from(page).map_err(|_| CoreError::InvalidPage { page })?;
        let size = u32::try_from(size)
            .ok()
            .filter(|size| (1..=MAX_PAGE_SIZE).contains(size))
            .ok_or(CoreError::InvalidPageSize { size, max: MAX_PAGE_SIZE })?;
        Ok(PageRequest { page, size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Index of the first element on this page.
    pub fn offset(&self) -> usize {
        self.page as usize * self.size as usize
    }
}

/// Page envelope returned by listing and search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page_number: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub has_more: bool,
    pub content: Vec<T>,
}

impl<T> Page<T> {
    /// Cut one page out of the full, already ordered and distinct match list.
    pub fn slice<I>(request: PageRequest, matches: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let matches = matches.into_iter();
        let total = matches.len();
        let content = matches.skip(request.offset()).take(request.size() as usize).collect();
        Self::assemble(request, total, content)
    }

    /// Build the envelope from a page of content and the pre-pagination total.
    pub fn assemble(request: PageRequest, total: usize, content: Vec<T>) -> Self {
        let size = request.size() as usize;
        let total_pages = u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX);
        Page {
            page_number: request.page(),
            page_size: request.size(),
            total_elements: total as u64,
            total_pages,
            has_more: request.page().saturating_add(1) < total_pages,
            content,
        }
    }
}
