//! Page types shared by local queries and remote catalog listings

use serde::{Deserialize, Serialize};

/// Which page to fetch (0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Index of the first item on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }

    /// The request for the following page.
    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            page_size: self.page_size,
        }
    }
}

/// One page of items plus enough bookkeeping to walk the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let total_pages = if request.page_size == 0 {
            0
        } else {
            total.div_ceil(u64::from(request.page_size)) as u32
        };

        Self {
            items,
            total,
            page: request.page,
            total_pages,
            page_size: request.page_size,
        }
    }

    /// Slice `all` according to `request`.
    pub fn from_slice(all: &[T], request: PageRequest) -> Self
    where
        T: Clone,
    {
        let start = (request.offset() as usize).min(all.len());
        let end = start
            .saturating_add(request.page_size as usize)
            .min(all.len());
        Self::new(all[start..end].to_vec(), all.len() as u64, request)
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    /// Request for the next page, if any.
    pub fn next_request(&self) -> Option<PageRequest> {
        self.has_next()
            .then(|| PageRequest::new(self.page, self.page_size).next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_counts() {
        let page = Page::new(vec![1, 2, 3], 25, PageRequest::new(0, 10));
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
        assert_eq!(page.next_request(), Some(PageRequest::new(1, 10)));

        let last = Page::new(vec![1, 2, 3, 4, 5], 25, PageRequest::new(2, 10));
        assert!(!last.has_next());
        assert_eq!(last.next_request(), None);
    }

    #[test]
    fn test_from_slice_walks_all_items() {
        let all: Vec<u32> = (0..7).collect();
        let mut request = Some(PageRequest::new(0, 3));
        let mut seen = Vec::new();

        while let Some(current) = request {
            let page = Page::from_slice(&all, current);
            seen.extend(page.items.iter().copied());
            request = page.next_request();
        }

        assert_eq!(seen, all);
    }

    #[test]
    fn test_from_slice_past_the_end_is_empty() {
        let page = Page::from_slice(&[1, 2], PageRequest::new(5, 10));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_zero_page_size() {
        let page = Page::new(vec![1], 25, PageRequest::new(0, 0));
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.next_request(), None);
    }
}
