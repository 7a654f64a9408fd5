//! Pagination rules for search result traversal.
//!
//! The catalog does not report a page count, so traversal continues while
//! pages come back full.

use std::fmt;

use crate::domain::errors::ErrorClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyPage,
    /// Fewer cards than a full page
    PartialPage,
    PageCap,
    /// The page fetch failed; the rest of the regulation is abandoned
    FetchError(ErrorClass),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPage => f.write_str("empty page"),
            Self::PartialPage => f.write_str("partial page"),
            Self::PageCap => f.write_str("page cap reached"),
            Self::FetchError(class) => write!(f, "fetch error ({class})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDecision {
    Continue,
    Stop(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    full_page_threshold: usize,
    max_pages: Option<u32>,
}

impl PaginationPolicy {
    pub fn new(full_page_threshold: usize, max_pages: Option<u32>) -> Self {
        Self {
            full_page_threshold: full_page_threshold.max(1),
            max_pages,
        }
    }

    /// Decision after page `page` (1-based) returned `count` cards.
    pub fn after_page(&self, page: u32, count: usize) -> PageDecision {
        if count == 0 {
            PageDecision::Stop(StopReason::EmptyPage)
        } else if count < self.full_page_threshold {
            PageDecision::Stop(StopReason::PartialPage)
        } else if self.max_pages.is_some_and(|cap| page >= cap) {
            PageDecision::Stop(StopReason::PageCap)
        } else {
            PageDecision::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_boundary() {
        let policy = PaginationPolicy::new(50, None);
        assert_eq!(policy.after_page(1, 50), PageDecision::Continue);
        assert_eq!(policy.after_page(1, 49), PageDecision::Stop(StopReason::PartialPage));
        assert_eq!(policy.after_page(7, 0), PageDecision::Stop(StopReason::EmptyPage));
    }

    #[test]
    fn cap_stops_exactly_at_the_cap() {
        let policy = PaginationPolicy::new(50, Some(3));
        assert_eq!(policy.after_page(2, 50), PageDecision::Continue);
        assert_eq!(policy.after_page(3, 50), PageDecision::Stop(StopReason::PageCap));
    }
}
