//! Parsing context for list and detail extraction
//!
//! Carries what the page itself cannot tell the parser: which regulation was
//! requested and how site-relative URLs resolve.

use crate::domain::{CardId, Regulation};
use crate::infrastructure::config::CatalogConfig;

/// Context for one search result page
#[derive(Debug, Clone)]
pub struct ListParseContext {
    /// Regulation recorded on every discovered summary
    pub regulation: Regulation,
    pub catalog: CatalogConfig,
}

impl ListParseContext {
    pub fn new(regulation: Regulation, catalog: CatalogConfig) -> Self {
        Self { regulation, catalog }
    }

    pub fn detail_url(&self, card_id: &CardId) -> String {
        self.catalog.detail_page_url(card_id, None)
    }
}

/// Context for one card detail page
#[derive(Debug, Clone)]
pub struct DetailParseContext {
    pub card_id: CardId,
    pub regulation: Regulation,
    pub detail_url: String,
    /// Canonical image URL resolved from the in-page registry
    pub image_url: Option<String>,
}
