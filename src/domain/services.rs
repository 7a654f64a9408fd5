//! Collector service traits
//!
//! The application drivers depend on these seams; the browser-backed
//! implementations live in the infrastructure layer.

use async_trait::async_trait;

use crate::domain::card::{CardDetail, CardId, CardSummary, Regulation};
use crate::domain::errors::ScrapeError;

/// Search result page collection
#[async_trait]
pub trait CardListCollector: Send + Sync {
    /// Summaries on one 1-based result page. `None` lists the catalog's default view.
    async fn fetch_page(&self, regulation: Option<Regulation>, page: u32) -> Result<Vec<CardSummary>, ScrapeError>;
}

/// Card detail page collection
#[async_trait]
pub trait CardDetailCollector: Send + Sync {
    async fn fetch(&self, card_id: &CardId, regulation: Regulation) -> Result<CardDetail, ScrapeError>;
}
