//! Paginated summary collection
//!
//! Pages are fetched strictly in order with a fixed pause between fetches.
//! Each page is stored before the next one is requested, so an aborted run
//! keeps everything collected so far.

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::{
    CardListCollector, PageDecision, PaginationPolicy, RecordStore, Regulation, StopReason, StorageResult,
};
use crate::infrastructure::page_session::pause;

/// Outcome of one regulation's traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListReport {
    /// `None` for the catalog's unfiltered view
    pub regulation: Option<Regulation>,
    pub pages: u32,
    pub cards: usize,
    pub stop_reason: StopReason,
}

pub struct CatalogCollection {
    collector: Arc<dyn CardListCollector>,
    store: Arc<dyn RecordStore>,
    policy: PaginationPolicy,
    page_delay_ms: u64,
}

impl CatalogCollection {
    pub fn new(
        collector: Arc<dyn CardListCollector>,
        store: Arc<dyn RecordStore>,
        policy: PaginationPolicy,
        page_delay_ms: u64,
    ) -> Self {
        Self {
            collector,
            store,
            policy,
            page_delay_ms,
        }
    }

    /// Walks result pages until the policy stops. A page fetch failure ends
    /// this regulation; a storage failure ends the run.
    pub async fn collect_regulation(&self, regulation: Option<Regulation>) -> StorageResult<ListReport> {
        let label = regulation.map_or("default view", Regulation::as_str);
        info!("📋 Collecting card summaries ({})", label);

        let mut report = ListReport {
            regulation,
            pages: 0,
            cards: 0,
            stop_reason: StopReason::EmptyPage,
        };
        let mut page = 1;
        loop {
            if page > 1 {
                pause(self.page_delay_ms).await;
            }

            let cards = match self.collector.fetch_page(regulation, page).await {
                Ok(cards) => cards,
                Err(e) => {
                    error!("❌ Page {} ({}) failed [{}]: {}", page, label, e.class(), e);
                    report.stop_reason = StopReason::FetchError(e.class());
                    break;
                }
            };

            report.pages += 1;
            report.cards += self.store.upsert_summaries(&cards).await?;

            match self.policy.after_page(page, cards.len()) {
                PageDecision::Continue => page += 1,
                PageDecision::Stop(reason) => {
                    report.stop_reason = reason;
                    break;
                }
            }
        }

        info!(
            "✅ {}: {} cards over {} pages, stopped on {}",
            label, report.cards, report.pages, report.stop_reason
        );
        Ok(report)
    }

    /// One traversal per regulation, in the given order.
    pub async fn collect_all(&self, regulations: &[Regulation]) -> StorageResult<Vec<ListReport>> {
        let mut reports = Vec::with_capacity(regulations.len());
        for regulation in regulations {
            reports.push(self.collect_regulation(Some(*regulation)).await?);
        }
        Ok(reports)
    }
}
