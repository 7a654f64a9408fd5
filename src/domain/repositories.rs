//! Repository interfaces for the card catalog
//!
//! Both storage backends (direct SQLite, remote D1 scripts) implement these traits,
//! so the collectors never know which transport they write through.

use async_trait::async_trait;

use crate::domain::card::{CardDetail, CardId, CardSummary, Regulation};
use crate::domain::collection_log::CollectionLogEntry;
use crate::domain::errors::StorageResult;

/// Upper bound for a single backfill selection
pub const MAX_BACKFILL_BATCH: u32 = 500;

/// Clamps a requested backfill size into `1..=MAX_BACKFILL_BATCH`.
pub fn clamp_backfill_limit(requested: u32) -> u32 {
    requested.clamp(1, MAX_BACKFILL_BATCH)
}

/// A stored summary still lacking detail fields (`hp` unset)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillCandidate {
    pub card_id: CardId,
    pub regulation: Regulation,
}

/// Append-only audit of detail-fetch outcomes.
///
/// A failed append is a storage fault and must reach the caller.
#[async_trait]
pub trait CollectionLog: Send + Sync {
    async fn append(&self, entry: &CollectionLogEntry) -> StorageResult<()>;
}

#[async_trait]
pub trait RecordStore: CollectionLog {
    /// Creates the catalog tables when missing.
    async fn initialize_schema(&self) -> StorageResult<()>;

    /// Connectivity check; returns the number of stored cards.
    async fn ping(&self) -> StorageResult<i64>;

    /// Insert-or-merge of list-view summaries. Returns how many were submitted.
    ///
    /// Incoming nulls never erase stored values, and a stored `regulation` is never replaced.
    async fn upsert_summaries(&self, cards: &[CardSummary]) -> StorageResult<usize>;

    /// Replaces the detail fields and sub-records of one card.
    ///
    /// `log` is delivered together with the detail where the backend allows it.
    async fn replace_detail(
        &self,
        detail: &CardDetail,
        log: Option<&CollectionLogEntry>,
    ) -> StorageResult<()>;

    /// Up to `limit` (clamped) cards without `hp`, ordered by id.
    async fn find_missing_detail(&self, limit: u32) -> StorageResult<Vec<BackfillCandidate>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backfill_limit_is_clamped() {
        assert_eq!(clamp_backfill_limit(0), 1);
        assert_eq!(clamp_backfill_limit(50), 50);
        assert_eq!(clamp_backfill_limit(10_000), MAX_BACKFILL_BATCH);
    }
}
