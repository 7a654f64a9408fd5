//! Detail backfill for stored summaries
//!
//! Selects cards without `hp`, fetches each detail page in id order and
//! writes the result together with one collection log entry per attempt.
//! Scraping failures are per item; storage failures end the run.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::domain::{CardDetailCollector, CollectionLogEntry, RecordStore, StorageResult};
use crate::infrastructure::page_session::pause;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub selected: usize,
    pub succeeded: usize,
    pub not_found: usize,
    /// Timeout, network and unclassified failures; reselected by the next run
    pub failed: usize,
}

pub struct DetailBackfill {
    collector: Arc<dyn CardDetailCollector>,
    store: Arc<dyn RecordStore>,
    request_delay_ms: u64,
}

impl DetailBackfill {
    pub fn new(collector: Arc<dyn CardDetailCollector>, store: Arc<dyn RecordStore>, request_delay_ms: u64) -> Self {
        Self {
            collector,
            store,
            request_delay_ms,
        }
    }

    pub async fn run(&self, limit: u32) -> StorageResult<BackfillReport> {
        let candidates = self.store.find_missing_detail(limit).await?;
        let mut report = BackfillReport {
            selected: candidates.len(),
            ..BackfillReport::default()
        };
        info!("🔍 {} cards selected for detail backfill", candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            if index > 0 {
                pause(self.request_delay_ms).await;
            }

            let started = Instant::now();
            let outcome = self.collector.fetch(&candidate.card_id, candidate.regulation).await;
            let elapsed_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

            match outcome {
                Ok(detail) => {
                    let entry = CollectionLogEntry::success(candidate.card_id.clone(), elapsed_ms);
                    self.store.replace_detail(&detail, Some(&entry)).await?;
                    report.succeeded += 1;
                    info!(
                        "✅ [{}/{}] {} {} ({} moves, {} abilities)",
                        index + 1,
                        candidates.len(),
                        candidate.card_id,
                        detail.summary.name,
                        detail.moves.len(),
                        detail.abilities.len()
                    );
                }
                Err(e) => {
                    let entry = CollectionLogEntry::failure(candidate.card_id.clone(), e.to_string(), elapsed_ms);
                    self.store.append(&entry).await?;
                    if e.is_terminal() {
                        report.not_found += 1;
                    } else {
                        report.failed += 1;
                    }
                    warn!("⚠️ [{}/{}] {} [{}]: {}", index + 1, candidates.len(), candidate.card_id, e.class(), e);
                }
            }
        }

        info!(
            "Detail backfill finished: {} ok, {} not found, {} failed",
            report.succeeded, report.not_found, report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::{
        BackfillCandidate, CardDetail, CardId, CardSummary, CollectionLog, Regulation, ScrapeError, StorageError,
    };
    use crate::infrastructure::{DatabaseConnection, SqliteCardRepository};

    struct FailingStore;

    #[async_trait]
    impl CollectionLog for FailingStore {
        async fn append(&self, _entry: &CollectionLogEntry) -> StorageResult<()> {
            Err(StorageError::RemoteExecution {
                status: Some(1),
                message: "log table unavailable".into(),
            })
        }
    }

    #[async_trait]
    impl RecordStore for FailingStore {
        async fn initialize_schema(&self) -> StorageResult<()> {
            Ok(())
        }

        async fn ping(&self) -> StorageResult<i64> {
            Ok(0)
        }

        async fn upsert_summaries(&self, cards: &[CardSummary]) -> StorageResult<usize> {
            Ok(cards.len())
        }

        async fn replace_detail(&self, _detail: &CardDetail, _log: Option<&CollectionLogEntry>) -> StorageResult<()> {
            Ok(())
        }

        async fn find_missing_detail(&self, _limit: u32) -> StorageResult<Vec<BackfillCandidate>> {
            Ok(vec![BackfillCandidate {
                card_id: CardId::parse("00001").unwrap(),
                regulation: Regulation::SV,
            }])
        }
    }

    struct Unreachable;

    #[async_trait]
    impl CardDetailCollector for Unreachable {
        async fn fetch(&self, _card_id: &CardId, _regulation: Regulation) -> Result<CardDetail, ScrapeError> {
            Err(ScrapeError::Network {
                message: "net::ERR_CONNECTION_RESET".into(),
            })
        }
    }

    /// Times out on 00001 and returns a full detail for everything else.
    struct TimesOutOnFirst;

    #[async_trait]
    impl CardDetailCollector for TimesOutOnFirst {
        async fn fetch(&self, card_id: &CardId, regulation: Regulation) -> Result<CardDetail, ScrapeError> {
            if card_id.as_str() == "00001" {
                return Err(ScrapeError::timeout("navigation", "30000ms exceeded"));
            }
            let mut detail = CardDetail::new(CardSummary::new(card_id.clone(), "ライチュウ", regulation));
            detail.hp = Some(120);
            Ok(detail)
        }
    }

    #[tokio::test]
    async fn transient_failure_does_not_stop_the_run() -> anyhow::Result<()> {
        let connection = DatabaseConnection::in_memory().await?;
        let repository = SqliteCardRepository::new(connection.pool().clone());
        repository.initialize_schema().await?;
        let cards = ["00001", "00002"].map(|id| CardSummary::new(CardId::parse(id).unwrap(), id, Regulation::SV));
        repository.upsert_summaries(&cards).await?;
        let store: Arc<dyn RecordStore> = Arc::new(repository);

        let report = DetailBackfill::new(Arc::new(TimesOutOnFirst), Arc::clone(&store), 0)
            .run(10)
            .await?;
        assert_eq!(
            report,
            BackfillReport {
                selected: 2,
                succeeded: 1,
                not_found: 0,
                failed: 1,
            }
        );

        let logs: Vec<(String, String)> =
            sqlx::query_as("SELECT card_id, status FROM collection_logs ORDER BY id")
                .fetch_all(connection.pool())
                .await?;
        assert_eq!(
            logs,
            vec![
                ("00001".to_string(), "error".to_string()),
                ("00002".to_string(), "success".to_string()),
            ]
        );

        let remaining = store.find_missing_detail(10).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].card_id.as_str(), "00001");
        Ok(())
    }

    #[tokio::test]
    async fn log_write_failure_escalates() {
        let backfill = DetailBackfill::new(Arc::new(Unreachable), Arc::new(FailingStore), 0);
        let result = backfill.run(10).await;
        assert!(matches!(result, Err(StorageError::RemoteExecution { .. })));
    }
}
