//! Remote card store: the same writes as the direct store, shipped as SQL
//! scripts through a [`RemoteExecutor`]
//!
//! Summary scripts are packed greedily up to the configured ceiling. A detail
//! update and its log entry travel together as one script; the remote side
//! applies it statement by statement, so delivery is best-effort rather than
//! transactional.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::database_connection::SCHEMA_STATEMENTS;
use super::remote_executor::{RemoteExecutor, RemoteRow};
use super::sql_script::{self, COUNT_CARDS_SQL, MISSING_DETAIL_SQL, SqlValue, Statement};
use crate::domain::{
    BackfillCandidate, CardDetail, CardId, CardSummary, CollectionLog, CollectionLogEntry,
    RecordStore, Regulation, StorageError, StorageResult, clamp_backfill_limit,
};

pub struct RemoteCardRepository {
    executor: Arc<dyn RemoteExecutor>,
    chunk_chars: usize,
}

impl RemoteCardRepository {
    pub fn new(executor: Arc<dyn RemoteExecutor>, chunk_chars: usize) -> Self {
        Self {
            executor,
            chunk_chars: chunk_chars.max(1),
        }
    }
}

fn text_field(row: &RemoteRow, column: &str) -> StorageResult<String> {
    match row.get(column) {
        Some(Value::String(text)) => Ok(text.clone()),
        other => Err(StorageError::InvalidRow {
            reason: format!("column {column} is {other:?}"),
        }),
    }
}

fn row_to_candidate(row: &RemoteRow) -> StorageResult<BackfillCandidate> {
    let raw_id = text_field(row, "card_id")?;
    let card_id = CardId::parse(&raw_id).ok_or_else(|| StorageError::InvalidRow {
        reason: format!("malformed card_id {raw_id:?}"),
    })?;
    let regulation = text_field(row, "regulation")?
        .parse()
        .unwrap_or(Regulation::CURRENT);
    Ok(BackfillCandidate { card_id, regulation })
}

#[async_trait]
impl CollectionLog for RemoteCardRepository {
    async fn append(&self, entry: &CollectionLogEntry) -> StorageResult<()> {
        self.executor.execute(&sql_script::log_insert(entry).render()).await
    }
}

#[async_trait]
impl RecordStore for RemoteCardRepository {
    async fn initialize_schema(&self) -> StorageResult<()> {
        let script = SCHEMA_STATEMENTS
            .iter()
            .map(|statement| format!("{statement};"))
            .collect::<Vec<_>>()
            .join("\n");
        self.executor.execute(&script).await?;
        info!("Remote card schema initialized");
        Ok(())
    }

    async fn ping(&self) -> StorageResult<i64> {
        let rows = self.executor.query(&format!("{COUNT_CARDS_SQL};")).await?;
        rows.first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .ok_or_else(|| StorageError::RemoteOutput {
                reason: "count missing from ping result".to_string(),
            })
    }

    async fn upsert_summaries(&self, cards: &[CardSummary]) -> StorageResult<usize> {
        let scripts: Vec<String> = cards
            .iter()
            .map(|card| sql_script::summary_upsert(card).render())
            .collect();
        let chunks = sql_script::pack_scripts(&scripts, self.chunk_chars);

        for (index, chunk) in chunks.iter().enumerate() {
            if chunk.chars().count() > self.chunk_chars {
                warn!("Summary script of {} chars exceeds the chunk ceiling; sending alone", chunk.chars().count());
            }
            self.executor.execute(chunk).await?;
            debug!("Remote summary chunk {}/{} delivered", index + 1, chunks.len());
        }
        Ok(cards.len())
    }

    async fn replace_detail(
        &self,
        detail: &CardDetail,
        log: Option<&CollectionLogEntry>,
    ) -> StorageResult<()> {
        let script = sql_script::detail_script(detail, log, Utc::now());
        self.executor.execute(&script).await?;
        debug!(card_id = %detail.card_id(), chars = script.chars().count(), "Remote detail delivered");
        Ok(())
    }

    async fn find_missing_detail(&self, limit: u32) -> StorageResult<Vec<BackfillCandidate>> {
        let statement = Statement::new(
            MISSING_DETAIL_SQL,
            vec![SqlValue::Integer(i64::from(clamp_backfill_limit(limit)))],
        );
        let rows = self.executor.query(&statement.render()).await?;
        rows.iter().map(row_to_candidate).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::DateTime;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingExecutor {
        scripts: Mutex<Vec<String>>,
        rows: Vec<RemoteRow>,
    }

    impl RecordingExecutor {
        fn scripts(&self) -> Vec<String> {
            self.scripts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteExecutor for RecordingExecutor {
        async fn execute(&self, script: &str) -> StorageResult<()> {
            self.scripts.lock().unwrap().push(script.to_string());
            Ok(())
        }

        async fn query(&self, script: &str) -> StorageResult<Vec<RemoteRow>> {
            self.scripts.lock().unwrap().push(script.to_string());
            Ok(self.rows.clone())
        }
    }

    fn summaries(count: usize) -> Vec<CardSummary> {
        let fixed = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        (1..=count)
            .map(|n| {
                let mut card = CardSummary::new(CardId::parse(&format!("{n:05}")).unwrap(), format!("card {n}"), Regulation::SV);
                card.updated_at = fixed;
                card
            })
            .collect()
    }

    #[tokio::test]
    async fn summaries_are_packed_under_the_ceiling() -> anyhow::Result<()> {
        let executor = Arc::new(RecordingExecutor::default());
        let one = sql_script::summary_upsert(&summaries(1)[0]).render().chars().count();
        let repo = RemoteCardRepository::new(executor.clone(), one * 3 + 2);

        assert_eq!(repo.upsert_summaries(&summaries(7)).await?, 7);

        let scripts = executor.scripts();
        assert_eq!(scripts.len(), 3);
        assert_eq!(scripts[0].lines().count(), 3);
        assert_eq!(scripts[2].lines().count(), 1);
        assert!(scripts.iter().all(|s| s.chars().count() <= one * 3 + 2));
        Ok(())
    }

    #[tokio::test]
    async fn detail_and_log_share_one_script() -> anyhow::Result<()> {
        let executor = Arc::new(RecordingExecutor::default());
        let repo = RemoteCardRepository::new(executor.clone(), 6000);
        let mut detail = CardDetail::new(summaries(1).remove(0));
        detail.hp = Some(60);
        let log = CollectionLogEntry::success(detail.card_id().clone(), 3);

        repo.replace_detail(&detail, Some(&log)).await?;

        let scripts = executor.scripts();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].starts_with("INSERT INTO cards"));
        assert!(scripts[0].contains("INSERT INTO collection_logs"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_detail_reads_rows() -> anyhow::Result<()> {
        let executor = Arc::new(RecordingExecutor {
            rows: vec![
                json!({"card_id": "00001", "regulation": "SV"}).as_object().cloned().unwrap(),
                json!({"card_id": "00002", "regulation": "SM"}).as_object().cloned().unwrap(),
            ],
            ..RecordingExecutor::default()
        });
        let repo = RemoteCardRepository::new(executor.clone(), 6000);

        let candidates = repo.find_missing_detail(9999).await?;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].regulation, Regulation::SM);
        assert!(executor.scripts()[0].ends_with("LIMIT 500;"));
        Ok(())
    }
}
