//! Direct card store over a pooled SQLite connection
//!
//! Summaries are merged one statement per card inside a single transaction;
//! a detail update is all-or-nothing.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::{debug, info, warn};

use super::database_connection::SCHEMA_STATEMENTS;
use super::sql_script::{
    self, COUNT_CARDS_SQL, MISSING_DETAIL_SQL, SqlValue, Statement,
};
use crate::domain::{
    BackfillCandidate, CardDetail, CardId, CardSummary, CollectionLog, CollectionLogEntry,
    RecordStore, Regulation, StorageError, StorageResult, clamp_backfill_limit,
};

#[derive(Clone)]
pub struct SqliteCardRepository {
    pool: SqlitePool,
}

impl SqliteCardRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn bind(statement: &Statement) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    statement
        .values
        .iter()
        .fold(sqlx::query(statement.sql), |query, value| match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(number) => query.bind(*number),
            SqlValue::Text(text) => query.bind(text.as_str()),
        })
}

fn row_to_candidate(row: &sqlx::sqlite::SqliteRow) -> StorageResult<BackfillCandidate> {
    let raw_id: String = row.try_get("card_id")?;
    let raw_regulation: String = row.try_get("regulation")?;
    let card_id = CardId::parse(&raw_id).ok_or_else(|| StorageError::InvalidRow {
        reason: format!("malformed card_id {raw_id:?}"),
    })?;
    let regulation = raw_regulation.parse().unwrap_or_else(|_| {
        warn!("Stored regulation {:?} for {} is unknown; using {}", raw_regulation, card_id, Regulation::CURRENT);
        Regulation::CURRENT
    });
    Ok(BackfillCandidate { card_id, regulation })
}

#[async_trait]
impl CollectionLog for SqliteCardRepository {
    async fn append(&self, entry: &CollectionLogEntry) -> StorageResult<()> {
        bind(&sql_script::log_insert(entry)).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteCardRepository {
    async fn initialize_schema(&self) -> StorageResult<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Card schema initialized ({} statements)", SCHEMA_STATEMENTS.len());
        Ok(())
    }

    async fn ping(&self) -> StorageResult<i64> {
        let row = sqlx::query(COUNT_CARDS_SQL).fetch_one(&self.pool).await?;
        Ok(row.try_get("count")?)
    }

    async fn upsert_summaries(&self, cards: &[CardSummary]) -> StorageResult<usize> {
        if cards.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for card in cards {
            bind(&sql_script::summary_upsert(card)).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!("Upserted {} card summaries", cards.len());
        Ok(cards.len())
    }

    async fn replace_detail(
        &self,
        detail: &CardDetail,
        log: Option<&CollectionLogEntry>,
    ) -> StorageResult<()> {
        let statements = sql_script::detail_statements(detail, Utc::now());

        let mut tx = self.pool.begin().await?;
        for statement in &statements {
            bind(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(
            card_id = %detail.card_id(),
            moves = detail.moves.len(),
            abilities = detail.abilities.len(),
            "Detail replaced"
        );

        if let Some(entry) = log {
            self.append(entry).await?;
        }
        Ok(())
    }

    async fn find_missing_detail(&self, limit: u32) -> StorageResult<Vec<BackfillCandidate>> {
        let rows = sqlx::query(MISSING_DETAIL_SQL)
            .bind(i64::from(clamp_backfill_limit(limit)))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_candidate).collect()
    }
}
