// Database connection and pool management
// SQLite pool for the direct card store, plus the schema shared with the remote store

use std::path::Path;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::domain::StorageResult;

/// Card catalog schema, one statement per entry.
///
/// Plain SQLite dialect so the same statements run on D1.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS cards (
        card_id TEXT PRIMARY KEY,
        name TEXT,
        full_name TEXT,
        category TEXT,
        image_url TEXT,
        detail_url TEXT,
        regulation TEXT,
        card_type TEXT,
        hp INTEGER,
        evolution_stage TEXT,
        pokemon_number INTEGER,
        weakness TEXT,
        weakness_type TEXT,
        weakness_value TEXT,
        resistance TEXT,
        resistance_type TEXT,
        resistance_value TEXT,
        retreat_cost INTEGER,
        set_name TEXT,
        set_code TEXT,
        card_number TEXT,
        rarity TEXT,
        illustrator TEXT,
        effect_text TEXT,
        energy_subtype TEXT,
        energy_kind TEXT,
        updated_at TEXT,
        last_verified_at TEXT
    )",
    r"CREATE TABLE IF NOT EXISTS moves (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id TEXT NOT NULL REFERENCES cards (card_id),
        name TEXT NOT NULL,
        name_clean TEXT,
        damage INTEGER,
        damage_modifier TEXT,
        effect TEXT,
        order_index INTEGER NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS move_energy_cost (
        move_id INTEGER NOT NULL REFERENCES moves (id),
        energy_type TEXT NOT NULL,
        order_index INTEGER NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS abilities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id TEXT NOT NULL REFERENCES cards (card_id),
        name TEXT NOT NULL,
        effect TEXT,
        order_index INTEGER NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS collection_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id TEXT NOT NULL,
        status TEXT NOT NULL,
        source TEXT NOT NULL,
        error_message TEXT,
        processing_time_ms INTEGER NOT NULL,
        logged_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_cards_hp ON cards (hp)",
    "CREATE INDEX IF NOT EXISTS idx_moves_card_id ON moves (card_id)",
    "CREATE INDEX IF NOT EXISTS idx_move_energy_cost_move_id ON move_energy_cost (move_id)",
    "CREATE INDEX IF NOT EXISTS idx_abilities_card_id ON abilities (card_id)",
    "CREATE INDEX IF NOT EXISTS idx_collection_logs_card_id ON collection_logs (card_id)",
];

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Opens (creating if needed) the database file behind `database_url`.
    pub async fn new(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let db_path = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);

        if !db_path.starts_with(":memory:") {
            if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        info!("Connected to card database at {}", db_path);
        Ok(Self { pool })
    }

    /// Single-connection in-memory database; the connection is never recycled
    /// so its contents live as long as the pool.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
