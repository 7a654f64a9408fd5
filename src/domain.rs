//! Domain module - card catalog entities and storage contracts
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod card;
pub mod collection_log;
pub mod errors;
pub mod pagination;
pub mod repositories;
pub mod services;

pub use card::{
    Ability, CardDetail, CardId, CardSummary, Category, DamageModifier, ElementalType,
    EnergyKind, EvolutionStage, Move, Regulation, TypedValue,
};
pub use collection_log::{CollectionLogEntry, LogStatus, DETAIL_PAGE_SOURCE};
pub use errors::{ErrorClass, ScrapeError, StorageError, StorageResult};
pub use pagination::{PageDecision, PaginationPolicy, StopReason};
pub use repositories::{
    BackfillCandidate, CollectionLog, MAX_BACKFILL_BATCH, RecordStore, clamp_backfill_limit,
};
pub use services::{CardDetailCollector, CardListCollector};
