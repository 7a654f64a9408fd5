//! Application layer module
//!
//! Use cases that drive the collectors against a record store:
//! - `catalog_collection`: paginated summary collection per regulation
//! - `detail_backfill`: detail completion for stored summaries lacking `hp`

pub mod catalog_collection;
pub mod detail_backfill;

pub use catalog_collection::{CatalogCollection, ListReport};
pub use detail_backfill::{BackfillReport, DetailBackfill};
