//! Pokémon card catalog collector
//!
//! Renders the official card-search site in a headless browser, extracts
//! card summaries and detail records, and stores them in SQLite either
//! directly or through a remote D1 database.

pub mod application;
pub mod domain;
pub mod infrastructure;
