//! Infrastructure layer: browser automation, HTML parsing, storage backends
//! and the ambient services (configuration, logging)

pub mod config;
pub mod database_connection;
pub mod detail_extractor;
pub mod error_classifier;
pub mod list_collector;
pub mod logging;
pub mod page_session;
pub mod parsing;
pub mod remote_card_repository;
pub mod remote_executor;
pub mod sql_script;
pub mod sqlite_card_repository;
pub mod static_pages;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, StorageBackend};
pub use database_connection::DatabaseConnection;
pub use detail_extractor::DetailExtractor;
pub use error_classifier::ErrorClassifier;
pub use list_collector::ListCollector;
pub use logging::{get_log_directory, init_logging_with_config};
pub use page_session::{PageError, PageSession, PageSource, RenderedPage};
pub use parsing::{DetailPageParser, ListPageParser, ParsingConfig, ParsingError, ParsingResult};
pub use remote_card_repository::RemoteCardRepository;
pub use remote_executor::{RemoteExecutor, WranglerExecutor};
pub use sqlite_card_repository::SqliteCardRepository;
pub use static_pages::{StaticPage, StaticPageSource};
