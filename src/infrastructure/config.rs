//! Configuration infrastructure
//!
//! Settings are layered in this order (later wins):
//! 1. Built-in defaults (`AppConfig::default()`, values from [`defaults`])
//! 2. An optional config file (explicit path, `./pokeca.toml`, or the user config dir)
//! 3. `POKECA__<SECTION>__<KEY>` environment variables
//! 4. `DATABASE_URL` for the direct store

#![allow(clippy::derivable_impls)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::domain::{CardId, Regulation};
use crate::infrastructure::parsing::ParsingConfig;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub browser: BrowserSettings,
    pub list: ListCollectionConfig,
    pub detail: DetailCollectionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    /// CSS selector overrides for both page kinds
    pub parsing: ParsingConfig,
}

/// Catalog site endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::CATALOG_BASE_URL.to_string(),
        }
    }
}

impl CatalogConfig {
    /// Search result URL. Without a regulation the catalog shows its current view;
    /// page 1 carries no `pg` parameter.
    pub fn search_page_url(&self, regulation: Option<Regulation>, page: u32) -> Result<String> {
        let mut url = Url::parse(&self.base_url)
            .and_then(|base| base.join(defaults::SEARCH_PATH))
            .with_context(|| format!("Invalid catalog base URL: {}", self.base_url))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("keyword", "")
                .append_pair("se_ta", "")
                .append_pair("illust", "")
                .append_pair("sm_and_keyword", "true");
            if let Some(regulation) = regulation {
                query.append_pair("regulation_sidebar_form", regulation.as_str());
            }
            if page > 1 {
                query.append_pair("pg", &page.to_string());
            }
        }
        Ok(url.into())
    }

    pub fn detail_page_url(&self, card_id: &CardId, regulation: Option<Regulation>) -> String {
        let mut url = format!(
            "{}/{}{}/",
            self.base_url.trim_end_matches('/'),
            defaults::DETAIL_PATH,
            card_id
        );
        if let Some(regulation) = regulation {
            url.push_str(&format!("regu/{regulation}/"));
        }
        url
    }

    /// Makes a site-relative path absolute; absolute URLs pass through.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if let Some(rest) = path.strip_prefix("//") {
            format!("https://{rest}")
        } else {
            let base = self.base_url.trim_end_matches('/');
            if path.starts_with('/') {
                format!("{base}{path}")
            } else {
                format!("{base}/{path}")
            }
        }
    }
}

/// Headless browser launch profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub user_agent: String,
    pub locale: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub launch_args: Vec<String>,
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_agent: defaults::USER_AGENT.to_string(),
            locale: "ja-JP".to_string(),
            viewport_width: 1280,
            viewport_height: 720,
            launch_args: [
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-dev-shm-usage",
                "--disable-accelerated-2d-canvas",
                "--disable-gpu",
            ]
            .map(String::from)
            .to_vec(),
            navigation_timeout_ms: defaults::NAVIGATION_TIMEOUT_MS,
        }
    }
}

/// Search result pagination and readiness protocol bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListCollectionConfig {
    /// A page with at least this many cards is considered full
    pub full_page_threshold: usize,
    pub max_pages: Option<u32>,
    pub page_delay_ms: u64,
    pub body_wait_ms: u64,
    pub initial_settle_ms: u64,
    pub initial_wait_ms: u64,
    pub search_wait_ms: u64,
    pub scroll_passes: u32,
    pub scroll_pass_pause_ms: u64,
    pub scroll_step_px: u32,
    pub scroll_step_pause_ms: u64,
    pub scroll_top_pause_ms: u64,
    /// Card images expected once a page is fully loaded
    pub full_complement_images: usize,
    pub full_complement_wait_ms: u64,
    pub settle_ms: u64,
    pub final_wait_ms: u64,
    pub empty_retry_delay_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ListCollectionConfig {
    fn default() -> Self {
        Self {
            full_page_threshold: defaults::FULL_PAGE_THRESHOLD,
            max_pages: None,
            page_delay_ms: defaults::PAGE_DELAY_MS,
            body_wait_ms: 10_000,
            initial_settle_ms: 4_000,
            initial_wait_ms: 8_000,
            search_wait_ms: 35_000,
            scroll_passes: 3,
            scroll_pass_pause_ms: 1_500,
            scroll_step_px: 300,
            scroll_step_pause_ms: 900,
            scroll_top_pause_ms: 800,
            full_complement_images: 35,
            full_complement_wait_ms: 12_000,
            settle_ms: 2_000,
            final_wait_ms: 20_000,
            empty_retry_delay_ms: 5_000,
            poll_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailCollectionConfig {
    pub marker_wait_ms: u64,
    pub settle_delay_ms: u64,
    pub request_delay_ms: u64,
    pub default_limit: u32,
    pub poll_interval_ms: u64,
}

impl Default for DetailCollectionConfig {
    fn default() -> Self {
        Self {
            marker_wait_ms: 10_000,
            settle_delay_ms: 1_000,
            request_delay_ms: defaults::DETAIL_REQUEST_DELAY_MS,
            default_limit: defaults::DETAIL_BATCH_LIMIT,
            poll_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Direct,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
    pub remote: RemoteStoreConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Direct,
            database_url: defaults::DATABASE_URL.to_string(),
            max_connections: 10,
            remote: RemoteStoreConfig::default(),
        }
    }
}

/// Cloudflare D1 access through the wrangler CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteStoreConfig {
    pub database_name: String,
    /// Program used to run wrangler (`npx` runs the project-local install)
    pub program: String,
    pub working_dir: Option<PathBuf>,
    /// Ceiling for one packed summary script
    pub chunk_chars: usize,
    /// Scripts up to this size go through `--command`, longer ones through `--file`
    pub command_chars: usize,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            database_name: "pokeca".to_string(),
            program: "npx".to_string(),
            working_dir: None,
            chunk_chars: defaults::REMOTE_CHUNK_CHARS,
            command_chars: defaults::REMOTE_COMMAND_CHARS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    /// Defaults to `logs/` next to the executable
    pub directory: Option<PathBuf>,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            directory: None,
            file_name: "pokeca-collector.log".to_string(),
        }
    }
}

/// Loads [`AppConfig`] from defaults, file and environment
pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("pokeca-collector");
        Ok(config_dir)
    }

    /// Uses `explicit` when given, otherwise the first existing candidate file.
    pub fn new(explicit: Option<&Path>) -> Self {
        let config_path = explicit.map(Path::to_path_buf).or_else(|| {
            let local = PathBuf::from("pokeca.toml");
            if local.exists() {
                return Some(local);
            }
            Self::get_config_dir()
                .ok()
                .map(|dir| dir.join("config.toml"))
                .filter(|path| path.exists())
        });
        Self { config_path }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&AppConfig::default()).context("Failed to serialize default configuration")?,
        );
        if let Some(path) = &self.config_path {
            info!("Loading configuration from {:?}", path);
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("POKECA")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            config.storage.database_url = database_url;
        }
        Ok(config)
    }
}

/// Default configuration values
pub mod defaults {
    pub const CATALOG_BASE_URL: &str = "https://www.pokemon-card.com";

    pub const SEARCH_PATH: &str = "card-search/index.php";

    pub const DETAIL_PATH: &str = "card-search/details.php/card/";

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    pub const NAVIGATION_TIMEOUT_MS: u64 = 30_000;

    /// Cards per full search result page
    pub const FULL_PAGE_THRESHOLD: usize = 50;

    pub const PAGE_DELAY_MS: u64 = 1_500;

    pub const DETAIL_REQUEST_DELAY_MS: u64 = 1_200;

    pub const DETAIL_BATCH_LIMIT: u32 = 50;

    pub const DATABASE_URL: &str = "sqlite://data/pokeca.db";

    pub const REMOTE_CHUNK_CHARS: usize = 6_000;

    pub const REMOTE_COMMAND_CHARS: usize = 4_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_omits_page_parameter() {
        let catalog = CatalogConfig::default();
        let url = catalog.search_page_url(None, 1).unwrap();
        assert_eq!(
            url,
            "https://www.pokemon-card.com/card-search/index.php?keyword=&se_ta=&illust=&sm_and_keyword=true"
        );
    }

    #[test]
    fn later_pages_carry_regulation_and_offset() {
        let catalog = CatalogConfig::default();
        let url = catalog.search_page_url(Some(Regulation::XY), 3).unwrap();
        assert!(url.ends_with("&regulation_sidebar_form=XY&pg=3"));
    }

    #[test]
    fn detail_url_appends_regulation_segment() {
        let catalog = CatalogConfig::default();
        let id = CardId::parse("45123").unwrap();
        assert_eq!(
            catalog.detail_page_url(&id, Some(Regulation::SV)),
            "https://www.pokemon-card.com/card-search/details.php/card/45123/regu/SV/"
        );
        assert_eq!(
            catalog.detail_page_url(&id, None),
            "https://www.pokemon-card.com/card-search/details.php/card/45123/"
        );
    }

    #[test]
    fn resolve_handles_relative_and_absolute_paths() {
        let catalog = CatalogConfig::default();
        assert_eq!(
            catalog.resolve("/assets/images/card_images/large/SV1/045123_P_X.jpg"),
            "https://www.pokemon-card.com/assets/images/card_images/large/SV1/045123_P_X.jpg"
        );
        assert_eq!(catalog.resolve("https://cdn.example/x.png"), "https://cdn.example/x.png");
    }

    #[test]
    fn load_config_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[list]\nfull_page_threshold = 40\n\n[storage]\nbackend = \"remote\"\n",
        )
        .unwrap();

        let config = ConfigManager::new(Some(&path)).load_config().unwrap();
        assert_eq!(config.list.full_page_threshold, 40);
        assert_eq!(config.storage.backend, StorageBackend::Remote);
        assert_eq!(config.detail.default_limit, defaults::DETAIL_BATCH_LIMIT);
    }
}
