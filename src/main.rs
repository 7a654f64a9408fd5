use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use pokeca_collector::application::{BackfillReport, CatalogCollection, DetailBackfill, ListReport};
use pokeca_collector::domain::{PaginationPolicy, RecordStore, Regulation};
use pokeca_collector::infrastructure::{
    AppConfig, ConfigManager, DatabaseConnection, DetailExtractor, ListCollector, PageSession, PageSource,
    RemoteCardRepository, SqliteCardRepository, StorageBackend, WranglerExecutor, init_logging_with_config,
};

#[derive(Parser)]
#[command(name = "pokeca-collector", version, about = "Pokémon card catalog collector")]
struct Cli {
    /// Storage backend; overrides the configured one
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    /// Explicit TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Direct,
    Remote,
}

impl From<BackendArg> for StorageBackend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Direct => Self::Direct,
            BackendArg::Remote => Self::Remote,
        }
    }
}

#[derive(Subcommand)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Collect card summaries from the search result pages
    CollectIds {
        /// Single regulation to traverse (XY, SM, S, SV)
        #[arg(long, conflicts_with = "all")]
        regulation: Option<Regulation>,
        /// Traverse every regulation in turn
        #[arg(long)]
        all: bool,
        /// Page cap; overrides the configured one
        #[arg(long)]
        pages: Option<u32>,
    },
    /// Backfill detail records for cards without hp
    CollectDetails {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Create tables and indexes
    InitDb,
    /// Check connectivity and report the card count
    VerifyDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ConfigManager::new(cli.config.as_deref()).load_config()?;
    if let Some(backend) = cli.backend {
        config.storage.backend = backend.into();
    }
    init_logging_with_config(&config.logging)?;

    let (store, connection) = open_store(&config).await?;
    let outcome = run(cli.command, &config, Arc::clone(&store)).await;

    drop(store);
    if let Some(connection) = connection {
        connection.close().await;
    }
    if let Err(e) = &outcome {
        error!("❌ {:#}", e);
    }
    outcome
}

async fn open_store(config: &AppConfig) -> Result<(Arc<dyn RecordStore>, Option<DatabaseConnection>)> {
    match config.storage.backend {
        StorageBackend::Direct => {
            let connection = DatabaseConnection::new(&config.storage.database_url, config.storage.max_connections)
                .await
                .with_context(|| format!("opening {}", config.storage.database_url))?;
            let store = SqliteCardRepository::new(connection.pool().clone());
            info!("Using direct SQLite store at {}", config.storage.database_url);
            Ok((Arc::new(store), Some(connection)))
        }
        StorageBackend::Remote => {
            let remote = config.storage.remote.clone();
            let chunk_chars = remote.chunk_chars;
            info!("Using remote D1 store {}", remote.database_name);
            let executor = WranglerExecutor::new(remote);
            Ok((Arc::new(RemoteCardRepository::new(Arc::new(executor), chunk_chars)), None))
        }
    }
}

async fn run(command: Commands, config: &AppConfig, store: Arc<dyn RecordStore>) -> Result<()> {
    match command {
        Commands::InitDb => {
            store.initialize_schema().await?;
            println!("Schema ready");
        }
        Commands::VerifyDb => {
            let count = store.ping().await?;
            println!("Store reachable: {count} cards");
        }
        Commands::CollectIds { regulation, all, pages } => {
            store.initialize_schema().await?;
            let max_pages = pages.or(config.list.max_pages);

            let reports = with_session(config, |source| async move {
                let collector = ListCollector::with_selectors(
                    source,
                    config.catalog.clone(),
                    config.list.clone(),
                    &config.parsing.list,
                )?;
                let policy = PaginationPolicy::new(config.list.full_page_threshold, max_pages);
                let collection = CatalogCollection::new(Arc::new(collector), store, policy, config.list.page_delay_ms);

                let reports = if all {
                    collection.collect_all(&Regulation::ALL).await?
                } else {
                    vec![collection.collect_regulation(regulation).await?]
                };
                Ok::<_, anyhow::Error>(reports)
            })
            .await?;
            reports.iter().for_each(print_list_report);
        }
        Commands::CollectDetails { limit } => {
            store.initialize_schema().await?;
            let limit = limit.unwrap_or(config.detail.default_limit);

            let report = with_session(config, |source| async move {
                let extractor = DetailExtractor::with_selectors(
                    source,
                    config.catalog.clone(),
                    config.detail.clone(),
                    &config.parsing.detail,
                )?;
                let backfill = DetailBackfill::new(Arc::new(extractor), store, config.detail.request_delay_ms);
                Ok::<_, anyhow::Error>(backfill.run(limit).await?)
            })
            .await?;
            print_backfill_report(&report);
        }
    }
    Ok(())
}

/// Opens the browser, runs `work` against it and closes the browser again,
/// also when `work` fails or the process is interrupted.
async fn with_session<T, F, Fut>(config: &AppConfig, work: F) -> Result<T>
where
    F: FnOnce(Arc<dyn PageSource>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let session = Arc::new(PageSession::open(config.browser.clone()).await?);
    let outcome = {
        let pages: Arc<dyn PageSource> = session.clone();
        tokio::select! {
            result = work(pages) => result,
            _ = tokio::signal::ctrl_c() => Err(anyhow!("interrupted")),
        }
    };

    match Arc::try_unwrap(session) {
        Ok(mut session) => {
            if let Err(e) = session.close().await {
                warn!("⚠️ Browser shutdown failed: {}", e);
            }
        }
        Err(_) => warn!("⚠️ Browser session still shared at shutdown"),
    }
    outcome
}

fn print_list_report(report: &ListReport) {
    let label = report.regulation.map_or("default view", Regulation::as_str);
    println!(
        "{label}: {} cards over {} pages (stopped: {})",
        report.cards, report.pages, report.stop_reason
    );
}

fn print_backfill_report(report: &BackfillReport) {
    println!(
        "Details: {} selected, {} stored, {} not found, {} failed",
        report.selected, report.succeeded, report.not_found, report.failed
    );
}
