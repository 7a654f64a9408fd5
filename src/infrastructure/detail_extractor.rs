//! Card detail page fetching
//!
//! Renders one detail page, detects the catalog's not-found page and hands
//! the snapshot to [`DetailPageParser`] on the rayon pool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::config::{CatalogConfig, DetailCollectionConfig};
use super::page_session::{PageResult, PageSource, RenderedPage, pause, wait_until};
use super::parsing::{DetailPageParser, DetailParseContext, DetailSelectors, ParsingResult, REGISTRY_SCRIPT, SearchRegistry};
use crate::domain::{CardDetail, CardDetailCollector, CardId, Regulation, ScrapeError};

const NOT_FOUND_MARKERS: [&str; 2] = ["404", "見つかりません"];
const STRUCTURE_READY_SCRIPT: &str = "document.querySelector('h2, h1') !== null";

struct Snapshot {
    title: String,
    html: String,
    registry: Option<SearchRegistry>,
}

pub struct DetailExtractor {
    pages: Arc<dyn PageSource>,
    catalog: CatalogConfig,
    config: DetailCollectionConfig,
    parser: Arc<DetailPageParser>,
}

impl DetailExtractor {
    pub fn new(pages: Arc<dyn PageSource>, catalog: CatalogConfig, config: DetailCollectionConfig) -> ParsingResult<Self> {
        Self::with_selectors(pages, catalog, config, &DetailSelectors::default())
    }

    pub fn with_selectors(
        pages: Arc<dyn PageSource>,
        catalog: CatalogConfig,
        config: DetailCollectionConfig,
        selectors: &DetailSelectors,
    ) -> ParsingResult<Self> {
        Ok(Self {
            pages,
            catalog,
            config,
            parser: Arc::new(DetailPageParser::with_config(selectors)?),
        })
    }

    async fn snapshot(&self, page: &dyn RenderedPage, url: &str) -> PageResult<Snapshot> {
        page.goto(url).await?;
        let title = page.title().await?;

        let marker_wait = Duration::from_millis(self.config.marker_wait_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        if !wait_until(page, STRUCTURE_READY_SCRIPT, marker_wait, poll).await.unwrap_or(false) {
            debug!("Structural marker not found on {}", url);
        }
        pause(self.config.settle_delay_ms).await;

        let html = page.content().await?;
        let registry = page
            .evaluate(REGISTRY_SCRIPT)
            .await
            .ok()
            .and_then(SearchRegistry::from_value);
        Ok(Snapshot { title, html, registry })
    }
}

#[async_trait]
impl CardDetailCollector for DetailExtractor {
    async fn fetch(&self, card_id: &CardId, regulation: Regulation) -> Result<CardDetail, ScrapeError> {
        let url = self.catalog.detail_page_url(card_id, Some(regulation));

        let page = self.pages.acquire().await?;
        let snapshot = self.snapshot(page.as_ref(), &url).await;
        if let Err(e) = page.close().await {
            debug!("Failed to close detail page: {}", e);
        }
        let snapshot = snapshot?;

        if NOT_FOUND_MARKERS.iter().any(|marker| snapshot.title.contains(marker)) {
            info!("Card {} not found ({})", card_id, snapshot.title);
            return Err(ScrapeError::not_found(card_id));
        }

        let image_url = snapshot
            .registry
            .as_ref()
            .and_then(|registry| registry.image_path(card_id.as_str()))
            .map(|path| self.catalog.resolve(path));
        let context = DetailParseContext {
            card_id: card_id.clone(),
            regulation,
            detail_url: url,
            image_url,
        };

        let parser = Arc::clone(&self.parser);
        let html = snapshot.html;
        tokio::task::spawn_blocking(move || parser.parse(&html, &context))
            .await
            .map_err(|e| ScrapeError::Unclassified {
                message: format!("detail parsing task failed: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{Category, ErrorClass};
    use crate::infrastructure::static_pages::{StaticPage, StaticPageSource};

    const PIKACHU: &str = include_str!("../../tests/fixtures/detail_pokemon.html");

    fn extractor(source: StaticPageSource) -> (DetailExtractor, Arc<StaticPageSource>) {
        let source = Arc::new(source);
        let config = DetailCollectionConfig {
            marker_wait_ms: 0,
            settle_delay_ms: 0,
            poll_interval_ms: 1,
            ..DetailCollectionConfig::default()
        };
        let extractor = DetailExtractor::new(source.clone(), CatalogConfig::default(), config).unwrap();
        (extractor, source)
    }

    #[tokio::test]
    async fn detail_page_is_parsed_with_registry_image() -> anyhow::Result<()> {
        let page = StaticPage::new("ピカチュウ | ポケモンカードゲーム", PIKACHU).with_registry(json!({
            "entries": [],
            "images": {"45123": "/assets/images/card_images/large/SV1V/045123_P_PIKACHU.jpg"}
        }));
        let (extractor, source) = extractor(StaticPageSource::new().route("/card/45123/regu/SV/", page));

        let card_id = CardId::parse("45123").unwrap();
        let detail = extractor.fetch(&card_id, Regulation::SV).await?;

        assert_eq!(detail.summary.category, Category::Pokemon);
        assert_eq!(detail.hp, Some(60));
        assert_eq!(
            detail.summary.image_url.as_deref(),
            Some("https://www.pokemon-card.com/assets/images/card_images/large/SV1V/045123_P_PIKACHU.jpg")
        );
        assert!(detail.summary.detail_url.unwrap().ends_with("/card/45123/regu/SV/"));
        assert_eq!(source.pages_closed(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn not_found_title_is_terminal() {
        let page = StaticPage::new("404 Not Found | ページが見つかりません", "<h1>404</h1>");
        let (extractor, source) = extractor(StaticPageSource::new().route("/card/", page));

        let error = extractor
            .fetch(&CardId::parse("00002").unwrap(), Regulation::SV)
            .await
            .unwrap_err();
        assert_eq!(error.class(), ErrorClass::NotFound);
        assert!(error.is_terminal());
        assert_eq!(source.pages_closed(), 1);
    }
}
