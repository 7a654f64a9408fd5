//! Search result page collection
//!
//! One call renders one result page through a [`PageSource`], runs the staged
//! readiness protocol and hands the snapshot to the list strategy chain.
//! Pagination and inter-page pacing belong to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::config::{CatalogConfig, ListCollectionConfig};
use super::page_session::{PageError, PageResult, PageSource, RenderedPage, pause, wait_until};
use super::parsing::{
    ListPageParser, ListParseContext, ListSelectors, ParsingResult, REGISTRY_SCRIPT, RenderedDocument, SearchRegistry,
};
use crate::domain::{CardListCollector, CardSummary, Regulation, ScrapeError};

pub const BODY_READY_SCRIPT: &str = "!!document.body";

/// Truthy once results are present: a non-empty in-page registry or any card link.
pub const RESULTS_PROBE_SCRIPT: &str = r#"(() => {
  const deck = window.PCGDECK;
  const names = deck && deck.searchItemName;
  if (names && Object.keys(names).length > 0) return true;
  return document.querySelectorAll('a[href*="/card/"]').length > 0;
})()"#;

pub const TRIGGER_SEARCH_SCRIPT: &str = r#"(() => {
  const form = document.querySelector('form[action*="card-search/index.php"]') || document.querySelector('form');
  if (form) {
    const button = form.querySelector('button[type="submit"], input[type="submit"]');
    if (button) { button.click(); return 'button'; }
    form.submit();
    return 'form';
  }
  const submit = document.querySelector('button[type="submit"], input[type="submit"]');
  if (submit) { submit.click(); return 'submit'; }
  return null;
})()"#;

pub const SCROLL_BOTTOM_SCRIPT: &str = r"(() => {
  const list = document.querySelector('.SearchResultList, #searchResult, .result-list');
  if (list) list.scrollTop = list.scrollHeight;
  window.scrollTo(0, document.body.scrollHeight);
  return true;
})()";

pub const SCROLL_HEIGHT_SCRIPT: &str = "document.body ? document.body.scrollHeight : 0";

const MAX_SCROLL_STEPS: u64 = 200;

pub struct ListCollector {
    pages: Arc<dyn PageSource>,
    catalog: CatalogConfig,
    config: ListCollectionConfig,
    parser: ListPageParser,
}

impl ListCollector {
    pub fn new(pages: Arc<dyn PageSource>, catalog: CatalogConfig, config: ListCollectionConfig) -> ParsingResult<Self> {
        Self::with_selectors(pages, catalog, config, &ListSelectors::default())
    }

    pub fn with_selectors(
        pages: Arc<dyn PageSource>,
        catalog: CatalogConfig,
        config: ListCollectionConfig,
        selectors: &ListSelectors,
    ) -> ParsingResult<Self> {
        Ok(Self {
            pages,
            catalog,
            config,
            parser: ListPageParser::with_config(selectors)?,
        })
    }

    async fn load(&self, url: &str, context: &ListParseContext) -> Result<Vec<CardSummary>, ScrapeError> {
        let page = self.pages.acquire().await?;
        let rendered = self.render(page.as_ref(), url).await;
        if let Err(e) = page.close().await {
            debug!("Failed to close result page: {}", e);
        }
        let (html, registry) = rendered?;

        let document = RenderedDocument::parse(&html, registry);
        let extraction = self.parser.parse(&document, context);
        debug!(strategy = ?extraction.strategy, cards = extraction.cards.len(), "List extraction finished");
        Ok(extraction.cards)
    }

    async fn render(&self, page: &dyn RenderedPage, url: &str) -> PageResult<(String, Option<SearchRegistry>)> {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let bound = Duration::from_millis;

        page.goto(url).await?;
        wait_until(page, BODY_READY_SCRIPT, bound(self.config.body_wait_ms), poll).await?;
        pause(self.config.initial_settle_ms).await;

        let mut ready = wait_until(page, RESULTS_PROBE_SCRIPT, bound(self.config.initial_wait_ms), poll).await?;

        if !ready {
            debug!("No pre-rendered results; triggering search");
            let trigger = ignore_evaluation_error(page.evaluate(TRIGGER_SEARCH_SCRIPT).await)?;
            debug!(?trigger, "Search triggered");
            ready = wait_until(page, RESULTS_PROBE_SCRIPT, bound(self.config.search_wait_ms), poll).await?;
        }

        let mut pass = 0;
        while !ready && pass < self.config.scroll_passes {
            pass += 1;
            ignore_evaluation_error(page.evaluate(SCROLL_BOTTOM_SCRIPT).await)?;
            pause(self.config.scroll_pass_pause_ms).await;
            ready = wait_until(page, RESULTS_PROBE_SCRIPT, Duration::ZERO, poll).await?;
            debug!(pass, ready, "Scroll pass finished");
        }

        self.staged_scroll(page).await?;
        let complement = format!(
            "document.querySelectorAll('img[src*=\"card_images\"]').length >= {}",
            self.config.full_complement_images
        );
        if !wait_until(page, &complement, bound(self.config.full_complement_wait_ms), poll).await? {
            debug!("Full image complement not reached");
        }
        pause(self.config.settle_ms).await;
        if !wait_until(page, RESULTS_PROBE_SCRIPT, bound(self.config.final_wait_ms), poll).await? {
            debug!("Results signal still absent after final wait");
        }

        let html = page.content().await?;
        let registry = ignore_evaluation_error(page.evaluate(REGISTRY_SCRIPT).await)?.and_then(SearchRegistry::from_value);
        Ok((html, registry))
    }

    /// Scrolls to the bottom in fixed steps so lazy images load, then back to the top.
    async fn staged_scroll(&self, page: &dyn RenderedPage) -> PageResult<()> {
        let height = ignore_evaluation_error(page.evaluate(SCROLL_HEIGHT_SCRIPT).await)?
            .and_then(|value| value.as_u64())
            .unwrap_or(0);
        let step = u64::from(self.config.scroll_step_px.max(1));
        let steps = height.div_ceil(step).min(MAX_SCROLL_STEPS);

        for index in 1..=steps {
            let y = (index * step).min(height);
            ignore_evaluation_error(page.evaluate(&format!("window.scrollTo(0, {y})")).await)?;
            pause(self.config.scroll_step_pause_ms).await;
        }
        ignore_evaluation_error(page.evaluate("window.scrollTo(0, 0)").await)?;
        pause(self.config.scroll_top_pause_ms).await;
        Ok(())
    }
}

#[async_trait]
impl CardListCollector for ListCollector {
    /// An empty first extraction is retried once after a delay.
    async fn fetch_page(&self, regulation: Option<Regulation>, page: u32) -> Result<Vec<CardSummary>, ScrapeError> {
        let url = self
            .catalog
            .search_page_url(regulation, page)
            .map_err(|e| ScrapeError::Unclassified { message: e.to_string() })?;
        let context = ListParseContext::new(regulation.unwrap_or(Regulation::CURRENT), self.catalog.clone());

        let cards = self.load(&url, &context).await?;
        if !cards.is_empty() {
            info!("Page {} ({}): {} cards", page, context.regulation, cards.len());
            return Ok(cards);
        }

        warn!("Page {} ({}) rendered no cards; retrying once", page, context.regulation);
        pause(self.config.empty_retry_delay_ms).await;
        let cards = self.load(&url, &context).await?;
        info!("Page {} ({}): {} cards after retry", page, context.regulation, cards.len());
        Ok(cards)
    }
}

/// Script failures inside a page that is still navigating are expected; the
/// following probe decides whether the step worked.
fn ignore_evaluation_error(result: PageResult<Value>) -> PageResult<Option<Value>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(PageError::Evaluation { message }) => {
            debug!("Ignoring script failure: {}", message);
            Ok(None)
        }
        Err(other) => Err(other),
    }
}
