//! Pre-rendered page snapshots served through the [`PageSource`] interface
//!
//! Used to replay saved catalog pages without a browser. Routes are matched
//! by URL substring in registration order. Every readiness probe is answered
//! as satisfied since a snapshot is already fully rendered.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::page_session::{PageError, PageResult, PageSource, RenderedPage};
use super::parsing::REGISTRY_SCRIPT;

#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    pub title: String,
    pub html: String,
    /// Value returned for the registry script; `Null` when absent
    pub registry: Value,
}

impl StaticPage {
    pub fn new(title: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            html: html.into(),
            registry: Value::Null,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Value) -> Self {
        self.registry = registry;
        self
    }
}

#[derive(Default)]
struct Counters {
    acquired: AtomicUsize,
    closed: AtomicUsize,
}

#[derive(Default)]
pub struct StaticPageSource {
    routes: Vec<(String, StaticPage)>,
    counters: Arc<Counters>,
}

impl StaticPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn route(mut self, url_fragment: impl Into<String>, page: StaticPage) -> Self {
        self.routes.push((url_fragment.into(), page));
        self
    }

    pub fn pages_acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for StaticPageSource {
    async fn acquire(&self) -> PageResult<Box<dyn RenderedPage>> {
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticTab {
            routes: self.routes.clone(),
            current: Mutex::new(None),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct StaticTab {
    routes: Vec<(String, StaticPage)>,
    current: Mutex<Option<StaticPage>>,
    counters: Arc<Counters>,
}

impl StaticTab {
    fn loaded(&self) -> PageResult<StaticPage> {
        let current = self.current.lock().map_err(|_| PageError::SessionClosed)?;
        current.clone().ok_or(PageError::Evaluation {
            message: "no document loaded".to_string(),
        })
    }
}

#[async_trait]
impl RenderedPage for StaticTab {
    async fn goto(&self, url: &str) -> PageResult<()> {
        let page = self
            .routes
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, page)| page.clone())
            .ok_or_else(|| PageError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            })?;
        *self.current.lock().map_err(|_| PageError::SessionClosed)? = Some(page);
        Ok(())
    }

    async fn title(&self) -> PageResult<String> {
        Ok(self.loaded()?.title)
    }

    async fn evaluate(&self, script: &str) -> PageResult<Value> {
        let page = self.loaded()?;
        if script == REGISTRY_SCRIPT {
            Ok(page.registry)
        } else {
            Ok(Value::Bool(true))
        }
    }

    async fn content(&self) -> PageResult<String> {
        Ok(self.loaded()?.html)
    }

    async fn close(self: Box<Self>) -> PageResult<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_match_by_fragment() -> anyhow::Result<()> {
        let source = StaticPageSource::new().route("/card/00001/", StaticPage::new("Card", "<h1>x</h1>"));
        let page = source.acquire().await?;

        page.goto("https://example.test/card/00001/regu/SV/").await?;
        assert_eq!(page.title().await?, "Card");
        assert_eq!(page.evaluate(REGISTRY_SCRIPT).await?, Value::Null);
        assert!(page.goto("https://example.test/card/00002/").await.is_err());

        page.close().await?;
        assert_eq!((source.pages_acquired(), source.pages_closed()), (1, 1));
        Ok(())
    }
}
