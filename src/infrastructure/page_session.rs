//! Shared browser session and the page capability used by the collectors
//!
//! One Chromium process and one browsing context live for the whole run.
//! Every fetch gets its own page inside that context, so cookies persist
//! while DOM state never leaks between requests.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::infrastructure::config::BrowserSettings;

#[derive(Error, Debug, Clone)]
pub enum PageError {
    #[error("Browser launch failed: {message}")]
    Launch { message: String },

    #[error("Timeout during {operation} after {}ms", after.as_millis())]
    Timeout { operation: String, after: Duration },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("In-page evaluation failed: {message}")]
    Evaluation { message: String },

    #[error("Browser protocol error: {message}")]
    Protocol { message: String },

    #[error("Browser session already closed")]
    SessionClosed,
}

impl PageError {
    fn protocol(error: &CdpError) -> Self {
        match error {
            CdpError::Timeout => Self::Timeout {
                operation: "browser request".to_string(),
                after: Duration::ZERO,
            },
            other => Self::Protocol {
                message: other.to_string(),
            },
        }
    }
}

pub type PageResult<T> = Result<T, PageError>;

/// A loaded browser page as the collectors see it.
///
/// Waiting, scrolling and clicking are expressed as in-page scripts through
/// [`RenderedPage::evaluate`].
#[async_trait]
pub trait RenderedPage: Send + Sync {
    /// Navigates and waits for the load event, bounded by the navigation timeout.
    async fn goto(&self, url: &str) -> PageResult<()>;

    async fn title(&self) -> PageResult<String>;

    /// Evaluates an expression and returns its JSON value (`Null` for `undefined`).
    async fn evaluate(&self, script: &str) -> PageResult<Value>;

    /// Serialized DOM of the current document.
    async fn content(&self) -> PageResult<String>;

    async fn close(self: Box<Self>) -> PageResult<()>;
}

/// Hands out isolated pages
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn acquire(&self) -> PageResult<Box<dyn RenderedPage>>;
}

/// Polls `predicate` until it evaluates truthy or `timeout` elapses.
///
/// Evaluation failures while polling (e.g. a document being replaced) count as
/// "not yet"; any other page failure ends the wait with an error.
pub async fn wait_until(
    page: &dyn RenderedPage,
    predicate: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> PageResult<bool> {
    let started = Instant::now();
    loop {
        match page.evaluate(predicate).await {
            Ok(value) if is_truthy(&value) => return Ok(true),
            Ok(_) => {}
            Err(PageError::Evaluation { message }) => debug!("Readiness probe failed: {}", message),
            Err(other) => return Err(other),
        }
        if started.elapsed() >= timeout {
            return Ok(false);
        }
        tokio::time::sleep(poll_interval.min(timeout.saturating_sub(started.elapsed()))).await;
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

pub async fn pause(millis: u64) {
    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

struct SessionInner {
    browser: Browser,
    context_id: BrowserContextId,
    handler_task: JoinHandle<()>,
}

/// Owns the browser process and the shared context for one run
pub struct PageSession {
    settings: BrowserSettings,
    inner: Option<SessionInner>,
}

impl PageSession {
    /// Launches Chromium and creates the shared browsing context.
    pub async fn open(settings: BrowserSettings) -> PageResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.viewport_width, settings.viewport_height)
            .viewport(Viewport {
                width: settings.viewport_width,
                height: settings.viewport_height,
                ..Viewport::default()
            })
            .request_timeout(Duration::from_millis(settings.navigation_timeout_ms))
            .args(settings.launch_args.iter().cloned())
            .arg(format!("--lang={}", settings.locale));
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(|message| PageError::Launch { message })?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PageError::Launch { message: e.to_string() })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("chromiumoxide handler event error: {}", e);
                }
            }
        });

        let context_id = match browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                handler_task.abort();
                return Err(PageError::Launch {
                    message: format!("browser context: {e}"),
                });
            }
        };

        info!(headless = settings.headless, "Browser session opened");
        Ok(Self {
            settings,
            inner: Some(SessionInner {
                browser,
                context_id,
                handler_task,
            }),
        })
    }

    /// Disposes the context, then the process. Calling it again is a no-op.
    pub async fn close(&mut self) -> PageResult<()> {
        let Some(mut inner) = self.inner.take() else {
            return Ok(());
        };

        if let Err(e) = inner.browser.dispose_browser_context(inner.context_id.clone()).await {
            debug!("Ignoring browser context disposal error: {}", e);
        }
        let closed = inner.browser.close().await;
        if let Err(e) = inner.browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", e);
        }
        inner.handler_task.abort();
        info!("Browser session closed");

        closed.map(|_| ()).map_err(|e| PageError::protocol(&e))
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            warn!("PageSession dropped without close(); aborting browser handler");
            inner.handler_task.abort();
        }
    }
}

#[async_trait]
impl PageSource for PageSession {
    async fn acquire(&self) -> PageResult<Box<dyn RenderedPage>> {
        let inner = self.inner.as_ref().ok_or(PageError::SessionClosed)?;

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(inner.context_id.clone())
            .build()
            .map_err(|message| PageError::Protocol { message })?;
        let page = inner.browser.new_page(params).await.map_err(|e| PageError::protocol(&e))?;

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(self.settings.user_agent.clone())
            .accept_language(self.settings.locale.clone())
            .build()
            .map_err(|message| PageError::Protocol { message })?;
        page.set_user_agent(user_agent)
            .await
            .map_err(|e| PageError::protocol(&e))?;

        Ok(Box::new(ChromiumPage {
            page,
            navigation_timeout: Duration::from_millis(self.settings.navigation_timeout_ms),
        }))
    }
}

/// [`RenderedPage`] over a chromiumoxide tab
struct ChromiumPage {
    page: Page,
    navigation_timeout: Duration,
}

impl ChromiumPage {
    async fn bounded<T, F>(&self, operation: &str, future: F) -> PageResult<T>
    where
        F: std::future::Future<Output = Result<T, CdpError>> + Send,
    {
        match tokio::time::timeout(self.navigation_timeout, future).await {
            Ok(result) => result.map_err(|e| PageError::protocol(&e)),
            Err(_) => Err(PageError::Timeout {
                operation: operation.to_string(),
                after: self.navigation_timeout,
            }),
        }
    }
}

#[async_trait]
impl RenderedPage for ChromiumPage {
    async fn goto(&self, url: &str) -> PageResult<()> {
        debug!("Navigating to {}", url);
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(CdpError::Timeout)) | Err(_) => Err(PageError::Timeout {
                operation: format!("navigation to {url}"),
                after: self.navigation_timeout,
            }),
            Ok(Err(e)) => Err(PageError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn title(&self) -> PageResult<String> {
        let title = self.bounded("title", self.page.get_title()).await?;
        Ok(title.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> PageResult<Value> {
        match tokio::time::timeout(self.navigation_timeout, self.page.evaluate(script)).await {
            Ok(Ok(result)) => Ok(result.value().cloned().unwrap_or(Value::Null)),
            Ok(Err(CdpError::Timeout)) | Err(_) => Err(PageError::Timeout {
                operation: "evaluate".to_string(),
                after: self.navigation_timeout,
            }),
            Ok(Err(CdpError::JavascriptException(exception))) => Err(PageError::Evaluation {
                message: exception.text.clone(),
            }),
            Ok(Err(e)) => Err(PageError::Evaluation { message: e.to_string() }),
        }
    }

    async fn content(&self) -> PageResult<String> {
        self.bounded("content", self.page.content()).await
    }

    async fn close(self: Box<Self>) -> PageResult<()> {
        self.page.close().await.map_err(|e| PageError::protocol(&e))
    }
}
