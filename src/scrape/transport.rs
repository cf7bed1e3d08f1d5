//! Shared fetch/render transport for the platform scrapers.
//!
//! Every outbound request goes through here: a fixed courtesy delay before
//! each request, a hard timeout, and a rotating desktop user-agent. The
//! render path drives a headless Chromium instance for profile pages that
//! only populate after client-side JS runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use super::ScrapeError;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_millis(1000);

/// How long the render path waits for a content marker before taking the
/// snapshot anyway.
pub const MARKER_TIMEOUT: Duration = Duration::from_secs(8);

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Rotation state for outbound user-agents. The cursor only advances
/// through `next_agent`, so concurrent scrapes share one well-defined
/// update path instead of a hidden global counter.
pub struct UserAgentPool {
    agents: &'static [&'static str],
    cursor: AtomicUsize,
}

impl UserAgentPool {
    pub fn new() -> Self {
        Self {
            agents: USER_AGENTS,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn next_agent(&self) -> &'static str {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.agents[i % self.agents.len()]
    }
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Transport {
    client: reqwest::Client,
    delay: Duration,
    agents: UserAgentPool,
    marker_timeout: Duration,
}

impl Transport {
    pub fn new() -> Result<Self, ScrapeError> {
        Self::with_delay(DEFAULT_RATE_LIMIT_DELAY)
    }

    pub fn with_delay(delay: Duration) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ScrapeError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            delay,
            agents: UserAgentPool::new(),
            marker_timeout: MARKER_TIMEOUT,
        })
    }

    /// GET `url` after the courtesy delay. Status handling is left to the
    /// caller; timeouts surface as `ScrapeError::Timeout`.
    pub async fn request(&self, url: &str) -> Result<reqwest::Response, ScrapeError> {
        sleep(self.delay).await;
        debug!("fetching {url}");

        self.client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.agents.next_agent())
            .send()
            .await
            .map_err(ScrapeError::from)
    }

    /// GET `url` and return the body, failing on any non-success status.
    pub async fn fetch_page(&self, url: &str) -> Result<String, ScrapeError> {
        let resp = self.request(url).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Fetch(format!("HTTP {status} for {url}")));
        }
        resp.text().await.map_err(ScrapeError::from)
    }

    /// Render `url` in headless Chromium and return the serialized DOM.
    ///
    /// Waits up to `MARKER_TIMEOUT` for any of `markers` to appear in the
    /// rendered content, then proceeds best-effort with whatever loaded.
    /// The browser is torn down on every exit path.
    pub async fn render_page(&self, url: &str, markers: &[&str]) -> Result<String, ScrapeError> {
        sleep(self.delay).await;
        debug!("rendering {url}");

        let config = BrowserConfig::builder()
            .window_size(1280, 720)
            .no_sandbox()
            .build()
            .map_err(ScrapeError::Fetch)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Fetch(format!("failed to launch browser: {e}")))?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let snapshot = self.snapshot_page(&browser, url, markers).await;

        if let Err(e) = browser.close().await {
            warn!("failed to close browser cleanly: {e}");
        }
        let _ = browser.wait().await;
        events.abort();

        snapshot
    }

    async fn snapshot_page(
        &self,
        browser: &Browser,
        url: &str,
        markers: &[&str],
    ) -> Result<String, ScrapeError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Fetch(format!("failed to open page: {e}")))?;

        page.set_user_agent(self.agents.next_agent())
            .await
            .map_err(|e| ScrapeError::Fetch(format!("failed to set user agent: {e}")))?;

        timeout(REQUEST_TIMEOUT, page.goto(url.to_string()))
            .await
            .map_err(|_| {
                ScrapeError::Timeout(format!("navigation to {url} exceeded {REQUEST_TIMEOUT:?}"))
            })?
            .map_err(|e| ScrapeError::Fetch(format!("navigation to {url} failed: {e}")))?;

        let _ = page.wait_for_navigation().await;

        let deadline = Instant::now() + self.marker_timeout;
        loop {
            let html = page
                .content()
                .await
                .map_err(|e| ScrapeError::Fetch(format!("failed to read rendered page: {e}")))?;

            if markers.iter().any(|m| html.contains(m)) {
                return Ok(html);
            }
            if Instant::now() >= deadline {
                warn!("content markers not found on {url}, continuing with rendered snapshot");
                return Ok(html);
            }
            sleep(Duration::from_millis(250)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_pool_rotates_and_wraps() {
        let pool = UserAgentPool::new();
        let first = pool.next_agent();
        let mut seen = vec![first];
        for _ in 1..USER_AGENTS.len() {
            seen.push(pool.next_agent());
        }
        // One full cycle visits every agent once, then wraps to the start.
        assert_eq!(seen.len(), USER_AGENTS.len());
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), USER_AGENTS.len());
        assert_eq!(pool.next_agent(), first);
    }

    #[test]
    fn transport_builds_with_custom_delay() {
        let transport = Transport::with_delay(Duration::from_millis(5)).unwrap();
        assert_eq!(transport.delay, Duration::from_millis(5));
    }
}
