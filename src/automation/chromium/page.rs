//! Page and element handles over chromiumoxide.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page as CdpPage;
use tokio::time::Instant;

use crate::automation::{Element, Page};
use crate::error::{ScrapeError, ScrapeResult};

/// Polling cadence while waiting for a selector to appear.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ChromiumPage {
    page: CdpPage,
}

impl ChromiumPage {
    pub(crate) fn new(page: CdpPage) -> Self {
        Self { page }
    }
}

#[async_trait]
impl Page for ChromiumPage {
    type Elem = ChromiumElement;

    async fn goto(&self, url: &str) -> ScrapeResult<()> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| ScrapeError::Driver(format!("goto {url}: {e}")))
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> ScrapeResult<ChromiumElement> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.page.find_element(selector).await {
                Ok(el) => return Ok(ChromiumElement { inner: el }),
                Err(_) if Instant::now() < deadline => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(_) => {
                    return Err(ScrapeError::Timeout {
                        selector: selector.to_string(),
                        waited: timeout,
                    })
                }
            }
        }
    }

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<ChromiumElement>> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .unwrap_or_default();
        Ok(elements
            .into_iter()
            .map(|inner| ChromiumElement { inner })
            .collect())
    }

    async fn content(&self) -> ScrapeResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| ScrapeError::Driver(format!("content: {e}")))
    }

    async fn close(self) -> ScrapeResult<()> {
        self.page
            .close()
            .await
            .map_err(|e| ScrapeError::Driver(format!("close page: {e}")))
    }
}

pub struct ChromiumElement {
    inner: chromiumoxide::Element,
}

#[async_trait]
impl Element for ChromiumElement {
    async fn attribute(&self, name: &str) -> ScrapeResult<Option<String>> {
        self.inner
            .attribute(name)
            .await
            .map_err(|e| ScrapeError::Driver(format!("attribute {name}: {e}")))
    }

    async fn inner_text(&self) -> ScrapeResult<String> {
        Ok(self
            .inner
            .inner_text()
            .await
            .map_err(|e| ScrapeError::Driver(format!("inner_text: {e}")))?
            .unwrap_or_default())
    }

    async fn click(&self) -> ScrapeResult<()> {
        self.inner
            .click()
            .await
            .map(|_| ())
            .map_err(|e| ScrapeError::Driver(format!("click: {e}")))
    }

    async fn query(&self, selector: &str) -> ScrapeResult<Option<ChromiumElement>> {
        Ok(self
            .inner
            .find_element(selector)
            .await
            .ok()
            .map(|inner| ChromiumElement { inner }))
    }

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<ChromiumElement>> {
        let elements = self
            .inner
            .find_elements(selector)
            .await
            .unwrap_or_default();
        Ok(elements
            .into_iter()
            .map(|inner| ChromiumElement { inner })
            .collect())
    }

    async fn scroll_to_bottom(&self) -> ScrapeResult<()> {
        self.inner
            .call_js_fn(
                "function() { this.scrollBy(0, this.scrollHeight); }",
                false,
            )
            .await
            .map(|_| ())
            .map_err(|e| ScrapeError::Driver(format!("scroll: {e}")))
    }
}
