//! Page-automation capability consumed by the scraper core.
//!
//! The synchronizer and resolver only talk to these traits; the concrete
//! driver (Chromium over CDP) is injected through [`Backend`] so component
//! tests can run against a scripted in-memory implementation. A session
//! owns one browser context exclusively for its lifetime and is released
//! on every exit path.

#[cfg(feature = "browser")]
pub mod chromium;

#[cfg(test)]
pub mod fake;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScrapeResult;

/// Creates automation sessions. Process-wide, constructor-injected.
#[async_trait]
pub trait Backend: Send + Sync {
    type Session: Session;

    /// Open a fresh browser context. Failure here is fatal to the episode
    /// or sync call that requested it, never to sibling calls.
    async fn open_session(&self) -> ScrapeResult<Self::Session>;
}

/// One exclusive browser context with its open tabs.
#[async_trait]
pub trait Session: Send + Sync {
    type Page: Page;

    async fn new_page(&self) -> ScrapeResult<Self::Page>;

    /// Popup guard sweep: close every open page whose URL host is not on
    /// the allow-list, returning how many were closed. Pages created via
    /// [`Session::new_page`] are exempt.
    async fn close_stray_pages(&self, allowed_hosts: &[String]) -> ScrapeResult<usize>;

    /// Tear the context down, closing any remaining pages.
    async fn close(self) -> ScrapeResult<()>;
}

/// One tab. Navigation and waiting may suspend up to the caller's bound.
#[async_trait]
pub trait Page: Send + Sync {
    type Elem: Element;

    async fn goto(&self, url: &str) -> ScrapeResult<()>;

    /// Wait for the first element matching `selector`, polling until
    /// `timeout` elapses.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> ScrapeResult<Self::Elem>;

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<Self::Elem>>;

    /// Current page source.
    async fn content(&self) -> ScrapeResult<String>;

    async fn close(self) -> ScrapeResult<()>;
}

/// Handle to a live DOM element.
#[async_trait]
pub trait Element: Send + Sync + Sized {
    async fn attribute(&self, name: &str) -> ScrapeResult<Option<String>>;

    async fn inner_text(&self) -> ScrapeResult<String>;

    async fn click(&self) -> ScrapeResult<()>;

    async fn query(&self, selector: &str) -> ScrapeResult<Option<Self>>;

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<Self>>;

    /// Scroll this element's own scroll container to its bottom, which is
    /// what triggers the next infinite-scroll load on the listing page.
    async fn scroll_to_bottom(&self) -> ScrapeResult<()>;
}

/// Page type produced by a backend's sessions.
pub type PageOf<B> = <<B as Backend>::Session as Session>::Page;
/// Element type produced by a backend's pages.
pub type ElemOf<B> = <PageOf<B> as Page>::Elem;
