//! Incremental catalog synchronization against the infinite-scroll listing.
//!
//! The listing renders newest-first. Each pass reads the visible rows,
//! checks newly visible ones against the caller's checkpoint title, and
//! otherwise scrolls the container and re-reads. Convergence is a pass
//! where the row count stops growing. The selected subset is reversed
//! before returning so ordinals increase with chronological order and
//! appended rows continue the caller's existing numbering.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::automation::{Backend, Element, ElemOf, Page, PageOf, Session};
use crate::config::{Settings, TimeoutSettings};
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::EpisodeLink;

pub(crate) const LIST_CONTAINER: &str = "#episodeList";
pub(crate) const ROW_SELECTOR: &str = "li.fa-play-circle:not(.Next)";
/// Includes the "Next" sentinel row, which carries the emission date.
const EMISSION_ROW_SELECTOR: &str = "li.fa-play-circle";

pub struct CatalogSynchronizer<B: Backend> {
    backend: Arc<B>,
    host: String,
    timeouts: TimeoutSettings,
}

impl<B: Backend> CatalogSynchronizer<B> {
    pub fn new(backend: Arc<B>, settings: &Settings) -> Self {
        Self {
            backend,
            host: settings.host.clone(),
            timeouts: settings.timeouts.clone(),
        }
    }

    /// Discover episode links for `series`, newest ones first on the page.
    ///
    /// With a checkpoint, only episodes strictly newer than the checkpoint
    /// title are returned; the checkpoint row and everything older is cut.
    /// An empty result means the catalog is already up to date. Ordinals
    /// start at `ordinal_offset + 1`, oldest first.
    pub async fn sync(
        &self,
        series: &str,
        checkpoint: Option<&str>,
        ordinal_offset: u32,
    ) -> ScrapeResult<Vec<EpisodeLink>> {
        info!(series, checkpoint, "synchronizing episode catalog");
        let session = self.backend.open_session().await?;
        let result = self.run_sync(&session, series, checkpoint, ordinal_offset).await;
        let _ = session.close().await;
        result
    }

    async fn run_sync(
        &self,
        session: &B::Session,
        series: &str,
        checkpoint: Option<&str>,
        ordinal_offset: u32,
    ) -> ScrapeResult<Vec<EpisodeLink>> {
        let page = self.open_listing(session, series).await?;
        let result = self
            .collect_episodes(&page, series, checkpoint, ordinal_offset)
            .await;
        let _ = page.close().await;
        result
    }

    async fn collect_episodes(
        &self,
        page: &PageOf<B>,
        series: &str,
        checkpoint: Option<&str>,
        ordinal_offset: u32,
    ) -> ScrapeResult<Vec<EpisodeLink>> {
        let container = self.wait_container(page).await?;

        let mut scanned = 0usize;
        let mut rows: Vec<ElemOf<B>>;
        loop {
            rows = container.query_all(ROW_SELECTOR).await?;

            if let Some(cp) = checkpoint {
                let mut found = false;
                for row in rows.iter().skip(scanned) {
                    if row_title(row).await?.trim() == cp {
                        found = true;
                        break;
                    }
                    scanned += 1;
                }
                if found {
                    break;
                }
            }

            let previous = rows.len();
            container.scroll_to_bottom().await?;
            tokio::time::sleep(self.timeouts.settle()).await;
            let current = container.query_all(ROW_SELECTOR).await?.len();
            debug!(series, rows = current, "scroll pass");

            if current == previous {
                scanned = current;
                break;
            }
        }

        if scanned == 0 {
            debug!(series, "no new episodes");
            return Ok(Vec::new());
        }

        let mut links = Vec::with_capacity(scanned);
        for row in rows.iter().take(scanned) {
            let anchor = row
                .query("a")
                .await?
                .ok_or_else(|| ScrapeError::Sync("episode row has no anchor".to_string()))?;
            let title = row_title(row).await?;
            let href = anchor
                .attribute("href")
                .await?
                .ok_or_else(|| ScrapeError::Sync("episode anchor has no href".to_string()))?;
            links.push((title.trim().to_string(), absolute_url(&self.host, &href)));
        }

        // Newest-first on the page; oldest-first in the returned ordinals.
        links.reverse();
        let episodes = links
            .into_iter()
            .enumerate()
            .map(|(i, (title, url))| EpisodeLink {
                title,
                url,
                ordinal: ordinal_offset + i as u32 + 1,
            })
            .collect::<Vec<_>>();

        info!(series, count = episodes.len(), "catalog sync finished");
        Ok(episodes)
    }

    /// Weekday name of the next emission, read off the sentinel row's date.
    pub async fn emission_weekday(&self, series: &str) -> ScrapeResult<String> {
        let session = self.backend.open_session().await?;
        let result = self.read_emission(&session, series).await;
        let _ = session.close().await;
        result
    }

    async fn read_emission(&self, session: &B::Session, series: &str) -> ScrapeResult<String> {
        let page = self.open_listing(session, series).await?;
        let result = self.read_emission_row(&page).await;
        let _ = page.close().await;
        result
    }

    async fn read_emission_row(&self, page: &PageOf<B>) -> ScrapeResult<String> {
        let container = self.wait_container(page).await?;
        let rows = container.query_all(EMISSION_ROW_SELECTOR).await?;
        let first = rows
            .first()
            .ok_or_else(|| ScrapeError::Sync("listing has no rows".to_string()))?;
        let anchor = first
            .query("a")
            .await?
            .ok_or_else(|| ScrapeError::Sync("emission row has no anchor".to_string()))?;
        let span = anchor
            .query("span")
            .await?
            .ok_or_else(|| ScrapeError::Sync("emission row has no date".to_string()))?;
        let text = span.inner_text().await?;
        let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|e| {
            ScrapeError::ExtractionMiss(format!("emission date {:?}: {e}", text.trim()))
        })?;
        Ok(date.format("%A").to_string())
    }

    /// The caller owns the page and must close it before releasing the
    /// session; a remote browser outlives the session teardown.
    async fn open_listing(
        &self,
        session: &B::Session,
        series: &str,
    ) -> ScrapeResult<PageOf<B>> {
        let page = session.new_page().await?;
        if let Err(e) = page.goto(&format!("{}/anime/{}", self.host, series)).await {
            let _ = page.close().await;
            return Err(e);
        }
        Ok(page)
    }

    async fn wait_container(&self, page: &PageOf<B>) -> ScrapeResult<ElemOf<B>> {
        page.wait_for(LIST_CONTAINER, self.timeouts.list_wait())
            .await
            .map_err(|e| ScrapeError::Sync(format!("listing container never appeared: {e}")))
    }
}

async fn row_title<E: Element>(row: &E) -> ScrapeResult<String> {
    let anchor = row
        .query("a")
        .await?
        .ok_or_else(|| ScrapeError::Sync("episode row has no anchor".to_string()))?;
    let p = anchor
        .query("p")
        .await?
        .ok_or_else(|| ScrapeError::Sync("episode row has no title".to_string()))?;
    p.inner_text().await
}

fn absolute_url(host: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{host}{href}")
    }
}
