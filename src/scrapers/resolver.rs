//! Per-episode download-link resolution.
//!
//! One automation session per episode, two pages: the primary page shows
//! the episode, the scratch page follows off-site redirects. The direct
//! table scan runs first; the tab fallback chain runs in preference order
//! after it. Per-candidate failures advance the chain instead of aborting
//! the episode, and the session is released on every exit path.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::automation::{Backend, Element, Page, PageOf, Session};
use crate::config::{Settings, TimeoutSettings};
use crate::error::ScrapeResult;
use crate::models::DownloadInfo;
use crate::scrapers::extractors::{
    classify_host, extract_tab, streamtape, HostClass, ServiceCandidate, ServiceKind,
    TAB_PREFERENCE,
};

pub(crate) const DOWNLOAD_TABLE: &str = "table.Dwnl";
pub(crate) const TAB_LIST: &str = "ul[role='tablist']";

/// Resolution capability consumed by the batch orchestrator.
#[async_trait]
pub trait ResolveEpisode: Send + Sync {
    /// `Ok(None)` is the NotFound terminal: no extractor succeeded, which
    /// is a valid outcome, not an error.
    async fn resolve(&self, episode_url: &str) -> ScrapeResult<Option<DownloadInfo>>;
}

pub struct EpisodeResolver<B: Backend> {
    backend: Arc<B>,
    timeouts: TimeoutSettings,
    allowed_popup_hosts: Vec<String>,
}

impl<B: Backend> EpisodeResolver<B> {
    pub fn new(backend: Arc<B>, settings: &Settings) -> Self {
        Self {
            backend,
            timeouts: settings.timeouts.clone(),
            allowed_popup_hosts: settings.browser.allowed_popup_hosts.clone(),
        }
    }

    async fn drive(
        &self,
        session: &B::Session,
        episode_url: &str,
    ) -> ScrapeResult<Option<DownloadInfo>> {
        let primary = session.new_page().await?;
        let scratch = session.new_page().await?;
        let outcome = self
            .drive_pages(session, &primary, &scratch, episode_url)
            .await;
        let _ = scratch.close().await;
        let _ = primary.close().await;
        outcome
    }

    async fn drive_pages(
        &self,
        session: &B::Session,
        primary: &PageOf<B>,
        scratch: &PageOf<B>,
        episode_url: &str,
    ) -> ScrapeResult<Option<DownloadInfo>> {
        primary.goto(episode_url).await?;
        primary
            .wait_for(DOWNLOAD_TABLE, self.timeouts.element_wait())
            .await?;

        // TableScan: direct links first.
        for candidate in parse_candidates(&primary.content().await?) {
            match candidate.class {
                HostClass::Unsupported => {
                    debug!(link = %candidate.raw_link, "skipping unsupported host");
                }
                HostClass::Streamtape => {
                    match streamtape::extract(scratch, &candidate.raw_link, self.timeouts.element_wait())
                        .await
                    {
                        Ok(Some(link)) => {
                            return Ok(Some(DownloadInfo {
                                service: ServiceKind::Streamtape.name().to_string(),
                                link,
                            }))
                        }
                        Ok(None) => debug!(link = %candidate.raw_link, "no video source"),
                        Err(e) if e.is_recoverable() => {
                            warn!(error = %e, "table extractor failed, continuing scan")
                        }
                        Err(e) => return Err(e),
                    }
                }
                HostClass::Unknown => {}
            }
        }

        // TabFallback: named services in preference order.
        let navbar = primary
            .wait_for(TAB_LIST, self.timeouts.list_wait())
            .await?;
        let mut tabs = Vec::new();
        for tab in navbar.query_all("li").await? {
            let title = tab.attribute("title").await?.unwrap_or_default();
            tabs.push((title, tab));
        }

        for kind in TAB_PREFERENCE {
            let Some((_, tab)) = tabs
                .iter()
                .find(|(title, _)| ServiceKind::from_tab_title(title) == Some(*kind))
            else {
                continue;
            };

            debug!(service = kind.name(), "trying tab service");
            self.activate_tab(tab).await?;
            let _ = session.close_stray_pages(&self.allowed_popup_hosts).await;

            let attempt = extract_tab(*kind, primary, scratch, self.timeouts.element_wait()).await;
            // Mirror confirmation clicks spawn popups too; sweep again
            // before acting on the outcome.
            let _ = session.close_stray_pages(&self.allowed_popup_hosts).await;

            match attempt {
                Ok(Some(link)) => {
                    return Ok(Some(DownloadInfo {
                        service: kind.name().to_string(),
                        link,
                    }))
                }
                Ok(None) => debug!(service = kind.name(), "service had no link"),
                Err(e) if e.is_recoverable() => {
                    warn!(service = kind.name(), error = %e, "tab extractor failed")
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Single click; the extractor's own wait on the resulting player
    /// element makes activation idempotent regardless of how the site
    /// toggles its tabs.
    async fn activate_tab(&self, tab: &crate::automation::ElemOf<B>) -> ScrapeResult<()> {
        match tab.query("a").await? {
            Some(anchor) => anchor.click().await,
            None => tab.click().await,
        }
    }
}

#[async_trait]
impl<B: Backend> ResolveEpisode for EpisodeResolver<B> {
    async fn resolve(&self, episode_url: &str) -> ScrapeResult<Option<DownloadInfo>> {
        let episode_id = episode_url.rsplit('/').next().unwrap_or(episode_url);
        info!(episode = episode_id, "resolving download link");

        let session = self.backend.open_session().await?;
        let outcome = self.drive(&session, episode_url).await;
        let _ = session.close().await;

        match &outcome {
            Ok(Some(info)) => info!(episode = episode_id, service = %info.service, "link found"),
            Ok(None) => info!(episode = episode_id, "no resolvable link"),
            Err(e) => warn!(episode = episode_id, error = %e, "resolution failed"),
        }
        outcome
    }
}

/// Pull download-table anchors out of the page source and classify their
/// hosts. Plain parsing, no live element handles needed.
fn parse_candidates(html: &str) -> Vec<ServiceCandidate> {
    let doc = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse(&format!("{DOWNLOAD_TABLE} a"))
        .expect("static selector is well-formed");
    doc.select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| ServiceCandidate {
            class: classify_host(href),
            raw_link: href.to_string(),
        })
        .collect()
}
