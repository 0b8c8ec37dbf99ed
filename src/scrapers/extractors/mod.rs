//! Hosting-service extractors.
//!
//! A closed set of services, each knowing how to turn a page reference into
//! a final media URL. Table candidates are classified by host; tab services
//! are matched by tab title and tried in [`TAB_PREFERENCE`] order.

pub mod streamtape;
pub mod streamwish;
pub mod yourupload;

use std::time::Duration;

use crate::automation::Page;
use crate::error::ScrapeResult;

/// Fixed precedence for the tab fallback chain. Tabs whose title maps to no
/// known service are never tried.
pub const TAB_PREFERENCE: &[ServiceKind] = &[ServiceKind::StreamWish, ServiceKind::YourUpload];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// Direct table extraction; never reached through a tab.
    Streamtape,
    /// "SW" tab.
    StreamWish,
    YourUpload,
}

impl ServiceKind {
    /// Map a tab title to a service, as rendered by the target site.
    pub fn from_tab_title(title: &str) -> Option<Self> {
        match title {
            "SW" => Some(ServiceKind::StreamWish),
            "YourUpload" => Some(ServiceKind::YourUpload),
            _ => None,
        }
    }

    /// Service name reported in resolution results.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Streamtape => "streamtape",
            ServiceKind::StreamWish => "SW",
            ServiceKind::YourUpload => "YourUpload",
        }
    }
}

/// Classification of a download-table anchor by its target host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostClass {
    /// Known-unusable hosts, skipped without side effects.
    Unsupported,
    /// Streamtape, handled by the direct table extractor.
    Streamtape,
    /// Anything else; the table scan ignores it.
    Unknown,
}

/// One download-table anchor, consumed once per resolution attempt.
#[derive(Debug, Clone)]
pub struct ServiceCandidate {
    pub class: HostClass,
    pub raw_link: String,
}

pub fn classify_host(href: &str) -> HostClass {
    let host = url::Url::parse(href)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| href.to_string());

    if host.contains("mega") || host.contains("fichier") {
        HostClass::Unsupported
    } else if host.contains("streamtape") {
        HostClass::Streamtape
    } else {
        HostClass::Unknown
    }
}

/// Run the tab extractor for `kind` against an already-activated tab.
pub async fn extract_tab<P: Page>(
    kind: ServiceKind,
    primary: &P,
    scratch: &P,
    wait: Duration,
) -> ScrapeResult<Option<String>> {
    match kind {
        ServiceKind::StreamWish => streamwish::extract(primary, scratch, wait).await,
        ServiceKind::YourUpload => yourupload::extract(primary, scratch, wait).await,
        ServiceKind::Streamtape => Ok(None),
    }
}
