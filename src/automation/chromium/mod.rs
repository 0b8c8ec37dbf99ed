//! Chromium (CDP) implementation of the automation capability.
//!
//! Each [`Session`] launches its own browser process (or attaches to a
//! configured remote DevTools endpoint) so episode resolutions never share
//! mutable browser state. The CDP event handler is drained on a spawned
//! task for the lifetime of the session.

mod page;

pub use page::{ChromiumElement, ChromiumPage};

use std::collections::HashSet;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::automation::{Backend, Session};
use crate::config::BrowserSettings;
use crate::error::{ScrapeError, ScrapeResult};

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

/// Launches one browser per session, or attaches to a remote endpoint.
pub struct ChromiumBackend {
    settings: BrowserSettings,
}

impl ChromiumBackend {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn find_chrome(&self) -> ScrapeResult<std::path::PathBuf> {
        if let Some(ref exe) = self.settings.executable {
            return Ok(exe.clone());
        }

        for path in CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        debug!("Found Chrome in PATH: {}", path);
                        return Ok(std::path::PathBuf::from(path));
                    }
                }
            }
        }

        Err(ScrapeError::Session(
            "Chrome/Chromium not found; install it or set ANILINK_CHROME".to_string(),
        ))
    }

    async fn launch(&self) -> ScrapeResult<(Browser, chromiumoxide::Handler)> {
        let chrome_path = self.find_chrome()?;

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless, confusingly
        if !self.settings.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--window-size=1920,1080");

        for arg in &self.settings.extra_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| ScrapeError::Session(format!("browser config: {e}")))?;

        info!("Launching browser (headless={})", self.settings.headless);
        Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Session(format!("launch failed: {e}")))
    }

    /// Attach to an already-running browser through its DevTools endpoint.
    async fn connect_remote(&self, url: &str) -> ScrapeResult<(Browser, chromiumoxide::Handler)> {
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let client = reqwest::Client::new();
        let resp: serde_json::Value = client
            .get(&version_url)
            .send()
            .await
            .map_err(|e| ScrapeError::Session(format!("remote browser unreachable: {e}")))?
            .json()
            .await
            .map_err(|e| ScrapeError::Session(format!("bad version response: {e}")))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ScrapeError::Session("no webSocketDebuggerUrl in version response".to_string())
            })?;

        info!("Connecting to remote browser: {}", ws_url);
        Browser::connect(ws_url)
            .await
            .map_err(|e| ScrapeError::Session(format!("remote connect failed: {e}")))
    }
}

#[async_trait]
impl Backend for ChromiumBackend {
    type Session = ChromiumSession;

    async fn open_session(&self) -> ScrapeResult<ChromiumSession> {
        let remote = self.settings.remote_url.is_some();
        let (browser, mut handler) = match self.settings.remote_url {
            Some(ref url) => self.connect_remote(url).await?,
            None => self.launch().await?,
        };

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(ChromiumSession {
            browser: Mutex::new(browser),
            handler_task,
            owned_targets: Mutex::new(HashSet::new()),
            remote,
        })
    }
}

/// One exclusive browser process (or remote context).
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    /// Targets created through `new_page`, exempt from the popup sweep.
    owned_targets: Mutex<HashSet<TargetId>>,
    remote: bool,
}

#[async_trait]
impl Session for ChromiumSession {
    type Page = ChromiumPage;

    async fn new_page(&self) -> ScrapeResult<ChromiumPage> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Session(format!("new page: {e}")))?;
        self.owned_targets
            .lock()
            .await
            .insert(page.target_id().clone());
        Ok(ChromiumPage::new(page))
    }

    async fn close_stray_pages(&self, allowed_hosts: &[String]) -> ScrapeResult<usize> {
        let browser = self.browser.lock().await;
        let pages = browser
            .pages()
            .await
            .map_err(|e| ScrapeError::Driver(e.to_string()))?;
        let owned = self.owned_targets.lock().await;

        let mut closed = 0;
        for page in pages {
            if owned.contains(page.target_id()) {
                continue;
            }
            let url = page.url().await.ok().flatten().unwrap_or_default();
            let host = url::Url::parse(&url)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.to_string()))
                .unwrap_or_default();
            if allowed_hosts.iter().any(|a| *a == host) {
                continue;
            }
            debug!("Popup guard closing stray page: {}", url);
            if let Err(e) = page.close().await {
                warn!("Failed to close stray page: {}", e);
            } else {
                closed += 1;
            }
        }
        Ok(closed)
    }

    async fn close(self) -> ScrapeResult<()> {
        let mut browser = self.browser.into_inner();
        if self.remote {
            // The remote browser is shared infrastructure; leave it running.
            drop(browser);
        } else {
            if let Err(e) = browser.close().await {
                warn!("Browser close failed: {}", e);
            }
            let _ = browser.wait().await;
        }
        self.handler_task.abort();
        Ok(())
    }
}
