//! Configuration for the scraper core.
//!
//! Settings come from an optional TOML file plus environment overrides
//! (`ANILINK_*`), with defaults matching the observed target site. A `.env`
//! file is honored because `main` loads it before anything else.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Wait bound for in-page elements (video, button, iframe).
const DEFAULT_ELEMENT_WAIT_SECS: u64 = 10;
/// Wait bound for the listing container and the tab list.
const DEFAULT_LIST_WAIT_SECS: u64 = 30;
/// Settle delay between a scroll trigger and the row re-read.
const DEFAULT_SETTLE_MS: u64 = 500;

/// Process-wide cap on concurrent resolver sessions.
const DEFAULT_GLOBAL_SESSIONS: usize = 32;
/// Cap on concurrent resolver sessions within a single batch.
const DEFAULT_BATCH_SESSIONS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the listing site.
    pub host: String,
    pub timeouts: TimeoutSettings,
    pub concurrency: ConcurrencySettings,
    pub browser: BrowserSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub element_wait_secs: u64,
    pub list_wait_secs: u64,
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencySettings {
    pub global_sessions: usize,
    pub batch_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Explicit Chrome/Chromium executable. Discovered when unset.
    pub executable: Option<PathBuf>,
    /// DevTools endpoint of an already-running browser (e.g.
    /// `ws://localhost:9222`). Launching is skipped when set.
    pub remote_url: Option<String>,
    /// Extra arguments appended to the launch command line.
    pub extra_args: Vec<String>,
    /// Popup hosts that are allowed to stay open; everything else is
    /// closed by the popup guard.
    pub allowed_popup_hosts: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "https://www3.animeflv.net".to_string(),
            timeouts: TimeoutSettings::default(),
            concurrency: ConcurrencySettings::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            element_wait_secs: DEFAULT_ELEMENT_WAIT_SECS,
            list_wait_secs: DEFAULT_LIST_WAIT_SECS,
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            global_sessions: DEFAULT_GLOBAL_SESSIONS,
            batch_sessions: DEFAULT_BATCH_SESSIONS,
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            remote_url: None,
            extra_args: Vec::new(),
            allowed_popup_hosts: vec!["www.yourupload.com".to_string()],
        }
    }
}

impl TimeoutSettings {
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    pub fn list_wait(&self) -> Duration {
        Duration::from_secs(self.list_wait_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Load settings from an explicit path, or from the default config location
/// when none is given. A missing file yields defaults.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let candidate = match path {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path(),
    };

    let mut settings = match candidate {
        Some(ref p) if p.exists() => {
            let raw = std::fs::read_to_string(p)?;
            toml::from_str(&raw)?
        }
        Some(ref p) if path.is_some() => {
            anyhow::bail!("config file not found: {}", p.display())
        }
        _ => Settings::default(),
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("anilink").join("config.toml"))
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(host) = std::env::var("ANILINK_HOST") {
        settings.host = host;
    }
    if let Ok(url) = std::env::var("ANILINK_REMOTE_BROWSER") {
        settings.browser.remote_url = Some(url);
    }
    if let Ok(headless) = std::env::var("ANILINK_HEADLESS") {
        settings.browser.headless = headless != "0" && headless.to_lowercase() != "false";
    }
    if let Ok(exe) = std::env::var("ANILINK_CHROME") {
        settings.browser.executable = Some(PathBuf::from(exe));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_observed_site_bounds() {
        let s = Settings::default();
        assert_eq!(s.timeouts.element_wait(), Duration::from_secs(10));
        assert_eq!(s.timeouts.list_wait(), Duration::from_secs(30));
        assert_eq!(s.concurrency.global_sessions, 32);
        assert_eq!(s.concurrency.batch_sessions, 4);
        assert!(s.browser.headless);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "host = \"https://example.net\"").unwrap();
        writeln!(f, "[concurrency]").unwrap();
        writeln!(f, "batch_sessions = 2").unwrap();

        let s = load_settings(Some(f.path())).unwrap();
        assert_eq!(s.host, "https://example.net");
        assert_eq!(s.concurrency.batch_sessions, 2);
        assert_eq!(s.concurrency.global_sessions, 32);
        assert_eq!(s.timeouts.settle_ms, 500);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_settings(Some(Path::new("/nonexistent/anilink.toml")));
        assert!(err.is_err());
    }
}
