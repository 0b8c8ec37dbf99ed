//! Value objects exchanged between the synchronizer, resolver, and callers.
//!
//! All of these are request-scoped: the caller owns them and nothing here
//! outlives a single sync or resolution call.

use serde::{Deserialize, Serialize};

/// One row discovered on the episode listing, oldest-first ordinals.
///
/// Ordinals are assigned after the newest-first listing is reversed, so
/// appended rows continue the numbering of previously stored episodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeLink {
    pub title: String,
    pub url: String,
    pub ordinal: u32,
}

/// Final media URL together with the hosting service that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub service: String,
    pub link: String,
}

/// Terminal outcome for one episode. `download: None` means no extractor
/// succeeded; that is a valid, non-error outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub episode: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<DownloadInfo>,
}

/// Caller-issued request to resolve download links for a set of episodes,
/// optionally restricted by a range expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub episodes: Vec<EpisodeLink>,
    #[serde(default)]
    pub range_expr: Option<String>,
}

/// Fan-in result of a batch: items in selection order, plus the number of
/// selected episodes that produced no result entry at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub anime: String,
    pub items: Vec<ResolutionResult>,
    pub unresolved: usize,
}

/// Derive the batch subject name from an episode URL by stripping the
/// trailing episode-number segment token. Labeling only, not correctness.
pub fn series_name_from_url(url: &str) -> String {
    let last_segment = url.rsplit('/').next().unwrap_or(url);
    let parts: Vec<&str> = last_segment.split('-').collect();
    if parts.len() > 1 {
        parts[..parts.len() - 1].join("-")
    } else {
        last_segment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_name_strips_episode_token() {
        assert_eq!(
            series_name_from_url("https://example.net/ver/one-piece-1071"),
            "one-piece"
        );
    }

    #[test]
    fn series_name_without_dashes_is_kept() {
        assert_eq!(series_name_from_url("https://example.net/ver/bleach"), "bleach");
    }

    #[test]
    fn resolution_result_omits_absent_download() {
        let r = ResolutionResult {
            episode: 3,
            title: "Episode 3".into(),
            download: None,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("download").is_none());
    }
}
