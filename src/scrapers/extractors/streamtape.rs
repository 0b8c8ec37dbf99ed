//! Streamtape direct extraction from a download-table link.

use std::time::Duration;

use crate::automation::{Element, Page};
use crate::error::ScrapeResult;

/// Navigate the scratch page to the raw table link and read the `video`
/// element's source. Scheme-relative sources get the canonical scheme.
pub async fn extract<P: Page>(
    scratch: &P,
    raw_link: &str,
    wait: Duration,
) -> ScrapeResult<Option<String>> {
    scratch.goto(raw_link).await?;
    let video = scratch.wait_for("video", wait).await?;
    let Some(src) = video.attribute("src").await? else {
        return Ok(None);
    };
    Ok(Some(canonicalize(&src)))
}

fn canonicalize(src: &str) -> String {
    if src.starts_with("//") {
        format!("https:{src}")
    } else {
        src.to_string()
    }
}
