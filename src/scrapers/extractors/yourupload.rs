//! YourUpload tab extraction.

use std::time::Duration;

use crate::automation::{Element, Page};
use crate::error::{ScrapeError, ScrapeResult};

/// Follow the player iframe to the host page and read the `video` source.
pub async fn extract<P: Page>(
    primary: &P,
    scratch: &P,
    wait: Duration,
) -> ScrapeResult<Option<String>> {
    let video_box = primary.wait_for("div#video_box", wait).await?;
    let iframe = video_box
        .query("iframe")
        .await?
        .ok_or_else(|| ScrapeError::ExtractionMiss("video_box has no iframe".to_string()))?;
    let src = iframe
        .attribute("src")
        .await?
        .ok_or_else(|| ScrapeError::ExtractionMiss("player iframe has no src".to_string()))?;

    scratch.goto(&src).await?;
    let video = scratch.wait_for("video", wait).await?;
    video.attribute("src").await
}
