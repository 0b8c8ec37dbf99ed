//! StreamWish ("SW") tab extraction.
//!
//! The activated tab embeds the player in an iframe whose source carries a
//! file id. The download mirror serves that id under two quality variants;
//! each is tried in turn on the scratch page by clicking through the
//! confirmation control and reading the final download anchor.

use std::time::Duration;

use tracing::debug;

use crate::automation::{Element, Page};
use crate::error::{ScrapeError, ScrapeResult};

const DOWNLOAD_MIRROR: &str = "https://streamwish.to/f";

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

    let file_id = file_id_from_iframe_src(&src);
    let variants = [
        format!("{DOWNLOAD_MIRROR}/{file_id}_h"),
        format!("{DOWNLOAD_MIRROR}/{file_id}_n"),
    ];

    for variant in &variants {
        match try_variant(scratch, variant, wait).await {
            Ok(Some(link)) => return Ok(Some(link)),
            Ok(None) => debug!(variant, "download anchor had no target"),
            Err(e) if e.is_recoverable() => debug!(variant, error = %e, "variant failed"),
            Err(e) => return Err(e),
        }
    }

    Ok(None)
}

async fn try_variant<P: Page>(scratch: &P, url: &str, wait: Duration) -> ScrapeResult<Option<String>> {
    scratch.goto(url).await?;
    let confirm = scratch.wait_for("button", wait).await?;
    confirm.click().await?;
    let anchor = scratch.wait_for("a.dwnlonk", wait).await?;
    anchor.attribute("href").await
}

/// Last path segment of the player iframe source, query string stripped.
fn file_id_from_iframe_src(src: &str) -> &str {
    src.rsplit('/')
        .next()
        .unwrap_or(src)
        .split('?')
        .next()
        .unwrap_or("")
}
