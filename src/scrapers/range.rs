//! Episode range expression parsing.
//!
//! Grammar: comma-separated tokens; a token is either `start-end` (inclusive
//! range, expanded ascending) or whitespace-separated integers. Values are
//! deduplicated in first-occurrence order. Range bounds below 1 drop the
//! whole token silently and `end < start` expands to nothing, matching the
//! legacy listing behavior; non-integer text is a hard error naming the
//! token, so a malformed batch is rejected before any automation work.

use std::collections::HashSet;

use crate::error::{ScrapeError, ScrapeResult};

pub fn parse(expr: &str) -> ScrapeResult<Vec<u32>> {
    let mut episodes = Vec::new();
    let mut seen = HashSet::new();

    for token in expr.split(',') {
        if token.contains('-') {
            let bounds: Vec<&str> = token.split('-').collect();
            if bounds.len() != 2 {
                return Err(invalid(token));
            }
            let start = parse_bound(bounds[0], token)?;
            let end = parse_bound(bounds[1], token)?;
            if start < 1 || end < 1 {
                continue;
            }
            for value in start..=end {
                push_unseen(value, &mut episodes, &mut seen);
            }
        } else {
            for part in token.split_whitespace() {
                let value = parse_bound(part, token)?;
                if value >= 1 {
                    push_unseen(value, &mut episodes, &mut seen);
                }
            }
        }
    }

    Ok(episodes)
}

fn push_unseen(value: i64, episodes: &mut Vec<u32>, seen: &mut HashSet<i64>) {
    if value <= u32::MAX as i64 && seen.insert(value) {
        episodes.push(value as u32);
    }
}

fn parse_bound(text: &str, token: &str) -> ScrapeResult<i64> {
    text.trim().parse::<i64>().map_err(|_| invalid(token))
}

fn invalid(token: &str) -> ScrapeError {
    ScrapeError::InvalidRangeToken {
        token: token.trim().to_string(),
    }
}
