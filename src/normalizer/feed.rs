use feed_rs::parser;

use crate::app::{Result, TrendError};
use crate::domain::{CanonicalItem, SourceDescriptor};
use crate::normalizer::text::{clean_description, clean_title, sanitize_timestamp};
use crate::normalizer::{first_link, MAX_ITEMS};

/// Normalize an RSS/Atom document.
///
/// Feed order encodes rank, so `hot` is `MAX_ITEMS - position`. Ids are
/// positional because feed guids are not reliably stable across mirrors.
pub fn normalize(source: &SourceDescriptor, body: &[u8], fetched_at: i64) -> Vec<CanonicalItem> {
    match parse(source, body, fetched_at) {
        Ok(items) => items,
        Err(e) => {
            tracing::debug!("Discarding feed from {}: {}", source.id, e);
            Vec::new()
        }
    }
}

fn parse(source: &SourceDescriptor, body: &[u8], fetched_at: i64) -> Result<Vec<CanonicalItem>> {
    let feed = parser::parse(body).map_err(|e| TrendError::FeedParse(e.to_string()))?;

    let items = feed
        .entries
        .into_iter()
        .take(MAX_ITEMS)
        .enumerate()
        .filter_map(|(index, entry)| {
            let title = entry.title.as_ref().and_then(|t| clean_title(&t.content))?;

            let mut item = CanonicalItem::from_source(
                source,
                CanonicalItem::positional_id(source, index, fetched_at),
                title,
            );

            item.url = first_link(entry.links.iter().map(|l| Some(l.href.as_str())))
                .unwrap_or_else(|| source.permalink(&entry.id));
            item.description = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|d| clean_description(&d))
                .unwrap_or_default();
            item.timestamp = sanitize_timestamp(
                entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.timestamp_millis()),
                fetched_at,
            );
            item.hot = (MAX_ITEMS - index) as u64;

            Some(item)
        })
        .collect();

    Ok(items)
}
