use serde::Deserialize;
use serde_json::Value;

use crate::domain::{CanonicalItem, SourceDescriptor};
use crate::normalizer::text::{
    clean_description, clean_title, parse_date_millis, sanitize_timestamp, seconds_to_millis,
};
use crate::normalizer::{decode_json, entry_id, first_link, scalar_to_string, MAX_ITEMS};

/// One array entry. Accepts both the short-id spelling (`short_id`,
/// `comments_url`, `created_at`, `score`) and the numeric-id spelling
/// (`id`, `content`, `created`, `replies`).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Entry {
    short_id: Option<String>,
    id: Value,
    title: String,
    url: Option<String>,
    comments_url: Option<String>,
    short_id_url: Option<String>,
    description: Option<String>,
    content: Option<String>,
    score: Option<i64>,
    replies: Option<i64>,
    created_at: Option<String>,
    created: Option<i64>,
}

impl Entry {
    fn native_id(&self) -> String {
        self.short_id
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| scalar_to_string(&self.id))
            .unwrap_or_default()
    }

    fn timestamp(&self) -> Option<i64> {
        self.created_at
            .as_deref()
            .and_then(parse_date_millis)
            .or_else(|| self.created.and_then(|s| seconds_to_millis(s as f64)))
    }
}

/// Normalize a bare array of entries.
pub fn normalize(source: &SourceDescriptor, body: &[u8], fetched_at: i64) -> Vec<CanonicalItem> {
    let Some(entries) = decode_json::<Vec<Entry>>(source, body) else {
        return Vec::new();
    };

    entries
        .into_iter()
        .take(MAX_ITEMS)
        .enumerate()
        .filter_map(|(index, entry)| {
            let title = clean_title(&entry.title)?;
            let native = entry.native_id();
            let mut item =
                CanonicalItem::from_source(source, entry_id(source, &native, index, fetched_at), title);

            item.url = first_link([
                entry.url.as_deref(),
                entry.comments_url.as_deref(),
                entry.short_id_url.as_deref(),
            ])
            .unwrap_or_else(|| source.permalink(&native));
            item.description = entry
                .description
                .as_deref()
                .or(entry.content.as_deref())
                .map(clean_description)
                .unwrap_or_default();
            item.timestamp = sanitize_timestamp(entry.timestamp(), fetched_at);
            item.hot = entry.score.or(entry.replies).unwrap_or(0).max(0) as u64;

            Some(item)
        })
        .collect()
}
