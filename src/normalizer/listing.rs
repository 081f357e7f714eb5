use serde::Deserialize;

use crate::domain::{CanonicalItem, SourceDescriptor};
use crate::normalizer::text::{clean_description, clean_title, sanitize_timestamp, seconds_to_millis};
use crate::normalizer::{decode_json, entry_id, first_link, MAX_ITEMS};

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    #[serde(default)]
    data: Entry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Entry {
    id: String,
    title: String,
    url: Option<String>,
    permalink: String,
    selftext: String,
    score: i64,
    created_utc: Option<f64>,
    stickied: bool,
}

/// Normalize a listing object, skipping sticky entries before applying the cap.
pub fn normalize(source: &SourceDescriptor, body: &[u8], fetched_at: i64) -> Vec<CanonicalItem> {
    let Some(listing) = decode_json::<Listing>(source, body) else {
        return Vec::new();
    };

    listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter(|entry| !entry.stickied)
        .enumerate()
        .filter_map(|(index, entry)| {
            let title = clean_title(&entry.title)?;
            let mut item =
                CanonicalItem::from_source(source, entry_id(source, &entry.id, index, fetched_at), title);

            item.url = first_link([entry.url.as_deref()]).unwrap_or_else(|| {
                let key = if entry.permalink.is_empty() {
                    &entry.id
                } else {
                    &entry.permalink
                };
                source.permalink(key)
            });
            item.description = clean_description(&entry.selftext);
            item.timestamp =
                sanitize_timestamp(entry.created_utc.and_then(seconds_to_millis), fetched_at);
            item.hot = entry.score.max(0) as u64;

            Some(item)
        })
        .take(MAX_ITEMS)
        .collect()
}
