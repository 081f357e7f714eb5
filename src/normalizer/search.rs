use serde::Deserialize;
use serde_json::Value;

use crate::domain::{CanonicalItem, SourceDescriptor};
use crate::normalizer::text::{clean_description, clean_title, parse_date_millis, sanitize_timestamp};
use crate::normalizer::{decode_json, entry_id, first_link, scalar_to_string, MAX_ITEMS};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<Hit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Hit {
    id: Value,
    name: String,
    full_name: String,
    description: Option<String>,
    html_url: String,
    stargazers_count: u64,
    created_at: Option<String>,
    pushed_at: Option<String>,
}

/// Normalize a search response. Titles read `name: description`.
pub fn normalize(source: &SourceDescriptor, body: &[u8], fetched_at: i64) -> Vec<CanonicalItem> {
    let Some(response) = decode_json::<SearchResponse>(source, body) else {
        return Vec::new();
    };

    response
        .items
        .into_iter()
        .take(MAX_ITEMS)
        .enumerate()
        .filter_map(|(index, hit)| {
            let name = if hit.full_name.is_empty() {
                &hit.name
            } else {
                &hit.full_name
            };
            let summary = hit.description.as_deref().map(str::trim).unwrap_or("");
            let title = if summary.is_empty() {
                clean_title(name)?
            } else {
                clean_title(&format!("{}: {}", name, summary))?
            };

            let native = scalar_to_string(&hit.id).unwrap_or_default();
            let mut item =
                CanonicalItem::from_source(source, entry_id(source, &native, index, fetched_at), title);

            item.url =
                first_link([Some(hit.html_url.as_str())]).unwrap_or_else(|| source.permalink(name));
            item.description = clean_description(summary);
            item.timestamp = sanitize_timestamp(
                hit.pushed_at
                    .as_deref()
                    .or(hit.created_at.as_deref())
                    .and_then(parse_date_millis),
                fetched_at,
            );
            item.hot = hit.stargazers_count;

            Some(item)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::AdapterKind;
    use crate::normalizer::fixtures::{assert_canonical, source, FETCHED_AT};

    fn search_source() -> SourceDescriptor {
        source("gh", AdapterKind::SearchResult).with_permalink("https://example.com/{id}")
    }

    #[test]
    fn test_synthesizes_title_and_maps_fields() {
        let body = json!({
            "total_count": 2,
            "items": [
                {
                    "id": 101,
                    "name": "tokio",
                    "full_name": "tokio-rs/tokio",
                    "description": "A runtime for writing reliable asynchronous applications with Rust. Provides I/O, networking, scheduling, timers, ...",
                    "html_url": "https://example.com/tokio-rs/tokio",
                    "stargazers_count": 25000,
                    "pushed_at": "2024-01-01T00:00:00Z"
                },
                {
                    "id": 102,
                    "name": "bare",
                    "full_name": "someone/bare",
                    "description": null,
                    "html_url": "",
                    "stargazers_count": 3
                }
            ]
        });
        let items = normalize(&search_source(), &serde_json::to_vec(&body).unwrap(), FETCHED_AT);

        assert_eq!(items.len(), 2);
        assert!(items[0].title.starts_with("tokio-rs/tokio: A runtime"));
        assert_eq!(items[0].id, "gh-101");
        assert_eq!(items[0].hot, 25000);
        assert_eq!(items[0].timestamp, 1_704_067_200_000);
        assert_eq!(items[0].description.chars().count(), 100);

        assert_eq!(items[1].title, "someone/bare");
        assert_eq!(items[1].url, "https://example.com/someone/bare");
        assert_eq!(items[1].timestamp, FETCHED_AT);
        assert_canonical(&items, MAX_ITEMS);
    }

    #[test]
    fn test_caps_at_twenty() {
        let hits: Vec<_> = (0..40)
            .map(|i| json!({"id": i, "full_name": format!("o/r{}", i), "html_url": "https://example.com"}))
            .collect();
        let body = serde_json::to_vec(&json!({ "items": hits })).unwrap();
        let items = normalize(&search_source(), &body, FETCHED_AT);
        assert_eq!(items.len(), MAX_ITEMS);
    }

    #[test]
    fn test_missing_or_malformed_items_is_empty() {
        let src = search_source();
        assert!(normalize(&src, br#"{"message": "API rate limit exceeded"}"#, FETCHED_AT).is_empty());
        assert!(normalize(&src, br#"{"items": "nope"}"#, FETCHED_AT).is_empty());
        assert!(normalize(&src, b"[]", FETCHED_AT).is_empty());
    }
}
