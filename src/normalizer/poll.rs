use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{CanonicalItem, SourceDescriptor};
use crate::fetcher::Fetcher;
use crate::normalizer::text::{clean_description, clean_title, sanitize_timestamp};
use crate::normalizer::{decode_json, first_link, scalar_to_string, POLL_LIMIT};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ItemDetail {
    id: Value,
    title: Option<String>,
    url: Option<String>,
    text: Option<String>,
    score: Option<u64>,
    time: Option<i64>,
}

/// Normalize an id list by resolving the first [`POLL_LIMIT`] ids concurrently.
///
/// Details that fail to load or carry no title are dropped.
pub async fn normalize(
    source: &SourceDescriptor,
    body: &[u8],
    fetcher: &(dyn Fetcher + Send + Sync),
    fetched_at: i64,
) -> Vec<CanonicalItem> {
    let Some(ids) = decode_json::<Vec<Value>>(source, body) else {
        return Vec::new();
    };

    let ids: Vec<String> = ids
        .iter()
        .filter_map(scalar_to_string)
        .take(POLL_LIMIT)
        .collect();

    let details = join_all(ids.iter().map(|id| fetch_detail(source, fetcher, id))).await;

    ids.iter()
        .zip(details)
        .filter_map(|(id, detail)| {
            let detail = detail?;
            let title = detail.title.as_deref().and_then(clean_title)?;
            let native = scalar_to_string(&detail.id).unwrap_or_else(|| id.clone());

            let mut item =
                CanonicalItem::from_source(source, CanonicalItem::native_id(source, &native), title);
            item.url = first_link([detail.url.as_deref()])
                .unwrap_or_else(|| source.permalink(&native));
            item.description = detail
                .text
                .as_deref()
                .map(clean_description)
                .unwrap_or_default();
            item.timestamp =
                sanitize_timestamp(detail.time.map(|t| t.saturating_mul(1000)), fetched_at);
            item.hot = detail.score.unwrap_or(0);

            Some(item)
        })
        .collect()
}

async fn fetch_detail(
    source: &SourceDescriptor,
    fetcher: &(dyn Fetcher + Send + Sync),
    id: &str,
) -> Option<ItemDetail> {
    let url = source.item_url(id)?;

    let body = match fetcher.fetch(&url).await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("Detail fetch for {} failed: {}", url, e);
            return None;
        }
    };

    // Deleted entries come back as a literal `null`.
    decode_json::<Option<ItemDetail>>(source, &body).flatten()
}
