//! Adapter set: one normalization routine per upstream response shape.
//!
//! Every adapter takes a raw body plus the source descriptor and produces
//! [`CanonicalItem`]s. Adapters fail closed: a payload that does not have
//! the expected shape yields an empty list, never an error.

pub mod feed;
pub mod flat;
pub mod listing;
pub mod poll;
pub mod search;
pub mod text;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::domain::{AdapterKind, CanonicalItem, SourceDescriptor};
use crate::fetcher::Fetcher;

/// Output cap for every adapter except poll-by-id.
pub const MAX_ITEMS: usize = 20;

/// Number of ids a poll-by-id adapter resolves per refresh.
pub const POLL_LIMIT: usize = 15;

#[derive(Clone)]
pub struct Normalizer {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl Normalizer {
    /// `fetcher` serves the follow-up detail requests of poll-by-id sources.
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self { fetcher }
    }

    pub async fn normalize(
        &self,
        source: &SourceDescriptor,
        body: &[u8],
        fetched_at: i64,
    ) -> Vec<CanonicalItem> {
        let items = match source.adapter {
            AdapterKind::Feed => feed::normalize(source, body, fetched_at),
            AdapterKind::PollById => {
                poll::normalize(source, body, self.fetcher.as_ref(), fetched_at).await
            }
            AdapterKind::ListingWithChildren => listing::normalize(source, body, fetched_at),
            AdapterKind::SearchResult => search::normalize(source, body, fetched_at),
            AdapterKind::FlatArray => flat::normalize(source, body, fetched_at),
        };

        tracing::debug!(
            "{} adapter produced {} items for {}",
            source.adapter.as_str(),
            items.len(),
            source.id
        );
        items
    }
}

/// Deserialize a JSON payload, logging and discarding shape mismatches.
pub(crate) fn decode_json<T: DeserializeOwned>(source: &SourceDescriptor, body: &[u8]) -> Option<T> {
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Unexpected payload from {}: {}", source.id, e);
            None
        }
    }
}

/// Item id from a native identifier, or a positional one when there is none.
pub(crate) fn entry_id(
    source: &SourceDescriptor,
    native: &str,
    index: usize,
    fetched_at: i64,
) -> String {
    if native.trim().is_empty() {
        CanonicalItem::positional_id(source, index, fetched_at)
    } else {
        CanonicalItem::native_id(source, native.trim())
    }
}

/// Render a JSON scalar id (number or string) as text.
pub(crate) fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-empty link among the candidates.
pub(crate) fn first_link<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}
