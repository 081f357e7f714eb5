use serde::{Deserialize, Serialize};

use crate::domain::SourceDescriptor;

/// Unified, display-ready representation of one aggregated entry.
///
/// Serialized in camelCase; this is the shape persisted in cache records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub source_name: String,
    pub source_id: String,
    pub source_icon: String,
    pub source_color: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub hot: u64,
}

impl CanonicalItem {
    /// Start an item with the source's display fields copied in.
    pub fn from_source(source: &SourceDescriptor, id: String, title: String) -> Self {
        Self {
            id,
            title,
            url: String::new(),
            description: String::new(),
            source_name: source.name.clone(),
            source_id: source.id.clone(),
            source_icon: source.icon.clone(),
            source_color: source.color.clone(),
            timestamp: 0,
            hot: 0,
        }
    }

    /// Id combining the source id with an upstream-native identifier.
    pub fn native_id(source: &SourceDescriptor, native: &str) -> String {
        format!("{}-{}", source.id, native)
    }

    /// Id for upstreams without a stable identifier.
    pub fn positional_id(source: &SourceDescriptor, index: usize, fetched_at: i64) -> String {
        format!("{}-{}-{}", source.id, index, fetched_at)
    }
}

/// Sort newest first. Stable, so equal timestamps keep concatenation order.
pub fn sort_newest_first(items: &mut [CanonicalItem]) {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
