use serde::{Deserialize, Serialize};

use crate::domain::Category;

/// Upstream response shape a source speaks.
///
/// Each variant has exactly one adapter in [`crate::normalizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    /// RSS/Atom document with repeated item blocks.
    Feed,
    /// JSON list of ids, each resolved by a follow-up detail request.
    PollById,
    /// JSON object wrapping a list of children with a sticky flag.
    ListingWithChildren,
    /// JSON object with a top-level `items` list.
    SearchResult,
    /// JSON array of entries.
    FlatArray,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Feed => "feed",
            AdapterKind::PollById => "poll-by-id",
            AdapterKind::ListingWithChildren => "listing-with-children",
            AdapterKind::SearchResult => "search-result",
            AdapterKind::FlatArray => "flat-array",
        }
    }
}

/// Placeholder substituted in `item_endpoint` and `permalink_template`.
pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub icon: String,
    pub color: String,
    pub endpoint: String,
    /// Per-item detail endpoint for poll-by-id sources.
    pub item_endpoint: Option<String>,
    /// Template used to build a link when the upstream omits one.
    pub permalink_template: Option<String>,
    pub adapter: AdapterKind,
    pub enabled: bool,
}

impl SourceDescriptor {
    pub fn new(
        id: &str,
        name: &str,
        category: Category,
        adapter: AdapterKind,
        endpoint: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            icon: String::new(),
            color: String::new(),
            endpoint: endpoint.to_string(),
            item_endpoint: None,
            permalink_template: None,
            adapter,
            enabled: true,
        }
    }

    pub fn with_style(mut self, icon: &str, color: &str) -> Self {
        self.icon = icon.to_string();
        self.color = color.to_string();
        self
    }

    pub fn with_item_endpoint(mut self, template: &str) -> Self {
        self.item_endpoint = Some(template.to_string());
        self
    }

    pub fn with_permalink(mut self, template: &str) -> Self {
        self.permalink_template = Some(template.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn item_url(&self, native_id: &str) -> Option<String> {
        self.item_endpoint
            .as_ref()
            .map(|t| t.replace(ID_PLACEHOLDER, native_id))
    }

    /// Fallback link for an entry; the endpoint itself when no template is set.
    pub fn permalink(&self, native_key: &str) -> String {
        match &self.permalink_template {
            Some(t) => t.replace(ID_PLACEHOLDER, native_key),
            None => self.endpoint.clone(),
        }
    }
}
