pub mod http_fetcher;
pub mod parallel;

#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;

use crate::app::Result;

/// Network primitive: one GET, raw response body.
///
/// Markup and JSON payloads both come back as bytes; adapters decide how to
/// read them.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
