pub mod sqlite;

use crate::app::Result;

pub use sqlite::SqliteStore;

/// Durable string key-value storage.
///
/// Values are opaque text; the cache layer stores JSON in them.
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
