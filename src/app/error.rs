use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrendError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid source registry: {0}")]
    Registry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source {source_id} timed out after {secs}s")]
    Timeout { source_id: String, secs: u64 },

    #[error("All sources failed for {key}")]
    AllSourcesFailed { key: String },

    #[error("A load for {0} is already in progress")]
    LoadInProgress(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TrendError>;
