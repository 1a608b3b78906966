use thiserror::Error;

/// Errors surfaced by the feed subsystem. Missing viewers or tweets on the
/// read path are not errors; those queries return empty results instead.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed pagination cursor: {0:?}")]
    InvalidCursor(String),

    #[error("tweet content must be between {min} and {max} characters, got {got}")]
    InvalidContent { min: usize, max: usize, got: usize },

    #[error("storage error: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}
