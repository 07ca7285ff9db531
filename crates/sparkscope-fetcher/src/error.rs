//! Error types for the ingestion pipeline.

use sparkscope_state::StateError;
use thiserror::Error;

pub type FetchResult<T> = Result<T, FetchError>;

/// Run-level ingestion failures. Any of these rolls the whole run back.
///
/// A single URL that cannot be fetched is not an error; the pool reports it
/// as "no data" for that key.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("invalid history server base URL: {0}")]
    BaseUrl(String),

    #[error("application list unavailable at {0}")]
    ApplicationList(String),

    #[error("unexpected {entity} payload for {key}: {reason}")]
    Shape {
        entity: &'static str,
        key: String,
        reason: String,
    },

    #[error("stage {0} is not claimed by any job")]
    UnclaimedStage(String),

    #[error("state store error: {0}")]
    State(#[from] StateError),
}
