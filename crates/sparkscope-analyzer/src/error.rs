use sparkscope_state::StateError;
use thiserror::Error;

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("application {0} is not in the store")]
    AppNotFound(String),

    #[error("state store error: {0}")]
    State(#[from] StateError),
}
