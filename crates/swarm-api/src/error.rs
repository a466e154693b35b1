use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwarmApiError {
    #[error("unsupported docker host '{0}': use unix://, tcp://, http:// or https://")]
    UnsupportedHost(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
