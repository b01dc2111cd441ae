use thiserror::Error;

/// Failures while assembling the runtime, before any sync work starts
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No HTTP client available: {0}")]
    HttpClientUnavailable(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
