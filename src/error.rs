use thiserror::Error;

pub type PainelResult<T> = Result<T, PainelError>;

/// Transport-level failures from a tabular source. These are the only
/// failures a dashboard view ever surfaces; parsing never fails.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("sheet service reported failure for range {range}")]
    Unsuccessful { range: String },

    #[error("no table named {range}")]
    NotFound { range: String },

    #[error("CSV error reading {range}: {source}")]
    Csv {
        range: String,
        #[source]
        source: csv::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PainelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load data: {0}")]
    Source(#[from] SourceError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for PainelError {
    fn from(e: config::ConfigError) -> Self {
        PainelError::Config(e.to_string())
    }
}
