use thiserror::Error;

/// Why a single input row was rejected during price table construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedObservation {
    #[error("unparseable date {0:?}")]
    BadDate(String),

    #[error("unparseable close {0:?}")]
    BadClose(String),

    #[error("non-positive close {0}")]
    NonPositiveClose(f64),

    #[error("missing ticker symbol")]
    MissingTicker,
}

/// Fatal errors of the computation core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("internal consistency violated: {0}")]
    InternalConsistency(String),

    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),
}

/// Failures talking to a market-data provider.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider error [{code}]: {description}")]
    Provider { code: String, description: String },

    #[error("malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Rate limiting, server-side failures and transport errors are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
