use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShroudError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Upstream returned status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Blocked destination: {0}")]
    Blocked(String),

    #[error("Response too large: {0}")]
    TooLarge(String),

    #[error("Document parse error: {0}")]
    Parse(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShroudError {
    /// HTTP status the surrounding application should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ShroudError::InvalidUrl(_) => 400,
            ShroudError::Blocked(_) | ShroudError::InvalidSignature(_) => 403,
            ShroudError::Fetch(_)
            | ShroudError::UpstreamStatus { .. }
            | ShroudError::TooLarge(_)
            | ShroudError::Parse(_) => 502,
            ShroudError::Config(_) | ShroudError::Internal(_) => 500,
        }
    }

    pub fn is_upstream(&self) -> bool {
        self.status_code() == 502
    }
}

pub type ShroudResult<T> = Result<T, ShroudError>;
