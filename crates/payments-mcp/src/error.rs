use thiserror::Error;

/// Errors raised while running a payment tool.
///
/// None of these reach the transport: the tool layer renders them into an
/// `isError` tool result so the session keeps working.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not defined")]
    MissingCredential(&'static str),

    #[error("upstream returned HTTP {status}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },

    #[error("http error: {0}")]
    Http(String),

    #[error("{0}")]
    Rejected(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        ToolError::Http(e.to_string())
    }
}
