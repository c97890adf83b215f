use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    /// The HTTP exchange itself failed: connection refused, timeout,
    /// malformed response body. Never retried internally.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server returned a well-formed response with a nonzero errorCode.
    /// The server message is preserved verbatim.
    #[error("Server error {code}: {message}")]
    Protocol { code: i64, message: String },

    /// Login was rejected by the server.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// LIMIT or OFFSET was supplied as a late-bound placeholder. The wire
    /// protocol cannot express a parameterized TOP/SKIP value.
    #[error("Unsupported parameter: {0}")]
    UnsupportedParameter(String),

    /// Operation attempted on a closed connection or cursor.
    #[error("Interface error: {0}")]
    Interface(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;

impl From<reqwest::Error> for DriverError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
