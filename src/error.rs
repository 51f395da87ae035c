use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Script execution failed: {0}")]
    Script(String),

    #[error("No page available")]
    NoPage,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Why a single check did not pass
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CheckFailure(pub String);

impl CheckFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<HarnessError> for CheckFailure {
    fn from(error: HarnessError) -> Self {
        Self(error.to_string())
    }
}
