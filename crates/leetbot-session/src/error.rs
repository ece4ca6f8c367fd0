/// Session-level failures. Every browser operation catches its underlying
/// error and returns one of these at the crate boundary; callers must check
/// the `Result`, nothing panics.
#[derive(thiserror::Error, Debug, Clone)]
pub enum SessionError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Timed out waiting for {what}")]
    ScrapeTimeout { what: String },

    #[error("Interaction failed: {0}")]
    Interaction(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script execution error: {0}")]
    Script(String),

    #[error("Session not ready (browser not launched)")]
    NotReady,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

impl SessionError {
    /// True when the operation failed because an expected element never
    /// appeared within its wait budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::ScrapeTimeout { .. })
    }
}
