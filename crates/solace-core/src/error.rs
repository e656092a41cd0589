use thiserror::Error;

/// Top-level error type for Solace.
#[derive(Debug, Error)]
pub enum SolaceError {
    /// Error from the content generator.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from the mail collaborator.
    #[error("mail error: {0}")]
    Mail(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Memory/storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
