use thiserror::Error;

/// Error types for recording and replay
#[derive(Debug, Error)]
pub enum MimicError {
    /// The global input hook could not be installed
    #[error("Failed to install input hook: {0}")]
    Hook(String),

    /// Not enough recorded data to fit the interval model
    #[error("Not enough recorded clicks: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// The interval distribution could not be fitted
    #[error("Failed to fit interval model: {0}")]
    Fit(String),

    /// A synthetic input event could not be injected
    #[error("Failed to inject input event: {0}")]
    Injection(String),
}

/// Result type for recorder operations
pub type Result<T> = std::result::Result<T, MimicError>;
