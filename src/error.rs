#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("feature disabled: {0}")]
    FeatureDisabled(String),

    #[error("activation already pending: {0}")]
    ActivationPending(String),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SwitchError>;
