use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("configuration: {0}")]
    Config(String),

    #[error("object store: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink write timed out after {0:?}")]
    Timeout(std::time::Duration),
}
