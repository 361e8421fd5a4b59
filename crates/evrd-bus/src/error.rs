use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("topic creation failed: {0}")]
    TopicCreationFailed(String),

    #[error("internal bus error: {0}")]
    Internal(String),
}
