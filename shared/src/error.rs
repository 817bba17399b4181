use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures raised while building a [`MessageProcessor`](crate::core::MessageProcessor)
/// or while turning trigger records into messages.
///
/// Storage errors returned by `handle` are not wrapped in this type; they
/// are passed through exactly as the blob store produced them.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The ambient AWS configuration or credentials could not be loaded.
    #[error("load config: {0}")]
    ConfigLoad(#[source] BoxError),

    /// No bucket name was given explicitly and `BUCKET_NAME` is not set.
    #[error("no bucket name")]
    NoContainerName,

    /// A queue record arrived without the id used as its object key.
    #[error("record has no message id")]
    MissingMessageId,
}

impl ProcessorError {
    pub fn config_load(cause: impl Into<BoxError>) -> Self {
        ProcessorError::ConfigLoad(cause.into())
    }
}
