use crate::configuration::resolve_container_name;
use crate::error::{BoxError, ProcessorError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::future::Future;

#[cfg(any(test, feature = "mocks"))]
use mockall::{automock, predicate::*};

/// A single queued message. `id` becomes the object key as-is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Message {
    pub id: String,
    pub body: String,
}

impl Message {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
        }
    }
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait BlobStore: Debug + Send + Sync {
    /// Creates or overwrites `key` in `container` with `body`.
    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<(), BoxError>;
}

#[derive(Debug)]
pub struct MessageProcessor<S: BlobStore> {
    store: S,
    container_name: String,
}

#[derive(Debug)]
pub struct MessageProcessorBuilder<S: BlobStore> {
    store: Option<S>,
    container_name: Option<String>,
}

impl<S: BlobStore> Default for MessageProcessorBuilder<S> {
    fn default() -> Self {
        Self {
            store: None,
            container_name: None,
        }
    }
}

impl<S: BlobStore> MessageProcessorBuilder<S> {
    pub fn with_blob_store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_container_name(mut self, container_name: impl Into<String>) -> Self {
        self.container_name = Some(container_name.into());
        self
    }

    /// Fills in whatever the `with_*` calls left unset and builds the processor.
    ///
    /// `default_store` only runs when no store was supplied. The container
    /// name falls back to `BUCKET_NAME`.
    pub async fn build<F, Fut>(self, default_store: F) -> Result<MessageProcessor<S>, ProcessorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S, ProcessorError>>,
    {
        let store = match self.store {
            Some(store) => store,
            None => default_store().await?,
        };
        let container_name = resolve_container_name(self.container_name)?;

        Ok(MessageProcessor {
            store,
            container_name,
        })
    }
}

impl<S: BlobStore> MessageProcessor<S> {
    pub fn builder() -> MessageProcessorBuilder<S> {
        MessageProcessorBuilder::default()
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Writes every message in order and stops at the first failed write,
    /// returning that error untouched. Messages after it are not attempted.
    #[tracing::instrument("process message_batch", skip(self, batch), fields(
        messaging.operation.name = "process",
        messaging.destination = "aws_sqs",
        messaging.batch.message_count = batch.len(),
        container = %self.container_name,
    ))]
    pub async fn handle(&self, batch: &[Message]) -> Result<(), BoxError> {
        for message in batch {
            self.write(&message.id, message.body.as_bytes().to_vec())
                .await?;
        }

        tracing::info!("Stored {} messages", batch.len());
        Ok(())
    }

    #[tracing::instrument("write object", skip(self, key, payload), fields(
        messaging.message.id = %key,
        payload_bytes = payload.len(),
    ))]
    async fn write(&self, key: &str, payload: Vec<u8>) -> Result<(), BoxError> {
        self.store
            .put_object(&self.container_name, key, payload)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    key,
                    container = %self.container_name,
                    "Failed to write object: {:?}",
                    e
                );
            })
    }
}
