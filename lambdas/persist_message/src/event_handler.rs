use aws_lambda_events::{event::sqs::SqsEvent, sqs::SqsMessage};
use lambda_runtime::{tracing, Error, LambdaEvent};
use shared::{
    core::{BlobStore, Message, MessageProcessor},
    error::ProcessorError,
};

#[tracing::instrument(skip(processor, event), fields(
    faas.invocation_id = %event.context.request_id,
    messaging.batch.message_count = event.payload.records.len(),
))]
pub(crate) async fn function_handler<S: BlobStore>(
    processor: &MessageProcessor<S>,
    event: LambdaEvent<SqsEvent>,
) -> Result<(), Error> {
    let batch = event
        .payload
        .records
        .into_iter()
        .map(to_message)
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|e| tracing::error!("Rejecting batch: {}", e))?;

    processor.handle(&batch).await
}

// A missing body is stored as an empty object; a missing id leaves nothing to key on.
fn to_message(record: SqsMessage) -> Result<Message, ProcessorError> {
    let id = record.message_id.ok_or(ProcessorError::MissingMessageId)?;

    Ok(Message::new(id, record.body.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::function_handler;
    use aws_lambda_events::{event::sqs::SqsEvent, sqs::SqsMessage};
    use lambda_runtime::{Context, LambdaEvent};
    use mockall::predicate::{always, eq};
    use mockall::Sequence;
    use shared::{
        core::{MessageProcessor, MockBlobStore},
        error::ProcessorError,
    };
    use std::io;

    fn create_sqs_message(message_id: Option<&str>, body: Option<&str>) -> SqsMessage {
        let mut message = SqsMessage::default();
        message.message_id = message_id.map(str::to_string);
        message.body = body.map(str::to_string);
        message
    }

    fn create_lambda_event(messages: Vec<SqsMessage>) -> LambdaEvent<SqsEvent> {
        let mut sqs_event = SqsEvent::default();
        sqs_event.records = messages;
        LambdaEvent::new(sqs_event, Context::default())
    }

    async fn create_processor(store: MockBlobStore, bucket: &str) -> MessageProcessor<MockBlobStore> {
        MessageProcessor::builder()
            .with_blob_store(store)
            .with_container_name(bucket)
            .build(|| async { Err(ProcessorError::config_load("no ambient config in tests")) })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn when_valid_message_should_store_body_under_message_id() {
        let mut mock_store = MockBlobStore::default();
        mock_store
            .expect_put_object()
            .times(1)
            .with(eq("test-bucket"), eq("test-key"), eq(b"test-body".to_vec()))
            .returning(|_, _, _| Ok(()));
        let processor = create_processor(mock_store, "test-bucket").await;

        let event = create_lambda_event(vec![create_sqs_message(
            Some("test-key"),
            Some("test-body"),
        )]);

        let result = function_handler(&processor, event).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn when_store_fails_should_return_store_error() {
        let mut mock_store = MockBlobStore::default();
        mock_store
            .expect_put_object()
            .times(1)
            .with(eq("other-bucket"), eq("other-key"), eq(b"other-body".to_vec()))
            .returning(|_, _, _| Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed pipe").into()));
        let processor = create_processor(mock_store, "other-bucket").await;

        let event = create_lambda_event(vec![create_sqs_message(
            Some("other-key"),
            Some("other-body"),
        )]);

        let result = function_handler(&processor, event).await;

        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<io::Error>().map(|e| e.kind()),
            Some(io::ErrorKind::BrokenPipe)
        );
    }

    #[tokio::test]
    async fn when_multiple_messages_should_store_in_order_and_stop_at_first_failure() {
        let mut mock_store = MockBlobStore::default();
        let mut seq = Sequence::new();
        mock_store
            .expect_put_object()
            .times(1)
            .in_sequence(&mut seq)
            .with(eq("bucket"), eq("msg-1"), always())
            .returning(|_, _, _| Ok(()));
        mock_store
            .expect_put_object()
            .times(1)
            .in_sequence(&mut seq)
            .with(eq("bucket"), eq("msg-2"), always())
            .returning(|_, _, _| Err("access denied".into()));
        mock_store
            .expect_put_object()
            .times(0)
            .with(eq("bucket"), eq("msg-3"), always());
        let processor = create_processor(mock_store, "bucket").await;

        let event = create_lambda_event(vec![
            create_sqs_message(Some("msg-1"), Some("one")),
            create_sqs_message(Some("msg-2"), Some("two")),
            create_sqs_message(Some("msg-3"), Some("three")),
        ]);

        let result = function_handler(&processor, event).await;

        assert_eq!(result.unwrap_err().to_string(), "access denied");
    }

    #[tokio::test]
    async fn when_message_body_is_missing_should_store_empty_object() {
        let mut mock_store = MockBlobStore::default();
        mock_store
            .expect_put_object()
            .times(1)
            .with(eq("bucket"), eq("msg-1"), eq(Vec::<u8>::new()))
            .returning(|_, _, _| Ok(()));
        let processor = create_processor(mock_store, "bucket").await;

        let event = create_lambda_event(vec![create_sqs_message(Some("msg-1"), None)]);

        let result = function_handler(&processor, event).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn when_message_id_is_missing_should_fail_without_writing() {
        let mut mock_store = MockBlobStore::default();
        mock_store.expect_put_object().times(0);
        let processor = create_processor(mock_store, "bucket").await;

        let event = create_lambda_event(vec![
            create_sqs_message(Some("msg-1"), Some("one")),
            create_sqs_message(None, Some("two")),
        ]);

        let result = function_handler(&processor, event).await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProcessorError>(),
            Some(ProcessorError::MissingMessageId)
        ));
    }

    #[tokio::test]
    async fn when_empty_records_should_succeed() {
        let mut mock_store = MockBlobStore::default();
        mock_store.expect_put_object().times(0);
        let processor = create_processor(mock_store, "bucket").await;

        let event = create_lambda_event(vec![]);

        let result = function_handler(&processor, event).await;

        assert!(result.is_ok());
    }
}
