use std::sync::Arc;

use event_handler::function_handler;
use lambda_runtime::{run, service_fn, tracing, Error};
use shared::adapters::S3BlobStore;
use shared::core::MessageProcessor;

mod event_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let otel_guard = Arc::new(shared::observability::init_otel()?);

    // Built once per cold start. Returning the error here fails the init
    // phase, so the runtime never hands this process an event.
    let processor = match MessageProcessor::builder().build(S3BlobStore::from_env).await {
        Ok(processor) => processor,
        Err(e) => {
            tracing::error!("Failed to create message processor: {:?}", e);
            otel_guard.flush();
            return Err(e.into());
        }
    };
    tracing::info!(
        bucket = processor.container_name(),
        "Message processor ready"
    );

    run(service_fn(|event| async {
        let res = function_handler(&processor, event).await;

        otel_guard.flush();

        res
    }))
    .await
}
