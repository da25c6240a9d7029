//! Amazon SQS adapter.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{MessageAttributeValue, SendMessageBatchRequestEntry};
use aws_sdk_sqs::Client;
use mediatag_core::batching::MAX_QUEUE_BATCH;
use mediatag_core::error::{CoreError, CoreResult};
use mediatag_core::message::{BatchSendOutcome, FailedEntry, OutgoingMessage, ReceivedMessage};
use mediatag_core::ports::MessageQueue;

const SERVICE: &str = "SQS";

/// Message attribute carrying the idempotency key.
pub const IDEMPOTENCY_ATTRIBUTE: &str = "IdempotencyKey";

/// Longest long-poll SQS allows, in seconds.
const MAX_WAIT_SECS: u64 = 20;

fn upstream<E: std::error::Error>(err: E) -> CoreError {
    CoreError::Upstream {
        service: SERVICE,
        message: DisplayErrorContext(err).to_string(),
    }
}

fn idempotency_attribute(message: &OutgoingMessage) -> CoreResult<Option<MessageAttributeValue>> {
    message
        .idempotency_key
        .as_ref()
        .map(|key| {
            MessageAttributeValue::builder()
                .data_type("String")
                .string_value(key.as_ref())
                .build()
        })
        .transpose()
        .map_err(|e| CoreError::Internal(format!("Invalid message attribute: {e}")))
}

/// [`MessageQueue`] bound to one SQS queue URL.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(sdk_config: &aws_config::SdkConfig, queue_url: impl Into<String>) -> Self {
        Self::with_client(aws_sdk_sqs::Client::new(sdk_config), queue_url)
    }

    /// Share one client between several queues.
    pub fn with_client(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn send(&self, message: &OutgoingMessage) -> CoreResult<String> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(&message.body)
            .set_message_attributes(
                idempotency_attribute(message)?
                    .map(|value| [(IDEMPOTENCY_ATTRIBUTE.to_string(), value)].into()),
            )
            .send()
            .await
            .map_err(upstream)?;

        Ok(output.message_id().unwrap_or_default().to_string())
    }

    async fn send_batch(&self, messages: &[OutgoingMessage]) -> CoreResult<BatchSendOutcome> {
        if messages.is_empty() {
            return Ok(BatchSendOutcome::default());
        }
        if messages.len() > MAX_QUEUE_BATCH {
            return Err(CoreError::Validation(format!(
                "A queue batch holds at most {MAX_QUEUE_BATCH} messages (got {})",
                messages.len()
            )));
        }

        let entries = messages
            .iter()
            .map(|message| {
                let attributes = idempotency_attribute(message)?
                    .map(|value| [(IDEMPOTENCY_ATTRIBUTE.to_string(), value)].into());
                SendMessageBatchRequestEntry::builder()
                    .id(&message.id)
                    .message_body(&message.body)
                    .set_message_attributes(attributes)
                    .build()
                    .map_err(|e| CoreError::Internal(format!("Invalid batch entry: {e}")))
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(upstream)?;

        let sent = output
            .successful()
            .iter()
            .map(|entry| entry.id().to_string())
            .collect();
        let failed = output
            .failed()
            .iter()
            .map(|entry| FailedEntry {
                id: entry.id().to_string(),
                reason: entry
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| entry.code().to_string()),
            })
            .collect();

        Ok(BatchSendOutcome { sent, failed })
    }

    async fn receive(&self, max_messages: i32, wait: Duration) -> CoreResult<Vec<ReceivedMessage>> {
        let wait_secs = wait.as_secs().min(MAX_WAIT_SECS) as i32;
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.clamp(1, MAX_QUEUE_BATCH as i32))
            .wait_time_seconds(wait_secs)
            .send()
            .await
            .map_err(upstream)?;

        let messages = output
            .messages()
            .iter()
            .filter_map(|message| {
                let Some(receipt_handle) = message.receipt_handle() else {
                    tracing::warn!(
                        message_id = ?message.message_id(),
                        "Received message without a receipt handle; skipping",
                    );
                    return None;
                };
                Some(ReceivedMessage {
                    message_id: message.message_id().map(str::to_string),
                    receipt_handle: receipt_handle.to_string(),
                    body: message.body().unwrap_or_default().to_string(),
                })
            })
            .collect();

        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> CoreResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(upstream)?;
        Ok(())
    }
}
