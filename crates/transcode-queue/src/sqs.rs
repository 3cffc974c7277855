//! Amazon SQS queue client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::types::MessageSystemAttributeName;
use aws_sdk_sqs::Client;
use tracing::{debug, info, warn};

use crate::binding::{PollRequest, QueueBinding};
use crate::client::QueueClient;
use crate::error::{QueueError, QueueOperation, QueueResult};
use crate::message::Message;

/// How the client obtains AWS credentials.
#[derive(Clone)]
pub enum CredentialsSource {
    /// Static access keys.
    Static {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    /// The SDK default chain (environment, profile, instance metadata).
    DefaultChain,
}

impl std::fmt::Debug for CredentialsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialsSource::Static { access_key_id, .. } => f
                .debug_struct("Static")
                .field("access_key_id", access_key_id)
                .finish_non_exhaustive(),
            CredentialsSource::DefaultChain => f.write_str("DefaultChain"),
        }
    }
}

/// SQS-backed [`QueueClient`].
#[derive(Clone)]
pub struct SqsQueueClient {
    client: Client,
}

impl SqsQueueClient {
    /// Build a client for the binding's region and endpoint.
    ///
    /// Credentials are resolved eagerly so a missing or broken chain fails
    /// here with [`QueueError::CredentialsUnavailable`] instead of on the
    /// first receive.
    pub async fn connect(binding: &QueueBinding, credentials: CredentialsSource) -> QueueResult<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(binding.region().to_string()));

        if let Some(endpoint_url) = binding.endpoint_url() {
            loader = loader.endpoint_url(endpoint_url);
        }

        if let CredentialsSource::Static {
            access_key_id,
            secret_access_key,
            session_token,
        } = &credentials
        {
            loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                "transcode-static",
            ));
        }

        let sdk_config = loader.load().await;

        let provider = sdk_config
            .credentials_provider()
            .ok_or_else(|| QueueError::credentials_unavailable("no credentials provider configured"))?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| QueueError::credentials_unavailable(DisplayErrorContext(&e).to_string()))?;

        info!(
            region = binding.region(),
            endpoint = binding.endpoint_url().unwrap_or("default"),
            credentials = ?credentials,
            "Connected SQS client"
        );

        Ok(Self::from_client(Client::new(&sdk_config)))
    }

    /// Wrap an already configured SDK client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn receive(&self, binding: &QueueBinding, request: &PollRequest) -> QueueResult<Vec<Message>> {
        let output = self
            .client
            .receive_message()
            .queue_url(binding.queue_url())
            .max_number_of_messages(request.max_messages() as i32)
            .visibility_timeout(duration_secs(request.visibility_timeout()))
            .wait_time_seconds(duration_secs(request.wait_time()))
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| transport_error(QueueOperation::Receive, e))?;

        let messages: Vec<Message> = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(into_message)
            .collect();

        debug!(count = messages.len(), queue = binding.queue_url(), "Polled response from SQS");
        Ok(messages)
    }

    async fn delete(&self, binding: &QueueBinding, receipt_token: &str) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(binding.queue_url())
            .receipt_handle(receipt_token)
            .send()
            .await
            .map_err(|e| transport_error(QueueOperation::Delete, e))?;

        Ok(())
    }
}

/// Convert an SDK message. Deliveries without a receipt handle cannot be
/// acknowledged and are dropped here.
fn into_message(message: aws_sdk_sqs::types::Message) -> Option<Message> {
    let Some(receipt_token) = message.receipt_handle else {
        warn!(
            message_id = message.message_id.as_deref().unwrap_or("unknown"),
            "Skipping SQS message without receipt handle"
        );
        return None;
    };

    let mut attributes: HashMap<String, String> = message
        .attributes
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name.as_str().to_string(), value))
        .collect();

    // Only string-typed message attributes are kept; binary values are dropped.
    for (name, value) in message.message_attributes.unwrap_or_default() {
        if let Some(string_value) = value.string_value {
            attributes.insert(name, string_value);
        }
    }

    let mut converted = Message::new(message.body.unwrap_or_default(), receipt_token)
        .with_attributes(attributes);
    if let Some(message_id) = message.message_id {
        converted = converted.with_message_id(message_id);
    }
    Some(converted)
}

fn transport_error<E, R>(operation: QueueOperation, err: SdkError<E, R>) -> QueueError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = match err.code() {
        Some(code) => code.to_string(),
        None => match &err {
            SdkError::TimeoutError(_) => "Timeout",
            SdkError::DispatchFailure(_) => "DispatchFailure",
            SdkError::ResponseError(_) => "ResponseError",
            SdkError::ConstructionFailure(_) => "ConstructionFailure",
            _ => "Unknown",
        }
        .to_string(),
    };
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    QueueError::transport(operation, code, message)
}

fn duration_secs(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sqs::error::ErrorMetadata;
    use aws_sdk_sqs::operation::receive_message::ReceiveMessageError;
    use aws_sdk_sqs::types::MessageAttributeValue;

    #[test]
    fn test_into_message_collects_attributes() {
        let sdk_message = aws_sdk_sqs::types::Message::builder()
            .body(r#"{"type":"320p"}"#)
            .receipt_handle("receipt-1")
            .message_id("id-1")
            .attributes(MessageSystemAttributeName::ApproximateReceiveCount, "2")
            .message_attributes(
                "origin",
                MessageAttributeValue::builder()
                    .data_type("String")
                    .string_value("upload-api")
                    .build()
                    .unwrap(),
            )
            .build();

        let message = into_message(sdk_message).unwrap();
        assert_eq!(message.body(), r#"{"type":"320p"}"#);
        assert_eq!(message.receipt_token(), "receipt-1");
        assert_eq!(message.message_id(), Some("id-1"));
        assert_eq!(message.receive_count(), Some(2));
        assert_eq!(message.attribute("origin"), Some("upload-api"));
    }

    #[test]
    fn test_into_message_requires_receipt_handle() {
        let sdk_message = aws_sdk_sqs::types::Message::builder()
            .body("orphan")
            .message_id("id-2")
            .build();
        assert!(into_message(sdk_message).is_none());
    }

    #[test]
    fn test_into_message_empty_body() {
        let sdk_message = aws_sdk_sqs::types::Message::builder()
            .receipt_handle("receipt-3")
            .build();
        let message = into_message(sdk_message).unwrap();
        assert_eq!(message.body(), "");
        assert_eq!(message.message_id(), None);
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let source = CredentialsSource::Static {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
            session_token: None,
        };
        let rendered = format!("{:?}", source);
        assert!(rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("wJalrXUtnFEMI"));
    }

    type ReceiveSdkError = SdkError<ReceiveMessageError, ()>;

    #[test]
    fn test_transport_error_keeps_service_code() {
        let service_error = ReceiveMessageError::generic(
            ErrorMetadata::builder()
                .code("AWS.SimpleQueueService.NonExistentQueue")
                .message("The specified queue does not exist.")
                .build(),
        );
        let err = transport_error(
            QueueOperation::Receive,
            ReceiveSdkError::service_error(service_error, ()),
        );

        assert_eq!(err.code(), Some("AWS.SimpleQueueService.NonExistentQueue"));
        match err {
            QueueError::Transport {
                operation, message, ..
            } => {
                assert!(matches!(operation, QueueOperation::Receive));
                assert_eq!(message, "The specified queue does not exist.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_transport_error_fallback_codes() {
        let err = transport_error(
            QueueOperation::Delete,
            ReceiveSdkError::timeout_error("connect timed out"),
        );
        assert_eq!(err.code(), Some("Timeout"));
        assert!(err.to_string().starts_with("Queue delete failed [Timeout]"));
        assert!(err.to_string().contains("connect timed out"));

        let err = transport_error(
            QueueOperation::Receive,
            ReceiveSdkError::construction_failure("missing queue url"),
        );
        assert_eq!(err.code(), Some("ConstructionFailure"));
        assert!(err.is_transport());
    }

    #[test]
    fn test_duration_secs_saturates() {
        assert_eq!(duration_secs(Duration::from_secs(5)), 5);
        assert_eq!(duration_secs(Duration::from_secs(u64::MAX)), i32::MAX);
    }
}
