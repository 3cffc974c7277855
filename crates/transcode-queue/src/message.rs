//! Received queue messages.

use std::collections::HashMap;

/// System attribute carrying how many times a message has been received.
pub const RECEIVE_COUNT_ATTRIBUTE: &str = "ApproximateReceiveCount";

/// One delivery of a queue message.
///
/// The receipt token identifies this delivery, not the logical message: a
/// redelivery of the same message carries a new token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    body: String,
    receipt_token: String,
    message_id: Option<String>,
    attributes: HashMap<String, String>,
}

impl Message {
    pub fn new(body: impl Into<String>, receipt_token: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            receipt_token: receipt_token.into(),
            message_id: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn receipt_token(&self) -> &str {
        &self.receipt_token
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Number of times this message has been received, if reported.
    pub fn receive_count(&self) -> Option<u32> {
        self.attribute(RECEIVE_COUNT_ATTRIBUTE)?.parse().ok()
    }

    /// Identifier for logs: the message id, or a receipt token prefix.
    pub fn log_id(&self) -> &str {
        match &self.message_id {
            Some(id) => id,
            None => {
                let end = self
                    .receipt_token
                    .char_indices()
                    .nth(16)
                    .map(|(i, _)| i)
                    .unwrap_or(self.receipt_token.len());
                &self.receipt_token[..end]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_count() {
        let message = Message::new("body", "receipt").with_attribute(RECEIVE_COUNT_ATTRIBUTE, "3");
        assert_eq!(message.receive_count(), Some(3));

        let message = Message::new("body", "receipt").with_attribute(RECEIVE_COUNT_ATTRIBUTE, "n/a");
        assert_eq!(message.receive_count(), None);
        assert_eq!(Message::new("body", "receipt").receive_count(), None);
    }

    #[test]
    fn test_log_id_prefers_message_id() {
        let message = Message::new("b", "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a").with_message_id("m-1");
        assert_eq!(message.log_id(), "m-1");

        let message = Message::new("b", "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a");
        assert_eq!(message.log_id(), "AQEBwJnKyrHigUMZ");

        let message = Message::new("b", "short");
        assert_eq!(message.log_id(), "short");
    }
}
