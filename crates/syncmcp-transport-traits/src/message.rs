//! Transport message types.

use std::collections::HashMap;

use bytes::Bytes;
use syncmcp_protocol::MessageId;

/// A wrapper for a message being sent or received over a transport.
///
/// The payload is one complete JSON-RPC message; framing is the transport's job.
#[derive(Debug, Clone)]
pub struct TransportMessage {
    /// Identifier for tracing. For requests this is the JSON-RPC id; for
    /// other messages the sender picks any unique value.
    pub id: MessageId,

    /// The encoded JSON-RPC message.
    pub payload: Bytes,

    /// Metadata associated with the message.
    pub metadata: TransportMessageMetadata,
}

impl TransportMessage {
    /// Creates a new `TransportMessage` with a given ID and payload.
    pub fn new(id: MessageId, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
            metadata: TransportMessageMetadata::default(),
        }
    }

    /// Creates a new `TransportMessage` with the given ID, payload, and metadata.
    pub fn with_metadata(
        id: MessageId,
        payload: impl Into<Bytes>,
        metadata: TransportMessageMetadata,
    ) -> Self {
        Self {
            id,
            payload: payload.into(),
            metadata,
        }
    }

    /// Returns the size of the message payload in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Returns the content type of the message, if specified.
    pub fn content_type(&self) -> Option<&str> {
        self.metadata.content_type.as_deref()
    }
}

/// Metadata associated with a `TransportMessage`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMessageMetadata {
    /// The MIME type of the message payload (e.g., "application/json").
    pub content_type: Option<String>,

    /// A map of custom headers.
    pub headers: HashMap<String, String>,
}

impl TransportMessageMetadata {
    /// Creates metadata with a specified content type.
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..Default::default()
        }
    }

    /// Adds a header to the metadata using a builder pattern.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}
