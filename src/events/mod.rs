//! # Events Module
//!
//! Product change events carried by the broker and their dispatch into the
//! search service.
//!
//! An event is identified by its routing key (`product.created`,
//! `product.updated`, `product.deleted`). The body is a JSON object; only its
//! `id` is trusted, everything else is re-read from the catalog of record.

pub mod processor;

pub use processor::EventProcessor;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::core::error::SearchResult;

/// Kind of product change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Created,
    Updated,
    Deleted,
}

impl EventType {
    /// Every event type the consumer binds its queue to
    pub const ALL: [EventType; 3] = [EventType::Created, EventType::Updated, EventType::Deleted];

    /// Broker routing key of the event type
    pub fn routing_key(&self) -> &'static str {
        match self {
            EventType::Created => "product.created",
            EventType::Updated => "product.updated",
            EventType::Deleted => "product.deleted",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.routing_key())
    }
}

impl FromStr for EventType {
    type Err = EventDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event_type| event_type.routing_key() == s)
            .ok_or_else(|| EventDecodeError::UnknownRoutingKey(s.to_string()))
    }
}

/// A decoded product change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductEvent {
    pub event_type: EventType,
    pub product_id: String,
}

impl ProductEvent {
    pub fn new<S: Into<String>>(event_type: EventType, product_id: S) -> Self {
        Self {
            event_type,
            product_id: product_id.into(),
        }
    }
}

/// Why a delivery could not be turned into a [`ProductEvent`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventDecodeError {
    #[error("unknown routing key '{0}'")]
    UnknownRoutingKey(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("payload carries no product id")]
    MissingProductId,
}

#[derive(Deserialize)]
struct EventPayload {
    #[serde(default)]
    id: Option<String>,
}

/// Decode a delivery into an event.
///
/// The body must be a JSON object whose `id` is a non-empty string; other
/// fields are ignored.
pub fn decode_event(routing_key: &str, body: &[u8]) -> Result<ProductEvent, EventDecodeError> {
    let event_type = routing_key.parse::<EventType>()?;

    let payload: EventPayload = serde_json::from_slice(body)
        .map_err(|e| EventDecodeError::InvalidPayload(e.to_string()))?;

    match payload.id {
        Some(id) if !id.trim().is_empty() => Ok(ProductEvent::new(event_type, id.trim())),
        _ => Err(EventDecodeError::MissingProductId),
    }
}

/// Receiver of decoded events
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &ProductEvent) -> SearchResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_keys_round_trip() {
        for event_type in EventType::ALL {
            assert_eq!(event_type.routing_key().parse::<EventType>(), Ok(event_type));
        }
        assert!("product.archived".parse::<EventType>().is_err());
    }

    #[test]
    fn test_decode_full_catalog_payload() {
        let body = br#"{"id":"665f1c","name":"Floral Bloom","precio":59.9,"notas":["rose"]}"#;
        let event = decode_event("product.updated", body).unwrap();
        assert_eq!(event, ProductEvent::new(EventType::Updated, "665f1c"));
    }

    #[test]
    fn test_decode_failures() {
        assert_eq!(
            decode_event("product.renamed", br#"{"id":"1"}"#),
            Err(EventDecodeError::UnknownRoutingKey("product.renamed".to_string()))
        );
        assert!(matches!(
            decode_event("product.created", b"not json"),
            Err(EventDecodeError::InvalidPayload(_))
        ));
        assert!(matches!(
            decode_event("product.created", b"[1,2]"),
            Err(EventDecodeError::InvalidPayload(_))
        ));
        assert_eq!(
            decode_event("product.deleted", br#"{"name":"x"}"#),
            Err(EventDecodeError::MissingProductId)
        );
        assert_eq!(
            decode_event("product.deleted", br#"{"id":"  "}"#),
            Err(EventDecodeError::MissingProductId)
        );
    }

    #[test]
    fn test_numeric_id_is_invalid_payload() {
        assert!(matches!(
            decode_event("product.deleted", br#"{"id":42}"#),
            Err(EventDecodeError::InvalidPayload(_))
        ));
    }
}
