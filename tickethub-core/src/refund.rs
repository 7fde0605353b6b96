use serde::{Deserialize, Serialize};

/// Refund notification as published on the refund exchange.
///
/// `refund_id` is the idempotency key. Producers that predate it simply
/// omit the field; those messages are applied with at-least-once semantics
/// instead of at-most-once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefundMessage {
    #[serde(rename = "eventID")]
    pub event_id: String,
    #[serde(rename = "ticketType")]
    pub ticket_type: String,
    #[serde(rename = "ticketQuantity")]
    pub ticket_quantity: i64,
    #[serde(rename = "refundID", default, skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
}

impl RefundMessage {
    /// Decode a raw message body. A refund always restocks, so a zero or
    /// negative quantity is malformed, not a reverse adjustment.
    pub fn decode(payload: &[u8]) -> Result<Self, RefundDecodeError> {
        let msg: RefundMessage = serde_json::from_slice(payload)?;
        if msg.ticket_quantity <= 0 {
            return Err(RefundDecodeError::NonPositiveQuantity(msg.ticket_quantity));
        }
        Ok(msg)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RefundDecodeError {
    #[error("invalid refund payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("refund quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_field_names() {
        let msg = RefundMessage::decode(
            br#"{"eventID":"E1","ticketType":"VIP","ticketQuantity":4}"#,
        )
        .unwrap();
        assert_eq!(msg.event_id, "E1");
        assert_eq!(msg.ticket_type, "VIP");
        assert_eq!(msg.ticket_quantity, 4);
        assert_eq!(msg.refund_id, None);
    }

    #[test]
    fn decodes_optional_refund_id() {
        let msg = RefundMessage::decode(
            br#"{"eventID":"E1","ticketType":"VIP","ticketQuantity":1,"refundID":"r-42"}"#,
        )
        .unwrap();
        assert_eq!(msg.refund_id.as_deref(), Some("r-42"));
    }

    #[test]
    fn rejects_garbage_and_missing_fields() {
        assert!(RefundMessage::decode(b"not json").is_err());
        assert!(RefundMessage::decode(br#"{"eventID":"E1"}"#).is_err());
    }

    #[test]
    fn rejects_non_positive_quantities() {
        for qty in ["0", "-3"] {
            let body = format!(
                r#"{{"eventID":"E1","ticketType":"VIP","ticketQuantity":{qty}}}"#
            );
            assert!(matches!(
                RefundMessage::decode(body.as_bytes()),
                Err(RefundDecodeError::NonPositiveQuantity(_))
            ));
        }
    }
}
