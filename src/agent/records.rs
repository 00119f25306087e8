use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use openid4vci_frontend::MessageKind;

/// Lifecycle of a DIDComm connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Invited,
    Requested,
    Responded,
    Complete,
}

/// A connection as reported by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: String,
    pub their_label: Option<String>,
    /// Absent until the peer has responded.
    pub their_did: Option<String>,
    pub state: ConnectionState,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a credential exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialExchangeState {
    OfferSent,
    OfferReceived,
    RequestSent,
    CredentialReceived,
    Done,
}

/// A single name/value pair of a credential preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAttribute {
    pub name: String,
    pub value: String,
}

impl CredentialAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A credential exchange as reported by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialExchangeRecord {
    pub id: String,
    pub connection_id: String,
    pub state: CredentialExchangeState,
    pub attributes: Vec<CredentialAttribute>,
}

/// Lifecycle of a proof exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofExchangeState {
    RequestReceived,
    PresentationSent,
    Done,
}

/// A proof exchange as reported by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofExchangeRecord {
    pub id: String,
    pub connection_id: String,
    pub state: ProofExchangeState,
}

/// A message received by the wallet, as kept for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender_connection_id: String,
    pub sender_label: Option<String>,
    pub kind: MessageKind,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(
        sender_connection_id: impl Into<String>,
        sender_label: Option<String>,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender_connection_id: sender_connection_id.into(),
            sender_label,
            kind,
            content: content.into(),
            received_at: Utc::now(),
        }
    }
}

impl From<&MessageRecord> for openid4vci_frontend::DisplayMessage {
    fn from(value: &MessageRecord) -> Self {
        Self {
            sender_connection_id: value.sender_connection_id.clone(),
            sender_label: value.sender_label.clone(),
            kind: value.kind,
            content: value.content.clone(),
            received_at: value.received_at.timestamp_millis(),
        }
    }
}

/// A rendered connection invitation, ready to share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub url: String,
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_message_carries_epoch_millis() {
        let record = MessageRecord::new(
            "conn-1",
            Some("Transporter".to_owned()),
            MessageKind::BasicMessage,
            "hello",
        );
        let display = openid4vci_frontend::DisplayMessage::from(&record);
        assert_eq!(display.sender_connection_id, "conn-1");
        assert_eq!(display.kind, MessageKind::BasicMessage);
        assert_eq!(display.received_at, record.received_at.timestamp_millis());
    }
}
