//! Issuance and wallet data structures that are needed on the frontend, without
//! all of the other dependencies that can cause compilation issues with web
//! targets.
use serde::{Deserialize, Serialize};

/// Status of an OID4VCI issuance flow.
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Status {
    /// The credential offer has been parsed and resolved.
    OfferReceived,
    /// The issuer's metadata has been retrieved from its well-known endpoint.
    MetadataFetched,
    /// The pre-authorized code has been exchanged for an access token.
    TokenReceived,
    /// The flow has finished.
    Complete(Outcome),
}

/// Outcome of an OID4VCI issuance flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Outcome {
    /// An error occurred while the flow was executing.
    Error { cause: String },
    /// The issuer refused to issue the requested credential.
    Failure { reason: String },
    /// The credential was issued and stored.
    Success { credential_id: String },
}

impl PartialEq for Outcome {
    fn eq(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

impl Outcome {
    fn ordering(&self) -> u8 {
        match self {
            Outcome::Error { .. } => 0,
            Outcome::Failure { .. } => 1,
            Outcome::Success { .. } => 2,
        }
    }
}

impl PartialOrd for Outcome {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.ordering().partial_cmp(&other.ordering())
    }
}

/// Lifecycle of a persona wallet as presented to a UI shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalletState {
    /// The agent is being opened and the demo credential definition registered.
    Initializing,
    /// The wallet is ready for connections and issuance.
    Ready {
        public_did: String,
        wallet_id: String,
        invitation_url: String,
    },
    /// Initialization failed.
    Error { message: String },
}

/// Kind of message surfaced by the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    BasicMessage,
    CredentialOffer,
    CredentialApproved,
    ProofRequest,
    ProofResponse,
    Unknown,
}

/// A message entry as displayed by a UI shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub sender_connection_id: String,
    pub sender_label: Option<String>,
    pub kind: MessageKind,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub received_at: i64,
}
