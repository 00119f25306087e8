use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as Json;
use tokio::sync::broadcast;

use super::invitation::ConnectionInvitation;
use super::records::{
    ConnectionRecord, CredentialAttribute, CredentialExchangeRecord, ProofExchangeRecord,
};
use crate::config::WalletConfig;

/// Events published by the agent as protocol state machines advance.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Credential(CredentialExchangeRecord),
    Proof(ProofExchangeRecord),
    BasicMessage {
        connection_id: String,
        content: String,
    },
}

/// Options for creating a connection invitation.
#[derive(Debug, Clone)]
pub struct CreateInvitationOptions {
    pub label: String,
    pub auto_accept: bool,
    pub multi_use: bool,
}

/// Options for offering a credential over a connection.
#[derive(Debug, Clone)]
pub struct OfferCredentialOptions {
    pub connection_id: String,
    pub comment: String,
    pub credential_definition_id: String,
    pub attributes: Vec<CredentialAttribute>,
    pub auto_accept: bool,
}

/// Template for registering a schema on the ledger.
#[derive(Debug, Clone)]
pub struct SchemaTemplate {
    pub name: String,
    pub version: String,
    pub attributes: Vec<String>,
}

/// Template for registering a credential definition on the ledger.
#[derive(Debug, Clone)]
pub struct CredentialDefinitionTemplate {
    pub schema: Json,
    pub tag: String,
    pub support_revocation: bool,
    pub seq_no: u32,
}

/// Connection operations of the agent.
#[async_trait]
pub trait Connections: Send + Sync {
    async fn create_invitation(
        &self,
        options: CreateInvitationOptions,
    ) -> Result<ConnectionInvitation>;

    async fn receive_invitation(
        &self,
        invitation: ConnectionInvitation,
    ) -> Result<ConnectionRecord>;

    async fn connections(&self) -> Result<Vec<ConnectionRecord>>;

    async fn connection(&self, connection_id: &str) -> Result<Option<ConnectionRecord>>;
}

/// Credential exchange operations of the agent.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn offer_credential(&self, options: OfferCredentialOptions) -> Result<()>;

    async fn accept_offer(&self, credential_record_id: &str) -> Result<()>;
}

/// Proof exchange operations of the agent.
#[async_trait]
pub trait ProofExchange: Send + Sync {
    /// Credentials in the wallet satisfying the proof request, in the shape the
    /// agent expects them back.
    async fn credentials_for_proof_request(&self, proof_record_id: &str) -> Result<Json>;

    async fn present_proof(&self, proof_record_id: &str, credentials: Json) -> Result<()>;
}

/// Ledger operations of the agent.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn register_schema(&self, template: SchemaTemplate) -> Result<String>;

    /// The schema and its ledger sequence number.
    async fn get_schema(&self, schema_id: &str) -> Result<(Json, u32)>;

    async fn register_credential_definition(
        &self,
        template: CredentialDefinitionTemplate,
    ) -> Result<String>;
}

/// Basic messaging operations of the agent.
#[async_trait]
pub trait Messages: Send + Sync {
    async fn send_basic_message(&self, connection_id: &str, content: &str) -> Result<()>;
}

/// The external DIDComm agent this wallet drives.
///
/// The agent owns the wallet's keys, the ledger connection and the protocol
/// state machines; this library only orchestrates it.
#[async_trait]
pub trait Provider:
    Connections + CredentialExchange + ProofExchange + Ledger + Messages + Send + Sync
{
    /// Open the agent's wallet.
    async fn open(&self, config: &WalletConfig, wallet_key: &str) -> Result<()>;

    /// The wallet's public DID, once the wallet is open.
    async fn public_did(&self) -> Result<Option<String>>;

    /// Subscribe to agent events.
    fn subscribe(&self) -> broadcast::Receiver<AgentEvent>;
}
