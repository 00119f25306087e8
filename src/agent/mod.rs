//! Wallet services layered over an external DIDComm agent.
//!
//! The agent (see [provider::Provider]) owns keys, ledger access and protocol
//! state machines. This module owns what a demonstration wallet adds on top:
//! initialization, invitation handling, automatic responses to offers and proof
//! requests, and the message log shells render.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::{broadcast::error::RecvError, watch, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::WalletConfig;

use self::invitation::ConnectionInvitation;
use self::provider::{
    AgentEvent, CreateInvitationOptions, CredentialDefinitionTemplate, OfferCredentialOptions,
    Provider, SchemaTemplate,
};
use self::records::{
    ConnectionRecord, ConnectionState, CredentialAttribute, CredentialExchangeRecord,
    CredentialExchangeState, Invitation, MessageKind, MessageRecord, ProofExchangeRecord,
    ProofExchangeState,
};

pub mod invitation;
pub mod persona;
pub mod provider;
pub mod records;

#[derive(Debug, Default)]
struct ServiceState {
    open: bool,
    credential_definition_id: Option<String>,
}

/// Wallet services for one persona.
pub struct AgentService {
    provider: Arc<dyn Provider>,
    config: WalletConfig,
    state: Mutex<ServiceState>,
    messages: Mutex<Vec<MessageRecord>>,
}

impl AgentService {
    pub fn new(provider: Arc<dyn Provider>, config: WalletConfig) -> Self {
        Self {
            provider,
            config,
            state: Mutex::default(),
            messages: Mutex::default(),
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Open the wallet and make it usable: ensure the wallet key, open the
    /// agent, and register the demo schema and credential definition.
    pub async fn initialize(&self) -> Result<()> {
        let key = persona::load_or_create_wallet_key(&self.config.storage_dir)
            .await
            .context("failed to load wallet key")?;

        self.provider
            .open(&self.config, &key)
            .await
            .context("failed to open wallet agent")?;

        let credential_definition_id = self
            .prepare_for_issuance(&self.config.credential_attributes)
            .await?;

        let mut state = self.state.lock().await;
        state.open = true;
        state.credential_definition_id = Some(credential_definition_id.clone());
        drop(state);

        info!(%credential_definition_id, "wallet initialized");
        Ok(())
    }

    async fn prepare_for_issuance(&self, attributes: &[String]) -> Result<String> {
        info!(?attributes, "preparing for credential issuance");

        self.provider
            .public_did()
            .await?
            .ok_or(anyhow!("agent has no public DID"))?;

        let schema_id = self
            .provider
            .register_schema(SchemaTemplate {
                name: format!("schema-{}", Uuid::new_v4()),
                version: "1.0".to_owned(),
                attributes: attributes.to_vec(),
            })
            .await
            .context("failed to register schema")?;
        info!(%schema_id, "schema registered");

        // Give the ledger a moment to make the schema readable.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let (schema, seq_no) = self
            .provider
            .get_schema(&schema_id)
            .await
            .context("failed to retrieve schema")?;

        self.provider
            .register_credential_definition(CredentialDefinitionTemplate {
                schema,
                tag: "default".to_owned(),
                support_revocation: false,
                seq_no,
            })
            .await
            .context("failed to register credential definition")
    }

    pub async fn is_open(&self) -> bool {
        self.state.lock().await.open
    }

    async fn ensure_open(&self) -> Result<()> {
        if !self.is_open().await {
            bail!("wallet is not open")
        }
        Ok(())
    }

    /// The wallet's public DID, once the wallet is open.
    pub async fn public_did(&self) -> Option<String> {
        if !self.is_open().await {
            return None;
        }
        self.provider.public_did().await.ok().flatten()
    }

    /// Create a multi-use invitation others can connect through.
    pub async fn create_invitation(&self) -> Result<Invitation> {
        self.ensure_open().await?;

        let invitation = self
            .provider
            .create_invitation(CreateInvitationOptions {
                label: self.config.label.clone(),
                auto_accept: true,
                multi_use: true,
            })
            .await
            .context("failed to create invitation")?;

        let endpoint = invitation
            .service_endpoint
            .clone()
            .ok_or(anyhow!("invitation has no service endpoint"))?;
        let url = invitation.to_url(&endpoint)?;

        Ok(Invitation {
            url: url.to_string(),
            image_url: invitation.image_url.clone().unwrap_or_default(),
        })
    }

    /// Connect to another wallet using its invitation URL. Returns whether the
    /// connection protocol was started.
    pub async fn connect(&self, invitation_url: &str) -> Result<bool> {
        if !self.is_open().await {
            return Ok(false);
        }

        let url = invitation_url
            .trim()
            .parse()
            .context("unable to parse invitation URL")?;
        let invitation = ConnectionInvitation::from_url(&url)?;
        let record = self
            .provider
            .receive_invitation(invitation)
            .await
            .context("failed to receive invitation")?;
        info!(connection_id = %record.id, "received invitation");

        Ok(record.state == ConnectionState::Requested)
    }

    /// Established connections, newest first.
    pub async fn connections(&self) -> Result<Vec<ConnectionRecord>> {
        if !self.is_open().await {
            return Ok(Vec::new());
        }

        let mut connections: Vec<_> = self
            .provider
            .connections()
            .await
            .context("failed to list connections")?
            .into_iter()
            .filter(|connection| connection.their_did.is_some())
            .collect();
        connections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(connections)
    }

    /// Send a basic message or a credential offer over a connection.
    pub async fn send(
        &self,
        connection_id: &str,
        kind: MessageKind,
        content: Option<&str>,
    ) -> Result<()> {
        self.ensure_open().await?;

        let connection = self
            .provider
            .connection(connection_id)
            .await?
            .ok_or(anyhow!("connection not found: {connection_id}"))?;

        if connection.state != ConnectionState::Complete {
            bail!("connection is not complete: {:?}", connection.state)
        }

        match kind {
            MessageKind::BasicMessage => {
                self.provider
                    .send_basic_message(&connection.id, content.unwrap_or("N/A"))
                    .await
                    .context("failed to send basic message")?;
            }
            MessageKind::CredentialOffer => {
                self.send_credential_offer(&connection, content).await?;
            }
            other => bail!("unsupported message kind: {other:?}"),
        }

        info!(connection_id = %connection.id, "message sent");
        Ok(())
    }

    async fn send_credential_offer(
        &self,
        connection: &ConnectionRecord,
        comment: Option<&str>,
    ) -> Result<()> {
        let their_label = connection
            .their_label
            .clone()
            .unwrap_or_else(|| "Unknown".to_owned());

        let credential_definition_id = self
            .state
            .lock()
            .await
            .credential_definition_id
            .clone()
            .ok_or(anyhow!("wallet has no registered credential definition"))?;

        let attributes = vec![
            CredentialAttribute::new("access_requester", self.config.label.clone()),
            CredentialAttribute::new("access_granter", their_label.clone()),
            CredentialAttribute::new("resource_owner", their_label),
        ];

        self.provider
            .offer_credential(OfferCredentialOptions {
                connection_id: connection.id.clone(),
                comment: comment.unwrap_or("Credential Request").to_owned(),
                credential_definition_id,
                attributes,
                auto_accept: true,
            })
            .await
            .context("failed to offer credential")
    }

    /// Snapshot of the messages received so far.
    pub async fn received_messages(&self) -> Vec<MessageRecord> {
        self.messages.lock().await.clone()
    }

    /// Consume agent events until the agent shuts down, answering offers and
    /// proof requests automatically.
    pub async fn run(self: Arc<Self>) {
        let mut events = self.provider.subscribe();
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(err) = self.handle_event(event).await {
                        error!("error handling agent event: {err:#}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("agent event stream lagged, skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Handle one agent event.
    pub async fn handle_event(&self, event: AgentEvent) -> Result<()> {
        match event {
            AgentEvent::Credential(record) => self.handle_credential_event(record).await,
            AgentEvent::Proof(record) => self.handle_proof_event(record).await,
            AgentEvent::BasicMessage {
                connection_id,
                content,
            } => self.handle_basic_message(&connection_id, &content).await,
        }
    }

    async fn handle_basic_message(&self, connection_id: &str, content: &str) -> Result<()> {
        let Some(connection) = self.provider.connection(connection_id).await? else {
            warn!(%connection_id, "basic message from unknown connection");
            return Ok(());
        };

        info!(
            "received basic message from {}",
            connection.their_label.as_deref().unwrap_or("Unknown")
        );
        self.push_message(MessageRecord::new(
            connection.id.clone(),
            connection.their_label.clone(),
            MessageKind::BasicMessage,
            content,
        ))
        .await;
        Ok(())
    }

    async fn handle_credential_event(&self, record: CredentialExchangeRecord) -> Result<()> {
        let their_label = self
            .provider
            .connection(&record.connection_id)
            .await?
            .and_then(|connection| connection.their_label);

        match record.state {
            CredentialExchangeState::OfferReceived => {
                self.push_message(MessageRecord::new(
                    record.connection_id.clone(),
                    their_label,
                    MessageKind::CredentialOffer,
                    format!(
                        "Credential offer received. Attributes: {}",
                        format_attributes(&record.attributes)
                    ),
                ))
                .await;

                if let Err(err) = self.provider.accept_offer(&record.id).await {
                    error!("error accepting credential offer: {err:#}");
                }
            }
            CredentialExchangeState::Done => {
                self.push_message(MessageRecord::new(
                    record.connection_id.clone(),
                    their_label,
                    MessageKind::CredentialApproved,
                    format!("Credentials: {}", format_attributes(&record.attributes)),
                ))
                .await;
                info!(credential_record_id = %record.id, "credential exchange completed");
            }
            _ => {}
        }
        Ok(())
    }

    async fn handle_proof_event(&self, record: ProofExchangeRecord) -> Result<()> {
        match record.state {
            ProofExchangeState::RequestReceived => {
                if let Err(err) = self.send_proof(&record.id).await {
                    error!("error presenting proof: {err:#}");
                }
            }
            ProofExchangeState::Done => {
                info!(proof_record_id = %record.id, "proof exchange completed");
            }
            _ => {}
        }
        Ok(())
    }

    async fn send_proof(&self, proof_record_id: &str) -> Result<()> {
        let credentials = self
            .provider
            .credentials_for_proof_request(proof_record_id)
            .await
            .context("failed to retrieve credentials for proof request")?;
        self.provider
            .present_proof(proof_record_id, credentials)
            .await
            .context("failed to present proof")
    }

    async fn push_message(&self, message: MessageRecord) {
        self.messages.lock().await.push(message);
    }

    /// Publish connection snapshots at the configured cadence.
    pub fn watch_connections(self: Arc<Self>) -> watch::Receiver<Vec<ConnectionRecord>> {
        let (tx, rx) = watch::channel(Vec::new());
        let interval = self.config.refresh.connections();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let snapshot = self.connections().await.unwrap_or_default();
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
        });
        rx
    }

    /// Publish message snapshots at the configured cadence.
    pub fn watch_messages(self: Arc<Self>) -> watch::Receiver<Vec<MessageRecord>> {
        let (tx, rx) = watch::channel(Vec::new());
        let interval = self.config.refresh.messages();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let snapshot = self.received_messages().await;
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
        });
        rx
    }

    /// The wallet lifecycle as presented to a UI shell.
    pub async fn wallet_state(&self) -> openid4vci_frontend::WalletState {
        use openid4vci_frontend::WalletState;

        if !self.is_open().await {
            return WalletState::Initializing;
        }

        let public_did = match self.public_did().await {
            Some(did) => did,
            None => {
                return WalletState::Error {
                    message: "wallet has no public DID".to_owned(),
                }
            }
        };

        match self.create_invitation().await {
            Ok(invitation) => WalletState::Ready {
                public_did,
                wallet_id: self.config.label.clone(),
                invitation_url: invitation.url,
            },
            Err(err) => WalletState::Error {
                message: format!("{err:#}"),
            },
        }
    }
}

fn format_attributes(attributes: &[CredentialAttribute]) -> String {
    attributes
        .iter()
        .map(|attribute| format!("{}: {}", attribute.name, attribute.value))
        .collect::<Vec<_>>()
        .join(", ")
}
