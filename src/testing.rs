//! In-process doubles for the agent provider and the HTTP seam, for tests and
//! demonstrations.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use http::{Request, Response, StatusCode};
use serde_json::{json, Value as Json};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::agent::invitation::ConnectionInvitation;
use crate::agent::provider::{
    AgentEvent, Connections, CreateInvitationOptions, CredentialDefinitionTemplate,
    CredentialExchange, Ledger, Messages, OfferCredentialOptions, ProofExchange, Provider,
    SchemaTemplate,
};
use crate::agent::records::{
    ConnectionRecord, ConnectionState, CredentialExchangeRecord, CredentialExchangeState,
    ProofExchangeRecord, ProofExchangeState,
};
use crate::config::WalletConfig;
use crate::core::util::AsyncHttpClient;

#[derive(Default)]
struct AgentState {
    open: bool,
    label: String,
    public_did: Option<String>,
    connections: Vec<ConnectionRecord>,
    pending_offers: HashMap<String, CredentialExchangeRecord>,
    schemas: HashMap<String, Json>,
}

/// An in-memory stand-in for a DIDComm agent.
///
/// Two instances can be [paired](Self::pair) so connections, messages, offers
/// and proofs flow between them in-process. Nothing is signed or encrypted;
/// this is wiring for tests, not an agent.
pub struct MemoryAgent {
    state: Mutex<AgentState>,
    events: broadcast::Sender<AgentEvent>,
    peer: Mutex<Weak<MemoryAgent>>,
}

impl MemoryAgent {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            state: Mutex::new(AgentState::default()),
            events,
            peer: Mutex::new(Weak::new()),
        })
    }

    /// Link two agents so their traffic reaches each other.
    pub async fn pair(a: &Arc<Self>, b: &Arc<Self>) {
        *a.peer.lock().await = Arc::downgrade(b);
        *b.peer.lock().await = Arc::downgrade(a);
    }

    async fn peer(&self) -> Result<Arc<Self>> {
        self.peer
            .lock()
            .await
            .upgrade()
            .ok_or(anyhow!("agent has no paired peer"))
    }

    async fn label(&self) -> String {
        self.state.lock().await.label.clone()
    }

    async fn add_connection(&self, connection_id: &str, their_label: String) {
        let record = ConnectionRecord {
            id: connection_id.to_owned(),
            their_label: Some(their_label),
            their_did: Some(format!("did:peer:{}", Uuid::new_v4())),
            state: ConnectionState::Complete,
            created_at: Utc::now(),
        };
        self.state.lock().await.connections.push(record);
    }

    fn emit(&self, event: AgentEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Deliver a proof request to this agent, as a verifier would.
    pub fn trigger_proof_request(&self, connection_id: &str) -> String {
        let proof_record_id = Uuid::new_v4().to_string();
        self.emit(AgentEvent::Proof(ProofExchangeRecord {
            id: proof_record_id.clone(),
            connection_id: connection_id.to_owned(),
            state: ProofExchangeState::RequestReceived,
        }));
        proof_record_id
    }
}

#[async_trait]
impl Connections for MemoryAgent {
    async fn create_invitation(
        &self,
        options: CreateInvitationOptions,
    ) -> Result<ConnectionInvitation> {
        let endpoint = "https://mediator.example.com"
            .parse()
            .context("invalid mediator endpoint")?;
        Ok(ConnectionInvitation::new(
            options.label,
            endpoint,
            vec![Uuid::new_v4().simple().to_string()],
        ))
    }

    async fn receive_invitation(
        &self,
        invitation: ConnectionInvitation,
    ) -> Result<ConnectionRecord> {
        if !self.state.lock().await.open {
            bail!("wallet is not open")
        }

        let peer = self.peer().await?;
        // Both sides share the connection id, which keeps event routing trivial.
        let connection_id = Uuid::new_v4().to_string();
        let inviter_label = invitation
            .label
            .clone()
            .unwrap_or_else(|| "Unknown".to_owned());
        let own_label = self.label().await;

        self.add_connection(&connection_id, inviter_label).await;
        peer.add_connection(&connection_id, own_label).await;

        let record = self
            .connection(&connection_id)
            .await?
            .ok_or(anyhow!("connection was not stored"))?;
        Ok(ConnectionRecord {
            state: ConnectionState::Requested,
            ..record
        })
    }

    async fn connections(&self) -> Result<Vec<ConnectionRecord>> {
        Ok(self.state.lock().await.connections.clone())
    }

    async fn connection(&self, connection_id: &str) -> Result<Option<ConnectionRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .connections
            .iter()
            .find(|connection| connection.id == connection_id)
            .cloned())
    }
}

#[async_trait]
impl CredentialExchange for MemoryAgent {
    async fn offer_credential(&self, options: OfferCredentialOptions) -> Result<()> {
        if self.connection(&options.connection_id).await?.is_none() {
            bail!("unknown connection: {}", options.connection_id)
        }

        let peer = self.peer().await?;
        let record = CredentialExchangeRecord {
            id: Uuid::new_v4().to_string(),
            connection_id: options.connection_id,
            state: CredentialExchangeState::OfferReceived,
            attributes: options.attributes,
        };
        peer.state
            .lock()
            .await
            .pending_offers
            .insert(record.id.clone(), record.clone());
        peer.emit(AgentEvent::Credential(record));
        Ok(())
    }

    async fn accept_offer(&self, credential_record_id: &str) -> Result<()> {
        let record = self
            .state
            .lock()
            .await
            .pending_offers
            .remove(credential_record_id)
            .ok_or(anyhow!(
                "unknown credential record: {credential_record_id}"
            ))?;

        let done = CredentialExchangeRecord {
            state: CredentialExchangeState::Done,
            ..record
        };
        self.emit(AgentEvent::Credential(done.clone()));
        if let Ok(peer) = self.peer().await {
            peer.emit(AgentEvent::Credential(done));
        }
        Ok(())
    }
}

#[async_trait]
impl ProofExchange for MemoryAgent {
    async fn credentials_for_proof_request(&self, _proof_record_id: &str) -> Result<Json> {
        Ok(json!({
            "requested_attributes": {},
            "requested_predicates": {},
            "self_attested_attributes": {},
        }))
    }

    async fn present_proof(&self, proof_record_id: &str, _credentials: Json) -> Result<()> {
        let done = ProofExchangeRecord {
            id: proof_record_id.to_owned(),
            connection_id: String::new(),
            state: ProofExchangeState::Done,
        };
        self.emit(AgentEvent::Proof(done.clone()));
        if let Ok(peer) = self.peer().await {
            peer.emit(AgentEvent::Proof(done));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryAgent {
    async fn register_schema(&self, template: SchemaTemplate) -> Result<String> {
        let mut state = self.state.lock().await;
        let did = state
            .public_did
            .clone()
            .ok_or(anyhow!("wallet is not open"))?;
        let schema_id = format!("{did}:2:{}:{}", template.name, template.version);
        let schema = json!({
            "id": schema_id,
            "name": template.name,
            "version": template.version,
            "attrNames": template.attributes,
        });
        state.schemas.insert(schema_id.clone(), schema);
        Ok(schema_id)
    }

    async fn get_schema(&self, schema_id: &str) -> Result<(Json, u32)> {
        let state = self.state.lock().await;
        let schema = state
            .schemas
            .get(schema_id)
            .cloned()
            .ok_or(anyhow!("unknown schema: {schema_id}"))?;
        Ok((schema, state.schemas.len() as u32))
    }

    async fn register_credential_definition(
        &self,
        template: CredentialDefinitionTemplate,
    ) -> Result<String> {
        let state = self.state.lock().await;
        let did = state
            .public_did
            .clone()
            .ok_or(anyhow!("wallet is not open"))?;
        Ok(format!("{did}:3:CL:{}:{}", template.seq_no, template.tag))
    }
}

#[async_trait]
impl Messages for MemoryAgent {
    async fn send_basic_message(&self, connection_id: &str, content: &str) -> Result<()> {
        if self.connection(connection_id).await?.is_none() {
            bail!("unknown connection: {connection_id}")
        }
        let peer = self.peer().await?;
        peer.emit(AgentEvent::BasicMessage {
            connection_id: connection_id.to_owned(),
            content: content.to_owned(),
        });
        Ok(())
    }
}

#[async_trait]
impl Provider for MemoryAgent {
    async fn open(&self, config: &WalletConfig, _wallet_key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.open = true;
        state.label = config.label.clone();
        state.public_did = Some(format!("did:sov:{}", config.label));
        Ok(())
    }

    async fn public_did(&self) -> Result<Option<String>> {
        Ok(self.state.lock().await.public_did.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }
}

/// What a [StaticHttpClient] saw of one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

/// An [AsyncHttpClient] serving canned JSON responses keyed by request path,
/// recording every request it sees.
#[derive(Debug, Default)]
pub struct StaticHttpClient {
    routes: Vec<(String, StatusCode, Json)>,
    recorded: Mutex<Vec<RecordedRequest>>,
}

impl StaticHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `status` for requests to `path`.
    pub fn with(mut self, path: &str, status: StatusCode, body: Json) -> Self {
        self.routes.push((path.to_owned(), status, body));
        self
    }

    /// Every request executed so far, in order.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().await.clone()
    }
}

#[async_trait]
impl AsyncHttpClient for StaticHttpClient {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let path = request.uri().path().to_owned();
        self.recorded.lock().await.push(RecordedRequest {
            method: request.method().to_string(),
            path: path.clone(),
            authorization: request
                .headers()
                .get(http::header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(ToOwned::to_owned),
            body: request.body().clone(),
        });

        let (_, status, body) = self
            .routes
            .iter()
            .find(|(route, _, _)| *route == path)
            .ok_or(anyhow!("no canned response for {path}"))?;

        Response::builder()
            .status(*status)
            .body(serde_json::to_vec(body).context("failed to encode canned response")?)
            .context("unable to construct response")
    }
}
