use std::path::Path;
use std::sync::Arc;

use openid4vci::agent::persona::Persona;
use openid4vci::agent::provider::{AgentEvent, Provider};
use openid4vci::agent::records::MessageKind;
use openid4vci::agent::AgentService;
use openid4vci::frontend::WalletState;
use openid4vci::testing::MemoryAgent;
use tokio::sync::broadcast;

async fn persona_pair(
    storage_root: &Path,
) -> (
    Arc<AgentService>,
    Arc<MemoryAgent>,
    Arc<AgentService>,
    Arc<MemoryAgent>,
) {
    let transporter_agent = MemoryAgent::new();
    let producer_agent = MemoryAgent::new();
    MemoryAgent::pair(&transporter_agent, &producer_agent).await;

    let transporter = Arc::new(AgentService::new(
        transporter_agent.clone(),
        Persona::Transporter.config(storage_root),
    ));
    let producer = Arc::new(AgentService::new(
        producer_agent.clone(),
        Persona::FoodProducer.config(storage_root),
    ));

    transporter.initialize().await.unwrap();
    producer.initialize().await.unwrap();

    (transporter, transporter_agent, producer, producer_agent)
}

/// Feed every already-emitted event through the service, including events
/// emitted while handling earlier ones.
async fn drain(service: &Arc<AgentService>, events: &mut broadcast::Receiver<AgentEvent>) {
    while let Ok(event) = events.try_recv() {
        service.handle_event(event).await.unwrap();
    }
}

#[tokio::test]
async fn personas_connect_through_invitation_urls() {
    let dir = tempfile::tempdir().unwrap();
    let (transporter, _, producer, _) = persona_pair(dir.path()).await;

    let invitation = transporter.create_invitation().await.unwrap();
    assert!(invitation.url.contains("c_i="));

    assert!(producer.connect(&invitation.url).await.unwrap());

    let producer_connections = producer.connections().await.unwrap();
    assert_eq!(producer_connections.len(), 1);
    assert_eq!(
        producer_connections[0].their_label.as_deref(),
        Some("Transporter")
    );
    assert!(producer_connections[0].their_did.is_some());

    let transporter_connections = transporter.connections().await.unwrap();
    assert_eq!(transporter_connections.len(), 1);
    assert_eq!(
        transporter_connections[0].their_label.as_deref(),
        Some("FoodProducer")
    );
}

#[tokio::test]
async fn basic_messages_reach_the_peer_wallet() {
    let dir = tempfile::tempdir().unwrap();
    let (transporter, transporter_agent, producer, _) = persona_pair(dir.path()).await;

    let invitation = transporter.create_invitation().await.unwrap();
    producer.connect(&invitation.url).await.unwrap();
    let connection = producer.connections().await.unwrap()[0].clone();

    let mut transporter_events = transporter_agent.subscribe();
    producer
        .send(
            &connection.id,
            MessageKind::BasicMessage,
            Some("where is my shipment?"),
        )
        .await
        .unwrap();
    drain(&transporter, &mut transporter_events).await;

    let messages = transporter.received_messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::BasicMessage);
    assert_eq!(messages[0].content, "where is my shipment?");
    assert_eq!(messages[0].sender_label.as_deref(), Some("FoodProducer"));
}

#[tokio::test]
async fn credential_offers_are_recorded_and_auto_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let (transporter, transporter_agent, producer, producer_agent) =
        persona_pair(dir.path()).await;

    let invitation = transporter.create_invitation().await.unwrap();
    producer.connect(&invitation.url).await.unwrap();
    let connection = transporter.connections().await.unwrap()[0].clone();

    let mut producer_events = producer_agent.subscribe();
    let mut transporter_events = transporter_agent.subscribe();

    transporter
        .send(&connection.id, MessageKind::CredentialOffer, None)
        .await
        .unwrap();

    // The offer is recorded and auto-accepted; acceptance completes the
    // exchange on both sides.
    drain(&producer, &mut producer_events).await;
    drain(&transporter, &mut transporter_events).await;

    let producer_messages = producer.received_messages().await;
    let kinds: Vec<_> = producer_messages.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        [MessageKind::CredentialOffer, MessageKind::CredentialApproved]
    );
    assert!(producer_messages[0]
        .content
        .contains("access_requester: Transporter"));
    assert!(producer_messages[0]
        .content
        .contains("access_granter: FoodProducer"));

    let transporter_messages = transporter.received_messages().await;
    assert_eq!(transporter_messages.len(), 1);
    assert_eq!(transporter_messages[0].kind, MessageKind::CredentialApproved);
}

#[tokio::test]
async fn proof_requests_are_answered_automatically() {
    let dir = tempfile::tempdir().unwrap();
    let (transporter, _, producer, producer_agent) = persona_pair(dir.path()).await;

    let invitation = transporter.create_invitation().await.unwrap();
    producer.connect(&invitation.url).await.unwrap();
    let connection = producer.connections().await.unwrap()[0].clone();

    let mut producer_events = producer_agent.subscribe();
    producer_agent.trigger_proof_request(&connection.id);

    // Handles the request, presents the proof, then sees the Done event.
    drain(&producer, &mut producer_events).await;
}

#[tokio::test]
async fn closed_wallet_refuses_operations() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(AgentService::new(
        MemoryAgent::new(),
        Persona::FoodProcessor.config(dir.path()),
    ));

    assert_eq!(service.wallet_state().await, WalletState::Initializing);
    assert!(!service.connect("https://example.com?c_i=x").await.unwrap());
    assert!(service.connections().await.unwrap().is_empty());
    assert!(service.create_invitation().await.is_err());
    assert!(service
        .send("unknown", MessageKind::BasicMessage, Some("hi"))
        .await
        .is_err());
    assert!(service.public_did().await.is_none());
}

#[tokio::test]
async fn initialized_wallet_reports_ready_state() {
    let dir = tempfile::tempdir().unwrap();
    let (transporter, _, _, _) = persona_pair(dir.path()).await;

    match transporter.wallet_state().await {
        WalletState::Ready {
            public_did,
            wallet_id,
            invitation_url,
        } => {
            assert!(public_did.starts_with("did:sov:"));
            assert_eq!(wallet_id, "Transporter");
            assert!(invitation_url.contains("c_i="));
        }
        other => panic!("unexpected wallet state: {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_message_kinds_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let (transporter, _, producer, _) = persona_pair(dir.path()).await;

    let invitation = transporter.create_invitation().await.unwrap();
    producer.connect(&invitation.url).await.unwrap();
    let connection = producer.connections().await.unwrap()[0].clone();

    assert!(producer
        .send(&connection.id, MessageKind::ProofRequest, None)
        .await
        .is_err());
}
