use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use anyhow::{bail, Error, Ok, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::credential_offer::CredentialOfferObject;

/// State of a single issuance attempt.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    /// The resolved offer the session was opened for.
    pub offer: CredentialOfferObject,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Status {
    /// The credential offer has been parsed and resolved.
    OfferReceived,
    /// The issuer's metadata has been retrieved.
    MetadataFetched,
    /// The pre-authorized code has been exchanged for an access token.
    TokenReceived,
    /// The flow has finished.
    Complete(Outcome),
}

#[derive(Debug, Clone)]
pub enum Outcome {
    /// An error occurred while the flow was executing.
    Error { cause: Arc<Error> },
    /// The issuer refused to issue the requested credential.
    Failure { reason: String },
    /// The credential was issued and stored.
    Success { credential_id: Uuid },
}

/// Storage interface for issuance session information.
#[async_trait]
pub trait SessionStore: Debug {
    /// Store a new issuance session.
    async fn initiate(&self, session: Session) -> Result<()>;

    /// Update the status of a session.
    async fn update_status(&self, id: Uuid, status: Status) -> Result<()>;

    /// Get a session from the store.
    async fn get_session(&self, id: Uuid) -> Result<Session>;

    /// Remove a session from the store.
    async fn remove_session(&self, id: Uuid) -> Result<()>;
}

/// A local in-memory store. Issuance sessions are ephemeral UI state, so this is
/// the default; it will not work for a distributed deployment.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    store: Arc<Mutex<BTreeMap<Uuid, Session>>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn initiate(&self, session: Session) -> Result<()> {
        self.store.try_lock()?.insert(session.id, session);

        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: Status) -> Result<()> {
        if let Some(session) = self.store.try_lock()?.get_mut(&id) {
            // A finished flow keeps its terminal outcome.
            if !matches!(session.status, Status::Complete(_)) {
                session.status = status;
            }
            return Ok(());
        }
        bail!("session not found")
    }

    async fn get_session(&self, id: Uuid) -> Result<Session> {
        if let Some(session) = self.store.try_lock()?.get(&id) {
            return Ok(session.clone());
        }

        bail!("session not found")
    }

    async fn remove_session(&self, id: Uuid) -> Result<()> {
        if self.store.try_lock()?.remove(&id).is_some() {
            return Ok(());
        }

        bail!("session not found")
    }
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

impl From<&Outcome> for openid4vci_frontend::Outcome {
    fn from(value: &Outcome) -> Self {
        match value {
            Outcome::Error { cause } => Self::Error {
                cause: format!("{cause:#}"),
            },
            Outcome::Failure { reason } => Self::Failure {
                reason: reason.clone(),
            },
            Outcome::Success { credential_id } => Self::Success {
                credential_id: credential_id.to_string(),
            },
        }
    }
}

impl From<&Status> for openid4vci_frontend::Status {
    fn from(value: &Status) -> Self {
        match value {
            Status::OfferReceived => Self::OfferReceived,
            Status::MetadataFetched => Self::MetadataFetched,
            Status::TokenReceived => Self::TokenReceived,
            Status::Complete(outcome) => Self::Complete(outcome.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: Uuid) -> Session {
        let offer: CredentialOfferObject = serde_json::from_str(
            r#"{
                "credential_issuer": "https://issuer.example.com",
                "credential_configuration_ids": ["org.example.AccessCredential"]
            }"#,
        )
        .unwrap();
        Session {
            id,
            offer,
            status: Status::OfferReceived,
        }
    }

    #[tokio::test]
    async fn status_advances_but_never_regresses_past_complete() {
        let store = MemorySessionStore::default();
        let id = Uuid::new_v4();
        store.initiate(session(id)).await.unwrap();

        store
            .update_status(id, Status::MetadataFetched)
            .await
            .unwrap();
        store
            .update_status(
                id,
                Status::Complete(Outcome::Success {
                    credential_id: Uuid::new_v4(),
                }),
            )
            .await
            .unwrap();
        store
            .update_status(id, Status::TokenReceived)
            .await
            .unwrap();

        assert!(matches!(
            store.get_session(id).await.unwrap().status,
            Status::Complete(Outcome::Success { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_session_is_an_error() {
        let store = MemorySessionStore::default();
        assert!(store.get_session(Uuid::new_v4()).await.is_err());
    }

    #[test]
    fn frontend_status_mirrors_outcome() {
        let credential_id = Uuid::new_v4();
        let status = Status::Complete(Outcome::Success { credential_id });
        let frontend: openid4vci_frontend::Status = (&status).into();
        assert_eq!(
            frontend,
            openid4vci_frontend::Status::Complete(openid4vci_frontend::Outcome::Success {
                credential_id: credential_id.to_string()
            })
        );
    }
}
