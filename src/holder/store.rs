use std::{fmt::Debug, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;

use crate::core::credential_format::CredentialFormat;

/// A credential retrieved through the issuance flow, as kept by the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub id: Uuid,
    pub format: CredentialFormat,
    #[serde(rename = "credential_configuration_id")]
    pub credential_configuration_id: String,
    pub issuer: Url,
    /// The credential payload exactly as received, JSON-encoded.
    #[serde(rename = "raw_credential")]
    pub raw_credential: String,
    #[serde(rename = "issued_at")]
    pub issued_at: DateTime<Utc>,
}

/// Storage interface for retrieved credentials.
#[async_trait]
pub trait CredentialStore: Debug {
    /// Append a credential to the store.
    async fn save(&self, credential: StoredCredential) -> Result<()>;

    /// All stored credentials, oldest first.
    async fn all(&self) -> Result<Vec<StoredCredential>>;

    /// Get a credential by id.
    async fn get(&self, id: Uuid) -> Result<Option<StoredCredential>>;

    /// Delete a credential by id. Returns whether a credential was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// A local in-memory store. Not for production use!
///
/// # Warning
/// Credentials kept in this store are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    store: Arc<Mutex<Vec<StoredCredential>>>,
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save(&self, credential: StoredCredential) -> Result<()> {
        self.store.try_lock()?.push(credential);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<StoredCredential>> {
        Ok(self.store.try_lock()?.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredCredential>> {
        Ok(self
            .store
            .try_lock()?
            .iter()
            .find(|credential| credential.id == id)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut store = self.store.try_lock()?;
        let before = store.len();
        store.retain(|credential| credential.id != id);
        Ok(store.len() != before)
    }
}

/// A store persisting the full credential list as one JSON document.
///
/// Unreadable or missing content degrades to an empty list, so a wallet with a
/// corrupt credential file starts over rather than failing to open.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes writers; readers go to disk.
    write_lock: Arc<Mutex<()>>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::default(),
        }
    }

    async fn load(&self) -> Vec<StoredCredential> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    async fn persist(&self, credentials: &[StoredCredential]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("failed to create credential store directory")?;
        }
        let json = serde_json::to_vec_pretty(credentials)
            .context("failed to encode stored credentials")?;
        tokio::fs::write(&self.path, json)
            .await
            .context("failed to write credential store")
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn save(&self, credential: StoredCredential) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut credentials = self.load().await;
        credentials.push(credential);
        self.persist(&credentials).await
    }

    async fn all(&self) -> Result<Vec<StoredCredential>> {
        Ok(self.load().await)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredCredential>> {
        Ok(self
            .load()
            .await
            .into_iter()
            .find(|credential| credential.id == id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut credentials = self.load().await;
        let before = credentials.len();
        credentials.retain(|credential| credential.id != id);
        if credentials.len() == before {
            return Ok(false);
        }
        self.persist(&credentials).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> StoredCredential {
        StoredCredential {
            id: Uuid::new_v4(),
            format: CredentialFormat::JwtVcJson,
            credential_configuration_id: "org.example.AccessCredential".into(),
            issuer: "https://issuer.example.com".parse().unwrap(),
            raw_credential: r#""eyJhbGciOiJFUzI1NiJ9..sig""#.into(),
            issued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));

        let first = credential();
        let second = credential();
        store.save(first.clone()).await.unwrap();
        store.save(second.clone()).await.unwrap();

        assert_eq!(store.all().await.unwrap(), vec![first.clone(), second.clone()]);
        assert_eq!(store.get(first.id).await.unwrap(), Some(first.clone()));

        assert!(store.delete(first.id).await.unwrap());
        assert!(!store.delete(first.id).await.unwrap());
        assert_eq!(store.all().await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn unreadable_file_degrades_to_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_store_deletes_by_id() {
        let store = MemoryCredentialStore::default();
        let kept = credential();
        let dropped = credential();
        store.save(kept.clone()).await.unwrap();
        store.save(dropped.clone()).await.unwrap();

        assert!(store.delete(dropped.id).await.unwrap());
        assert_eq!(store.all().await.unwrap(), vec![kept]);
    }
}
