use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::prelude::*;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::WalletConfig;

/// Seed of the demo public DID used by every persona.
pub const DEMO_PUBLIC_DID_SEED: &str = "00000000000000000000000AFKIssuer";

/// File the persona's wallet key is kept in, under its storage directory.
pub const PREFERENCES_FILE: &str = "wallet-preferences.json";

/// The simulated supply-chain actors, each running an independent wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persona {
    Transporter,
    FoodProducer,
    FoodProcessor,
}

impl Persona {
    pub const ALL: [Persona; 3] = [
        Persona::Transporter,
        Persona::FoodProducer,
        Persona::FoodProcessor,
    ];

    /// Label announced on this persona's connections and invitations.
    pub fn label(&self) -> &'static str {
        match self {
            Persona::Transporter => "Transporter",
            Persona::FoodProducer => "FoodProducer",
            Persona::FoodProcessor => "FoodProcessor",
        }
    }

    /// Default wallet configuration for this persona, storing its files under
    /// `<storage_root>/<label>`.
    pub fn config(&self, storage_root: impl Into<PathBuf>) -> WalletConfig {
        WalletConfig {
            label: self.label().to_owned(),
            mediator_invitation_url: None,
            genesis_path: None,
            public_did_seed: Some(DEMO_PUBLIC_DID_SEED.to_owned()),
            storage_dir: storage_root.into().join(self.label()),
            refresh: Default::default(),
            credential_attributes: crate::config::DEFAULT_CREDENTIAL_ATTRIBUTES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.label().fmt(f)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    #[serde(rename = "wallet_key", skip_serializing_if = "Option::is_none")]
    wallet_key: Option<String>,
}

/// Generate a fresh wallet key: 32 random bytes, base64-encoded.
pub fn generate_wallet_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64_STANDARD.encode(bytes)
}

/// Load the wallet key from the persona's preference file, generating and
/// persisting one on first use.
pub async fn load_or_create_wallet_key(storage_dir: &Path) -> Result<String> {
    let path = storage_dir.join(PREFERENCES_FILE);

    let mut preferences = match tokio::fs::read(&path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        Err(_) => Preferences::default(),
    };

    if let Some(key) = preferences.wallet_key {
        return Ok(key);
    }

    let key = generate_wallet_key();
    preferences.wallet_key = Some(key.clone());

    tokio::fs::create_dir_all(storage_dir)
        .await
        .context("failed to create wallet storage directory")?;
    let json = serde_json::to_vec_pretty(&preferences).context("failed to encode preferences")?;
    tokio::fs::write(&path, json)
        .await
        .context("failed to write wallet preferences")?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_distinct() {
        let labels: std::collections::HashSet<_> =
            Persona::ALL.iter().map(Persona::label).collect();
        assert_eq!(labels.len(), Persona::ALL.len());
    }

    #[test]
    fn config_separates_persona_storage() {
        let transporter = Persona::Transporter.config("/tmp/wallets");
        let producer = Persona::FoodProducer.config("/tmp/wallets");
        assert_ne!(transporter.storage_dir, producer.storage_dir);
    }

    #[tokio::test]
    async fn wallet_key_is_stable_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let first = load_or_create_wallet_key(dir.path()).await.unwrap();
        let second = load_or_create_wallet_key(dir.path()).await.unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn generated_keys_are_unique() {
        assert_ne!(generate_wallet_key(), generate_wallet_key());
    }
}
