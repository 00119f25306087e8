use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Attribute names of the demo supply-chain access credential.
pub const DEFAULT_CREDENTIAL_ATTRIBUTES: [&str; 3] =
    ["access_requester", "access_granter", "resource_owner"];

/// Configuration for a single persona wallet.
#[derive(Deserialize, Debug, Clone)]
pub struct WalletConfig {
    /// Label announced on connections and invitations.
    pub label: String,

    /// Invitation URL of the mediator this wallet routes through, if any.
    #[serde(default)]
    pub mediator_invitation_url: Option<String>,

    /// Path to the ledger genesis transactions file.
    #[serde(default)]
    pub genesis_path: Option<PathBuf>,

    /// Seed for the wallet's public DID.
    #[serde(default)]
    pub public_did_seed: Option<String>,

    /// Directory holding the wallet's preference and credential files.
    pub storage_dir: PathBuf,

    #[serde(default)]
    pub refresh: RefreshIntervals,

    /// Attributes of the credential definition registered at startup.
    #[serde(default = "default_credential_attributes")]
    pub credential_attributes: Vec<String>,
}

fn default_credential_attributes() -> Vec<String> {
    DEFAULT_CREDENTIAL_ATTRIBUTES
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

/// Cadence at which UI-bound snapshots are republished.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RefreshIntervals {
    connections_ms: u64,
    messages_ms: u64,
}

impl RefreshIntervals {
    pub fn connections(&self) -> Duration {
        Duration::from_millis(self.connections_ms)
    }

    pub fn messages(&self) -> Duration {
        Duration::from_millis(self.messages_ms)
    }
}

impl Default for RefreshIntervals {
    fn default() -> Self {
        Self {
            connections_ms: 3000,
            messages_ms: 2000,
        }
    }
}

/// A url that is always a base (can be safely join()'ed with further path elements without
/// mangling).
#[derive(Deserialize, Debug, Clone, Hash, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct BaseUrl(Url);

impl std::ops::Deref for BaseUrl {
    type Target = Url;

    fn deref(&self) -> &Url {
        &self.0
    }
}

impl std::fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for BaseUrl {
    type Error = url::ParseError;

    fn try_from(mut url: String) -> Result<Self, Self::Error> {
        // Make URL a base.
        if !url.ends_with('/') {
            url += "/"
        }
        url.parse().map(Self)
    }
}

impl std::str::FromStr for BaseUrl {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.to_owned().try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_joins_without_mangling() {
        let base: BaseUrl = "https://issuer.example.com/tenant".parse().unwrap();
        let joined = base.join("token").unwrap();
        assert_eq!(joined.as_str(), "https://issuer.example.com/tenant/token");
    }

    #[test]
    fn refresh_defaults_match_demo_cadence() {
        let refresh = RefreshIntervals::default();
        assert_eq!(refresh.connections(), Duration::from_millis(3000));
        assert_eq!(refresh.messages(), Duration::from_millis(2000));
    }
}
