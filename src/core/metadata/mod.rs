use std::ops::{Deref, DerefMut};

use anyhow::{bail, Context, Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use self::parameters::{
    CredentialConfiguration, CredentialConfigurationsSupported, CredentialEndpoint, TokenEndpoint,
};
use crate::config::BaseUrl;
use crate::core::credential_offer::parameters::CredentialIssuer;
use crate::utils::to_human_readable_string;

use super::object::{ParsingErrorContext, UntypedObject};
use super::util::{base_request, AsyncHttpClient};

pub mod parameters;

/// Well-known path the issuer metadata is published under.
pub const WELL_KNOWN_METADATA_PATH: &str = ".well-known/openid-credential-issuer";

/// Metadata describing a credential issuer.
///
/// Only `credential_issuer` is required; endpoints the issuer omits are derived
/// from the issuer URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "UntypedObject", into = "UntypedObject")]
pub struct IssuerMetadata(UntypedObject, CredentialIssuer);

impl IssuerMetadata {
    /// Retrieve the metadata from the issuer's well-known endpoint.
    pub async fn fetch<H: AsyncHttpClient + ?Sized>(
        credential_issuer: &BaseUrl,
        http_client: &H,
    ) -> Result<Self> {
        let metadata_url = credential_issuer
            .join(WELL_KNOWN_METADATA_PATH)
            .context("unable to construct issuer metadata url")?;

        let request = base_request()
            .method("GET")
            .uri(metadata_url.to_string())
            .body(vec![])
            .context("failed to build issuer metadata request")?;

        let response = http_client
            .execute(request)
            .await
            .context(format!("failed to make issuer metadata request at {metadata_url}"))?;

        let status = response.status();
        let Ok(body) = String::from_utf8(response.into_body()) else {
            bail!("failed to parse issuer metadata response as UTF-8 (status: {status})")
        };

        if !status.is_success() {
            bail!("issuer metadata request was unsuccessful (status: {status}): {body}")
        }

        serde_json::from_str::<UntypedObject>(&body)
            .context("failed to parse issuer metadata response as JSON")?
            .try_into()
            .context("failed to parse issuer metadata")
    }

    pub fn credential_issuer(&self) -> &BaseUrl {
        &self.1 .0
    }

    /// The token endpoint, defaulting to `<credential_issuer>/token`.
    pub fn token_endpoint(&self) -> Result<Url> {
        match self.0.get::<TokenEndpoint>() {
            Some(endpoint) => Ok(endpoint.parsing_error()?.0),
            None => self
                .credential_issuer()
                .join("token")
                .context("unable to derive token endpoint"),
        }
    }

    /// The credential endpoint, defaulting to `<credential_issuer>/credential`.
    pub fn credential_endpoint(&self) -> Result<Url> {
        match self.0.get::<CredentialEndpoint>() {
            Some(endpoint) => Ok(endpoint.parsing_error()?.0),
            None => self
                .credential_issuer()
                .join("credential")
                .context("unable to derive credential endpoint"),
        }
    }

    pub fn credential_configurations_supported(&self) -> Result<CredentialConfigurationsSupported> {
        self.0.get_or_default().parsing_error()
    }

    /// The configuration a credential offer refers to, if the issuer advertises it.
    pub fn configuration(&self, configuration_id: &str) -> Option<CredentialConfiguration> {
        self.credential_configurations_supported()
            .ok()?
            .0
            .remove(configuration_id)
    }

    /// A name suitable for display, falling back to a readable rendering of the id.
    pub fn display_name(&self, configuration_id: &str) -> String {
        self.configuration(configuration_id)
            .and_then(|configuration| {
                configuration
                    .display?
                    .into_iter()
                    .find_map(|display| display.name)
            })
            .unwrap_or_else(|| to_human_readable_string(configuration_id))
    }
}

impl From<IssuerMetadata> for UntypedObject {
    fn from(value: IssuerMetadata) -> Self {
        let mut inner = value.0;
        inner.insert(value.1);
        inner
    }
}

impl TryFrom<UntypedObject> for IssuerMetadata {
    type Error = Error;

    fn try_from(value: UntypedObject) -> std::result::Result<Self, Self::Error> {
        let credential_issuer = value.get().parsing_error()?;
        Ok(Self(value, credential_issuer))
    }
}

impl Deref for IssuerMetadata {
    type Target = UntypedObject;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for IssuerMetadata {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: serde_json::Value) -> IssuerMetadata {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn endpoints_fall_back_to_issuer_paths() {
        let metadata = metadata(json!({
            "credential_issuer": "https://issuer.example.com"
        }));
        assert_eq!(
            metadata.token_endpoint().unwrap().as_str(),
            "https://issuer.example.com/token"
        );
        assert_eq!(
            metadata.credential_endpoint().unwrap().as_str(),
            "https://issuer.example.com/credential"
        );
    }

    #[test]
    fn advertised_endpoints_win() {
        let metadata = metadata(json!({
            "credential_issuer": "https://issuer.example.com",
            "token_endpoint": "https://auth.example.com/oauth/token"
        }));
        assert_eq!(
            metadata.token_endpoint().unwrap().as_str(),
            "https://auth.example.com/oauth/token"
        );
    }

    #[test]
    fn display_name_prefers_issuer_display() {
        let metadata = metadata(json!({
            "credential_issuer": "https://issuer.example.com",
            "credential_configurations_supported": {
                "org.example.AccessCredential": {
                    "format": "jwt_vc_json",
                    "display": [{"name": "Access Credential", "locale": "en-US"}]
                }
            }
        }));
        assert_eq!(
            metadata.display_name("org.example.AccessCredential"),
            "Access Credential"
        );
    }

    #[test]
    fn display_name_falls_back_to_readable_id() {
        let metadata = metadata(json!({
            "credential_issuer": "https://issuer.example.com"
        }));
        assert_eq!(metadata.display_name("access_credential"), "Access Credential");
    }

    #[test]
    fn unknown_members_survive_round_trips() {
        let metadata = metadata(json!({
            "credential_issuer": "https://issuer.example.com",
            "notification_endpoint": "https://issuer.example.com/notify"
        }));
        let value = serde_json::to_value(metadata).unwrap();
        assert_eq!(
            value["notification_endpoint"],
            json!("https://issuer.example.com/notify")
        );
    }
}
