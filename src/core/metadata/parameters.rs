use std::collections::HashMap;

use anyhow::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use url::Url;

use crate::core::credential_format::CredentialFormat;
use crate::core::object::TypedParameter;

/// `token_endpoint` member of the issuer metadata.
#[derive(Debug, Clone)]
pub struct TokenEndpoint(pub Url);

impl TypedParameter for TokenEndpoint {
    const KEY: &'static str = "token_endpoint";
}

impl TryFrom<Json> for TokenEndpoint {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<TokenEndpoint> for Json {
    fn from(value: TokenEndpoint) -> Json {
        Json::String(value.0.to_string())
    }
}

/// `credential_endpoint` member of the issuer metadata.
#[derive(Debug, Clone)]
pub struct CredentialEndpoint(pub Url);

impl TypedParameter for CredentialEndpoint {
    const KEY: &'static str = "credential_endpoint";
}

impl TryFrom<Json> for CredentialEndpoint {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<CredentialEndpoint> for Json {
    fn from(value: CredentialEndpoint) -> Json {
        Json::String(value.0.to_string())
    }
}

/// `authorization_server` member of the issuer metadata.
#[derive(Debug, Clone)]
pub struct AuthorizationServer(pub String);

impl TypedParameter for AuthorizationServer {
    const KEY: &'static str = "authorization_server";
}

impl TryFrom<Json> for AuthorizationServer {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<AuthorizationServer> for Json {
    fn from(value: AuthorizationServer) -> Json {
        Json::String(value.0)
    }
}

/// `credential_configurations_supported` member of the issuer metadata.
#[derive(Debug, Clone, Default)]
pub struct CredentialConfigurationsSupported(pub HashMap<String, CredentialConfiguration>);

impl TypedParameter for CredentialConfigurationsSupported {
    const KEY: &'static str = "credential_configurations_supported";
}

impl TryFrom<Json> for CredentialConfigurationsSupported {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<CredentialConfigurationsSupported> for Json {
    fn from(value: CredentialConfigurationsSupported) -> Json {
        serde_json::to_value(value.0).unwrap_or(Json::Null)
    }
}

/// A single entry of `credential_configurations_supported`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<CredentialFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(
        rename = "credential_definition",
        skip_serializing_if = "Option::is_none"
    )]
    pub credential_definition: Option<Json>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<Vec<CredentialDisplay>>,
}

/// How an issuer suggests rendering a credential.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialDisplay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<LogoInfo>,

    #[serde(rename = "background_color", skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    #[serde(rename = "text_color", skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogoInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(rename = "alt_text", skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}
