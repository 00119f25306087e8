use anyhow::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::config::BaseUrl;
use crate::core::object::TypedParameter;
use crate::utils::NonEmptyVec;

/// `credential_issuer` member of the Credential Offer object.
#[derive(Debug, Clone)]
pub struct CredentialIssuer(pub BaseUrl);

impl TypedParameter for CredentialIssuer {
    const KEY: &'static str = "credential_issuer";
}

impl TryFrom<Json> for CredentialIssuer {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        let url: String = serde_json::from_value(value)?;
        Ok(Self(BaseUrl::try_from(url)?))
    }
}

impl From<CredentialIssuer> for Json {
    fn from(value: CredentialIssuer) -> Json {
        Json::String(value.0.to_string())
    }
}

/// `credential_configuration_ids` member of the Credential Offer object.
///
/// The offer names at least one configuration from the issuer's metadata.
#[derive(Debug, Clone)]
pub struct CredentialConfigurationIds(pub NonEmptyVec<String>);

impl TypedParameter for CredentialConfigurationIds {
    const KEY: &'static str = "credential_configuration_ids";
}

impl TryFrom<Json> for CredentialConfigurationIds {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<CredentialConfigurationIds> for Json {
    fn from(value: CredentialConfigurationIds) -> Json {
        Json::Array(
            value
                .0
                .iter()
                .cloned()
                .map(Json::String)
                .collect(),
        )
    }
}

/// `grants` member of the Credential Offer object.
///
/// Grant types this library does not know about stay in the untyped object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grants {
    #[serde(
        rename = "urn:ietf:params:oauth:grant-type:pre-authorized_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub pre_authorized_code: Option<PreAuthorizedCodeGrant>,

    #[serde(rename = "authorization_code", skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<AuthorizationCodeGrant>,
}

impl TypedParameter for Grants {
    const KEY: &'static str = "grants";
}

impl TryFrom<Json> for Grants {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map_err(Into::into)
    }
}

impl From<Grants> for Json {
    fn from(value: Grants) -> Json {
        serde_json::to_value(value).unwrap_or(Json::Null)
    }
}

/// Pre-authorized code grant parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAuthorizedCodeGrant {
    #[serde(rename = "pre-authorized_code")]
    pub pre_authorized_code: String,

    /// Present when the issuer requires a transaction code alongside the token request.
    #[serde(rename = "tx_code", skip_serializing_if = "Option::is_none")]
    pub tx_code: Option<TxCode>,
}

/// Description of the transaction code an issuer expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxCode {
    #[serde(rename = "input_mode", skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Authorization code grant parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeGrant {
    #[serde(rename = "issuer_state", skip_serializing_if = "Option::is_none")]
    pub issuer_state: Option<String>,
}
