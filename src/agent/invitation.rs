use anyhow::{anyhow, bail, Context, Result};
use base64::prelude::*;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// DIDComm connection invitation message type.
pub const INVITATION_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/invitation";

/// Query parameter carrying the encoded invitation.
const INVITATION_PARAM: &str = "c_i";
/// Out-of-band invitations use a different parameter for the same payload.
const OOB_INVITATION_PARAM: &str = "oob";

/// A connection invitation, exchanged out of band as a base64-encoded JSON
/// payload in an invitation URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInvitation {
    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(rename = "@id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(rename = "serviceEndpoint", skip_serializing_if = "Option::is_none")]
    pub service_endpoint: Option<Url>,

    #[serde(rename = "recipientKeys", skip_serializing_if = "Option::is_none")]
    pub recipient_keys: Option<Vec<String>>,

    #[serde(rename = "routingKeys", skip_serializing_if = "Option::is_none")]
    pub routing_keys: Option<Vec<String>>,

    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
}

impl ConnectionInvitation {
    pub fn new(label: impl Into<String>, service_endpoint: Url, recipient_keys: Vec<String>) -> Self {
        Self {
            message_type: INVITATION_MESSAGE_TYPE.to_owned(),
            id: Uuid::new_v4().to_string(),
            label: Some(label.into()),
            service_endpoint: Some(service_endpoint),
            recipient_keys: Some(recipient_keys),
            routing_keys: None,
            image_url: None,
            did: None,
        }
    }

    /// Encode as an invitation [Url] against the given base endpoint.
    pub fn to_url(&self, base: &Url) -> Result<Url> {
        let json = serde_json::to_vec(self).context("failed to encode invitation")?;
        let encoded = BASE64_URL_SAFE.encode(json);
        let mut url = base.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair(INVITATION_PARAM, &encoded);
        Ok(url)
    }

    /// Parse from an invitation [Url] carrying a `c_i` (or out-of-band `oob`)
    /// query parameter.
    pub fn from_url(url: &Url) -> Result<Self> {
        let (_, encoded) = url
            .query_pairs()
            .find(|(key, _)| key == INVITATION_PARAM || key == OOB_INVITATION_PARAM)
            .ok_or(anyhow!(
                "missing '{INVITATION_PARAM}' query parameter in invitation URL"
            ))?;
        // Query decoding turns '+' into ' '; standard-alphabet payloads need it back.
        let encoded = encoded.replace(' ', "+");
        let json = decode_base64_any(&encoded)?;
        serde_json::from_slice(&json).context("failed to parse invitation JSON")
    }
}

// Invitations in the wild use both base64 alphabets, padded or not.
fn decode_base64_any(encoded: &str) -> Result<Vec<u8>> {
    for engine in [
        &BASE64_URL_SAFE,
        &BASE64_URL_SAFE_NO_PAD,
        &BASE64_STANDARD,
        &BASE64_STANDARD_NO_PAD,
    ] {
        if let Ok(decoded) = engine.decode(encoded) {
            return Ok(decoded);
        }
    }
    bail!("invitation payload is not valid base64")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_round_trips_through_url() {
        let invitation = ConnectionInvitation::new(
            "Transporter",
            "https://mediator.example.com".parse().unwrap(),
            vec!["CsgHAZqJKnZTfsxt2dHGrc7u63ycxYDgnQtFLxXix23b".into()],
        );

        let base: Url = "https://mediator.example.com".parse().unwrap();
        let url = invitation.to_url(&base).unwrap();
        assert!(url.as_str().starts_with("https://mediator.example.com/?c_i="));

        let parsed = ConnectionInvitation::from_url(&url).unwrap();
        assert_eq!(parsed, invitation);
    }

    #[test]
    fn parses_standard_base64_payloads() {
        let invitation = ConnectionInvitation::new(
            "Mediator",
            "https://mediator.example.com".parse().unwrap(),
            vec!["key".into()],
        );
        let encoded = BASE64_STANDARD.encode(serde_json::to_vec(&invitation).unwrap());
        let url: Url = format!("https://mediator.example.com?c_i={encoded}")
            .parse()
            .unwrap();

        assert_eq!(ConnectionInvitation::from_url(&url).unwrap(), invitation);
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let url: Url = "https://mediator.example.com?x=1".parse().unwrap();
        assert!(ConnectionInvitation::from_url(&url).is_err());
    }
}
