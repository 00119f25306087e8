use anyhow::{bail, Context, Result};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use url::Url;

use super::credential_format::CredentialFormat;
use super::util::{base_request, AsyncHttpClient};

/// A request for a single credential, authorized by a previously issued access token.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialRequest {
    #[serde(rename = "credential_identifier")]
    credential_identifier: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<CredentialFormat>,
}

impl CredentialRequest {
    pub fn new(credential_identifier: String, format: Option<CredentialFormat>) -> Self {
        Self {
            credential_identifier,
            format,
        }
    }

    /// Request the credential from the issuer's credential endpoint.
    pub async fn execute<H: AsyncHttpClient + ?Sized>(
        self,
        credential_endpoint: &Url,
        access_token: &str,
        http_client: &H,
    ) -> Result<CredentialResponse> {
        tracing::debug!(
            credential_identifier = %self.credential_identifier,
            "requesting credential from {credential_endpoint}"
        );

        let body = serde_json::to_vec(&self).context("failed to encode credential request")?;
        let request = base_request()
            .method("POST")
            .uri(credential_endpoint.as_str())
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .context("failed to construct credential request")?;

        let response = http_client
            .execute(request)
            .await
            .context("failed to make credential request")?;

        let status = response.status();
        let Ok(body) = String::from_utf8(response.into_body()) else {
            bail!("failed to parse credential response as UTF-8 (status: {status})")
        };

        if !status.is_success() {
            bail!("credential request was unsuccessful (status: {status}): {body}")
        }

        serde_json::from_str(&body).context("failed to parse credential response as JSON")
    }
}

/// The issuer's response to a credential request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<Json>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<CredentialFormat>,

    #[serde(rename = "c_nonce", skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,

    #[serde(rename = "c_nonce_expires_in", skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_omits_absent_format() {
        let body = serde_json::to_string(&CredentialRequest::new(
            "org.example.AccessCredential".into(),
            None,
        ))
        .unwrap();
        assert_eq!(body, r#"{"credential_identifier":"org.example.AccessCredential"}"#);
    }

    #[test]
    fn request_body_carries_format() {
        let body = serde_json::to_value(CredentialRequest::new(
            "org.example.AccessCredential".into(),
            Some(CredentialFormat::JwtVcJson),
        ))
        .unwrap();
        assert_eq!(body["format"], "jwt_vc_json");
    }

    #[test]
    fn response_credential_may_be_any_json_shape() {
        let response: CredentialResponse =
            serde_json::from_str(r#"{"credential": {"vc": {"type": ["VerifiableCredential"]}}}"#)
                .unwrap();
        assert!(response.credential.unwrap().is_object());

        let response: CredentialResponse =
            serde_json::from_str(r#"{"credential": "eyJhbGciOiJFUzI1NiJ9..sig"}"#).unwrap();
        assert!(response.credential.unwrap().is_string());
    }
}
