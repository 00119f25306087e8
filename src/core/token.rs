use anyhow::{bail, Context, Result};
use http::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use url::Url;

use super::util::{base_request, AsyncHttpClient};

/// Grant type identifier of the pre-authorized code flow.
pub const PRE_AUTHORIZED_CODE_GRANT_TYPE: &str =
    "urn:ietf:params:oauth:grant-type:pre-authorized_code";

/// A token request using the pre-authorized code grant.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest {
    grant_type: String,

    #[serde(rename = "pre-authorized_code")]
    pre_authorized_code: String,

    #[serde(rename = "tx_code", skip_serializing_if = "Option::is_none")]
    tx_code: Option<String>,
}

impl TokenRequest {
    pub fn pre_authorized(pre_authorized_code: String, tx_code: Option<String>) -> Self {
        Self {
            grant_type: PRE_AUTHORIZED_CODE_GRANT_TYPE.to_owned(),
            pre_authorized_code,
            tx_code,
        }
    }

    /// Encode as a `application/x-www-form-urlencoded` body.
    pub fn into_x_www_form_urlencoded(self) -> Result<String> {
        serde_urlencoded::to_string(self).context("failed to encode token request")
    }

    /// Exchange the pre-authorized code for an access token.
    pub async fn execute<H: AsyncHttpClient + ?Sized>(
        self,
        token_endpoint: &Url,
        http_client: &H,
    ) -> Result<TokenResponse> {
        tracing::debug!("requesting access token from {token_endpoint}");

        let body = self.into_x_www_form_urlencoded()?.into_bytes();
        let request = base_request()
            .method("POST")
            .uri(token_endpoint.as_str())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .context("failed to construct token request")?;

        let response = http_client
            .execute(request)
            .await
            .context("failed to make token request")?;

        let status = response.status();
        let Ok(body) = String::from_utf8(response.into_body()) else {
            bail!("failed to parse token response as UTF-8 (status: {status})")
        };

        if !status.is_success() {
            bail!("token request was unsuccessful (status: {status}): {body}")
        }

        serde_json::from_str(&body).context("failed to parse token response as JSON")
    }
}

/// The issuer's response to a token request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "access_token")]
    pub access_token: String,

    #[serde(rename = "token_type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(rename = "expires_in", skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    #[serde(rename = "c_nonce", skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,

    #[serde(rename = "c_nonce_expires_in", skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_body_carries_grant_type_and_code() {
        let body = TokenRequest::pre_authorized("oaKazRN8I0IbtZ0C7JuMn5".into(), None)
            .into_x_www_form_urlencoded()
            .unwrap();
        assert!(body.contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Apre-authorized_code"));
        assert!(body.contains("pre-authorized_code=oaKazRN8I0IbtZ0C7JuMn5"));
        assert!(!body.contains("tx_code"));
    }

    #[test]
    fn form_body_carries_tx_code_when_supplied() {
        let body = TokenRequest::pre_authorized("code".into(), Some("493536".into()))
            .into_x_www_form_urlencoded()
            .unwrap();
        assert!(body.contains("tx_code=493536"));
    }

    #[test]
    fn token_response_parses_optional_members() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token": "czZCaGRSa3F0MzpnWDFmQmF0M2JW", "token_type": "bearer", "expires_in": 86400, "c_nonce": "tZignsnFbp"}"#,
        )
        .unwrap();
        assert_eq!(response.access_token, "czZCaGRSa3F0MzpnWDFmQmF0M2JW");
        assert_eq!(response.expires_in, Some(86400));
        assert_eq!(response.c_nonce.as_deref(), Some("tZignsnFbp"));
        assert_eq!(response.c_nonce_expires_in, None);
    }
}
