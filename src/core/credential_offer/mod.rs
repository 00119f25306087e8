use std::ops::{Deref, DerefMut};

use anyhow::{bail, Context, Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use self::parameters::{
    CredentialConfigurationIds, CredentialIssuer, Grants, PreAuthorizedCodeGrant,
};
use crate::config::BaseUrl;
use crate::utils::NonEmptyVec;

use super::object::{ParsingErrorContext, UntypedObject};
use super::util::{base_request, AsyncHttpClient};

pub mod parameters;

/// Scheme used by credential offer deep links.
pub const CREDENTIAL_OFFER_SCHEME: &str = "openid-credential-offer://";

/// A Credential Offer as carried by a deep link or QR code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialOffer {
    #[serde(flatten)]
    pub offer_indirection: OfferIndirection,
}

/// A Credential Offer object, passed by value or by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OfferIndirection {
    #[serde(rename = "credential_offer")]
    ByValue(String),
    #[serde(rename = "credential_offer_uri")]
    ByReference(Url),
}

/// Whether a pasted or scanned URL looks like a credential offer.
pub fn is_credential_offer_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with(CREDENTIAL_OFFER_SCHEME)
        || url.contains("credential_offer=")
        || url.contains("credential_offer_uri=")
}

impl CredentialOffer {
    /// Parse from a deep link, a full URL, or a bare query string.
    ///
    /// ```
    /// # use openid4vci::core::credential_offer::{CredentialOffer, OfferIndirection};
    /// let url = "openid-credential-offer://?credential_offer_uri=https%3A%2F%2Fissuer.example.com%2Foffer%2F1";
    ///
    /// let offer = CredentialOffer::from_url(url).unwrap();
    ///
    /// let OfferIndirection::ByReference(uri) = offer.offer_indirection else {
    ///     panic!("expected offer-by-reference")
    /// };
    /// assert_eq!(uri.as_str(), "https://issuer.example.com/offer/1");
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        let rest = url.strip_prefix(CREDENTIAL_OFFER_SCHEME).unwrap_or(url);
        let query = match rest.find('?') {
            Some(i) => &rest[i + 1..],
            None => rest,
        };
        Self::from_query_params(query)
    }

    /// Parse from urlencoded query parameters.
    pub fn from_query_params(query_params: &str) -> Result<Self> {
        let params: Vec<(String, String)> = serde_urlencoded::from_str(query_params)
            .context("unable to parse Credential Offer from query params")?;

        let mut by_value = None;
        let mut by_reference = None;
        for (key, value) in params {
            match key.as_str() {
                "credential_offer" => by_value = Some(value),
                "credential_offer_uri" => by_reference = Some(value),
                _ => {}
            }
        }

        let offer_indirection = match (by_value, by_reference) {
            (Some(_), Some(_)) => {
                bail!("'credential_offer' and 'credential_offer_uri' are mutually exclusive")
            }
            (Some(json), None) => OfferIndirection::ByValue(json),
            (None, Some(uri)) => OfferIndirection::ByReference(
                uri.parse().context("unable to parse 'credential_offer_uri'")?,
            ),
            (None, None) => {
                bail!("one of 'credential_offer' and 'credential_offer_uri' is required")
            }
        };

        Ok(Self { offer_indirection })
    }

    /// Encode as [Url], using an offer endpoint as a base.
    ///
    /// ```
    /// # use openid4vci::core::credential_offer::{CredentialOffer, OfferIndirection};
    /// # use url::Url;
    /// let offer_endpoint: Url = "openid-credential-offer://".parse().unwrap();
    /// let offer = CredentialOffer {
    ///     offer_indirection: OfferIndirection::ByValue("{}".to_string()),
    /// };
    ///
    /// let url = offer.to_url(offer_endpoint).unwrap();
    ///
    /// assert_eq!(url.as_str(), "openid-credential-offer://?credential_offer=%7B%7D");
    /// ```
    pub fn to_url(self, mut offer_endpoint: Url) -> Result<Url> {
        let query = serde_urlencoded::to_string(self)?;
        offer_endpoint.set_query(Some(&query));
        Ok(offer_endpoint)
    }

    /// Return the inline offer object, or fetch the referenced one.
    pub async fn resolve<H: AsyncHttpClient + ?Sized>(
        self,
        http_client: &H,
    ) -> Result<CredentialOfferObject> {
        match self.offer_indirection {
            OfferIndirection::ByValue(json) => serde_json::from_str::<UntypedObject>(&json)
                .context("failed to parse credential offer as JSON")?
                .try_into()
                .context("failed to parse credential offer object"),
            OfferIndirection::ByReference(url) => {
                let request = base_request()
                    .method("GET")
                    .uri(url.to_string())
                    .body(vec![])
                    .context("failed to build credential offer request")?;

                let response = http_client
                    .execute(request)
                    .await
                    .context(format!("failed to make credential offer request at {url}"))?;

                let status = response.status();

                if !status.is_success() {
                    bail!("credential offer request was unsuccessful (status: {status})")
                }

                serde_json::from_slice::<UntypedObject>(response.body())
                    .context(format!(
                        "failed to parse credential offer response as JSON from {url} (status: {status})"
                    ))?
                    .try_into()
                    .context("failed to parse credential offer object")
            }
        }
    }
}

/// The resolved Credential Offer object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "UntypedObject", into = "UntypedObject")]
pub struct CredentialOfferObject(
    UntypedObject,
    CredentialIssuer,
    CredentialConfigurationIds,
    Option<Grants>,
);

impl CredentialOfferObject {
    pub fn credential_issuer(&self) -> &BaseUrl {
        &self.1 .0
    }

    pub fn credential_configuration_ids(&self) -> &NonEmptyVec<String> {
        &self.2 .0
    }

    pub fn grants(&self) -> Option<&Grants> {
        self.3.as_ref()
    }

    /// The pre-authorized code grant, when the offer carries one.
    pub fn pre_authorized_code_grant(&self) -> Option<&PreAuthorizedCodeGrant> {
        self.3.as_ref()?.pre_authorized_code.as_ref()
    }
}

impl From<CredentialOfferObject> for UntypedObject {
    fn from(value: CredentialOfferObject) -> Self {
        let mut inner = value.0;
        inner.insert(value.1);
        inner.insert(value.2);
        if let Some(grants) = value.3 {
            inner.insert(grants);
        }
        inner
    }
}

impl TryFrom<UntypedObject> for CredentialOfferObject {
    type Error = Error;

    fn try_from(value: UntypedObject) -> std::result::Result<Self, Self::Error> {
        let credential_issuer = value.get().parsing_error()?;
        let credential_configuration_ids = value.get().parsing_error()?;
        let grants = value
            .get::<Grants>()
            .transpose()
            .context("'grants' could not be parsed")?;
        Ok(Self(
            value,
            credential_issuer,
            credential_configuration_ids,
            grants,
        ))
    }
}

impl Deref for CredentialOfferObject {
    type Target = UntypedObject;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for CredentialOfferObject {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
