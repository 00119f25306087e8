use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::core::credential::CredentialRequest;
use crate::core::credential_format::CredentialFormat;
use crate::core::credential_offer::CredentialOffer;
use crate::core::metadata::IssuerMetadata;
use crate::core::token::TokenRequest;
use crate::core::util::AsyncHttpClient;

use self::session::{MemorySessionStore, Outcome, Session, SessionStore, Status};
use self::store::{CredentialStore, StoredCredential};

pub mod session;
pub mod store;

/// Failure modes of the issuance flow.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    /// The offer could not be parsed or resolved.
    #[error("invalid credential offer: {0:#}")]
    Offer(anyhow::Error),

    /// The offer does not carry a pre-authorized code grant.
    #[error("only the pre-authorized code flow is supported")]
    UnsupportedGrant,

    /// Issuer metadata could not be retrieved or was unusable.
    #[error("failed to fetch issuer metadata: {0:#}")]
    Metadata(anyhow::Error),

    /// The token endpoint refused the pre-authorized code.
    #[error("token request failed: {0:#}")]
    Token(anyhow::Error),

    /// The credential endpoint refused the request.
    #[error("credential request failed: {0:#}")]
    Credential(anyhow::Error),

    /// The issuer responded without a credential.
    #[error("no credential in response")]
    MissingCredential,

    /// The retrieved credential could not be persisted.
    #[error("failed to persist credential: {0:#}")]
    Store(anyhow::Error),

    /// The issuance session could not be read or written.
    #[error("failed to track issuance session: {0:#}")]
    Session(anyhow::Error),
}

/// An OpenID4VCI holder.
///
/// Retrieves credentials offered through the pre-authorized code flow and keeps
/// them in a [CredentialStore]. The flow is linear: resolve the offer, fetch the
/// issuer metadata, exchange the pre-authorized code for an access token, then
/// request the credential.
#[derive(Clone)]
pub struct Holder {
    http_client: Arc<dyn AsyncHttpClient + Send + Sync>,
    credential_store: Arc<dyn CredentialStore + Send + Sync>,
    session_store: Arc<dyn SessionStore + Send + Sync>,
}

impl Holder {
    /// Build a new holder.
    pub fn builder() -> HolderBuilder {
        HolderBuilder::default()
    }

    /// Retrieve the current status of an issuance session.
    ///
    /// This should be triggered by a request from the application frontend.
    pub async fn poll_status(&self, id: Uuid) -> Result<Status> {
        self.session_store
            .get_session(id)
            .await
            .map(|session| session.status)
    }

    /// All stored credentials.
    pub async fn credentials(&self) -> Result<Vec<StoredCredential>> {
        self.credential_store.all().await
    }

    /// Get a stored credential by id.
    pub async fn credential(&self, id: Uuid) -> Result<Option<StoredCredential>> {
        self.credential_store.get(id).await
    }

    /// Delete a stored credential by id. Returns whether a credential was removed.
    pub async fn delete_credential(&self, id: Uuid) -> Result<bool> {
        self.credential_store.delete(id).await
    }

    /// Resolve a credential offer URL and open an issuance session.
    ///
    /// Returns the session id. The resolved offer can be inspected through the
    /// session store before the flow is continued with [accept](Self::accept).
    pub async fn begin(&self, url: &str) -> Result<Uuid, IssuanceError> {
        let offer = CredentialOffer::from_url(url).map_err(IssuanceError::Offer)?;
        let offer = offer
            .resolve(self.http_client.as_ref())
            .await
            .map_err(IssuanceError::Offer)?;
        info!(credential_issuer = %offer.credential_issuer(), "resolved credential offer");

        let id = Uuid::new_v4();
        self.session_store
            .initiate(Session {
                id,
                offer,
                status: Status::OfferReceived,
            })
            .await
            .map_err(IssuanceError::Session)?;
        Ok(id)
    }

    /// Run the remainder of the flow for an open session: fetch the issuer
    /// metadata, exchange the pre-authorized code and request the credential.
    ///
    /// The session finishes with a terminal [Outcome] either way.
    pub async fn accept(
        &self,
        id: Uuid,
        tx_code: Option<String>,
    ) -> Result<StoredCredential, IssuanceError> {
        match self.run_exchange(id, tx_code).await {
            Ok(credential) => {
                self.update_status(
                    id,
                    Status::Complete(Outcome::Success {
                        credential_id: credential.id,
                    }),
                )
                .await;
                Ok(credential)
            }
            Err(err) => {
                self.update_status(
                    id,
                    Status::Complete(Outcome::Error {
                        cause: Arc::new(anyhow::anyhow!(err.to_string())),
                    }),
                )
                .await;
                Err(err)
            }
        }
    }

    /// Process a credential offer URL end to end.
    pub async fn receive_credential(&self, url: &str) -> Result<StoredCredential, IssuanceError> {
        self.receive_credential_with_tx_code(url, None).await
    }

    /// Like [receive_credential](Self::receive_credential), with a user-supplied
    /// transaction code forwarded to the token endpoint.
    pub async fn receive_credential_with_tx_code(
        &self,
        url: &str,
        tx_code: Option<String>,
    ) -> Result<StoredCredential, IssuanceError> {
        let id = self.begin(url).await?;
        self.accept(id, tx_code).await
    }

    async fn run_exchange(
        &self,
        id: Uuid,
        tx_code: Option<String>,
    ) -> Result<StoredCredential, IssuanceError> {
        let session = self
            .session_store
            .get_session(id)
            .await
            .map_err(IssuanceError::Session)?;
        let offer = session.offer;

        let metadata = IssuerMetadata::fetch(offer.credential_issuer(), self.http_client.as_ref())
            .await
            .map_err(IssuanceError::Metadata)?;
        self.update_status(id, Status::MetadataFetched).await;

        let grant = offer
            .pre_authorized_code_grant()
            .ok_or(IssuanceError::UnsupportedGrant)?;
        if grant.tx_code.is_some() && tx_code.is_none() {
            warn!("issuer expects a transaction code, but none was supplied");
        }

        let token_endpoint = metadata.token_endpoint().map_err(IssuanceError::Metadata)?;
        let token = TokenRequest::pre_authorized(grant.pre_authorized_code.clone(), tx_code)
            .execute(&token_endpoint, self.http_client.as_ref())
            .await
            .map_err(IssuanceError::Token)?;
        self.update_status(id, Status::TokenReceived).await;

        let configuration_id = offer.credential_configuration_ids()[0].clone();
        let configuration_format = metadata
            .configuration(&configuration_id)
            .and_then(|configuration| configuration.format);

        let credential_endpoint = metadata
            .credential_endpoint()
            .map_err(IssuanceError::Metadata)?;
        let response =
            CredentialRequest::new(configuration_id.clone(), configuration_format.clone())
                .execute(
                    &credential_endpoint,
                    &token.access_token,
                    self.http_client.as_ref(),
                )
                .await
                .map_err(IssuanceError::Credential)?;

        let credential = response
            .credential
            .ok_or(IssuanceError::MissingCredential)?;
        let format = response
            .format
            .or(configuration_format)
            .unwrap_or_else(|| CredentialFormat::Other("unknown".into()));
        let issuer: Url = (**metadata.credential_issuer()).clone();

        let stored = StoredCredential {
            id: Uuid::new_v4(),
            format,
            credential_configuration_id: configuration_id,
            issuer,
            raw_credential: credential.to_string(),
            issued_at: Utc::now(),
        };
        self.credential_store
            .save(stored.clone())
            .await
            .map_err(IssuanceError::Store)?;
        info!(credential_id = %stored.id, "credential received and stored");
        Ok(stored)
    }

    // Session status is advisory frontend state; losing an update is not fatal.
    async fn update_status(&self, id: Uuid, status: Status) {
        if let Err(err) = self.session_store.update_status(id, status).await {
            warn!("failed to update issuance session: {err:#}");
        }
    }
}

/// Builder struct for [Holder].
#[derive(Default)]
pub struct HolderBuilder {
    http_client: Option<Arc<dyn AsyncHttpClient + Send + Sync>>,
    credential_store: Option<Arc<dyn CredentialStore + Send + Sync>>,
    session_store: Option<Arc<dyn SessionStore + Send + Sync>>,
}

impl HolderBuilder {
    /// Build the holder.
    pub fn build(self) -> Result<Holder> {
        let Self {
            http_client,
            credential_store,
            session_store,
        } = self;

        let Some(http_client) = http_client else {
            bail!("http client is required, see `with_http_client`")
        };

        let Some(credential_store) = credential_store else {
            bail!("credential store is required, see `with_credential_store`")
        };

        Ok(Holder {
            http_client,
            credential_store,
            session_store: session_store
                .unwrap_or_else(|| Arc::new(MemorySessionStore::default())),
        })
    }

    /// Set the HTTP client used for all issuer requests.
    pub fn with_http_client(
        mut self,
        http_client: Arc<dyn AsyncHttpClient + Send + Sync>,
    ) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Set the [CredentialStore] retrieved credentials are persisted in.
    pub fn with_credential_store(
        mut self,
        credential_store: Arc<dyn CredentialStore + Send + Sync>,
    ) -> Self {
        self.credential_store = Some(credential_store);
        self
    }

    /// Set the [SessionStore] issuance progress is tracked in.
    ///
    /// Defaults to an in-memory store.
    pub fn with_session_store(
        mut self,
        session_store: Arc<dyn SessionStore + Send + Sync>,
    ) -> Self {
        self.session_store = Some(session_store);
        self
    }
}
