//! This library provides a Rust implementation of the wallet (holder) side of
//! [OID4VCI], together with the DIDComm-facing services of a multi-persona
//! demonstration wallet.
//!
//! [OID4VCI]: <https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html>
//!
//! # Holder Usage
//!
//! Credentials are retrieved through the pre-authorized code flow using the
//! [`Holder`] type:
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use openid4vci::core::util::ReqwestClient;
//! use openid4vci::holder::store::FileCredentialStore;
//! use openid4vci::holder::Holder;
//!
//! let holder = Holder::builder()
//!     .with_http_client(Arc::new(ReqwestClient::new()?))
//!     .with_credential_store(Arc::new(FileCredentialStore::new(credentials_path)))
//!     .build()?;
//!
//! // Process a scanned or pasted credential offer URL end to end.
//! let credential = holder.receive_credential(&offer_url).await?;
//!
//! // Or split the flow so the offer can be shown to the user first:
//! let session_id = holder.begin(&offer_url).await?;
//! let credential = holder.accept(session_id, None).await?;
//!
//! // A frontend polls the session while the flow runs elsewhere.
//! let status = holder.poll_status(session_id).await?;
//! ```
//!
//! The flow is linear: parse and resolve the offer, fetch the issuer metadata
//! from its well-known endpoint, exchange the pre-authorized code for an access
//! token, request the credential, and persist it. Each step goes through the
//! [`AsyncHttpClient`] seam so applications can substitute their own HTTP/TLS
//! stack.
//!
//! [`Holder`]: crate::holder::Holder
//! [`AsyncHttpClient`]: crate::core::util::AsyncHttpClient
//!
//! # Wallet Services Usage
//!
//! The supply-chain demo runs three personas (Transporter, FoodProducer,
//! FoodProcessor), each an [`AgentService`] over an external DIDComm agent
//! supplied through the [`Provider`] trait:
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use openid4vci::agent::persona::Persona;
//! use openid4vci::agent::records::MessageKind;
//! use openid4vci::agent::AgentService;
//!
//! let config = Persona::Transporter.config(storage_root);
//! let service = Arc::new(AgentService::new(agent, config));
//!
//! // Opens the wallet and registers the demo schema and credential definition.
//! service.initialize().await?;
//! tokio::spawn(service.clone().run());
//!
//! // Share an invitation, or connect through someone else's.
//! let invitation = service.create_invitation().await?;
//! service.connect(&their_invitation_url).await?;
//!
//! // Message a connection, or offer it a credential.
//! service.send(&connection_id, MessageKind::BasicMessage, Some("hello")).await?;
//! service.send(&connection_id, MessageKind::CredentialOffer, None).await?;
//! ```
//!
//! Incoming credential offers are recorded and accepted automatically, and
//! proof requests are answered with auto-selected credentials, which is the
//! behavior a demonstration wallet wants; see [`AgentService::handle_event`].
//!
//! [`AgentService`]: crate::agent::AgentService
//! [`AgentService::handle_event`]: crate::agent::AgentService::handle_event
//! [`Provider`]: crate::agent::provider::Provider
//!
//! # Protocol Overview
//!
//! Here is a simplified overview of the pre-authorized code flow, referencing
//! the various types and methods implementing it.
//!
//! ## Credential Offer
//!
//! 1. *Issuer creates offer*: The issuer hands the wallet a
//!    `openid-credential-offer://` link, typically via QR code or deep link.
//! 2. *Wallet parses offer*: [`CredentialOffer::from_url`] accepts the link,
//!    carrying the offer inline (`credential_offer`) or by reference
//!    (`credential_offer_uri`); [`CredentialOffer::resolve`] produces the
//!    [`CredentialOfferObject`].
//!
//! All the code related to Credential Offers is located in the
//! [`core::credential_offer`] module.
//!
//! [`CredentialOffer::from_url`]: crate::core::credential_offer::CredentialOffer::from_url
//! [`CredentialOffer::resolve`]: crate::core::credential_offer::CredentialOffer::resolve
//! [`CredentialOfferObject`]: crate::core::credential_offer::CredentialOfferObject
//! [`core::credential_offer`]: crate::core::credential_offer
//!
//! ## Metadata and Token
//!
//! 3. *Wallet fetches metadata*: [`IssuerMetadata::fetch`] retrieves
//!    `/.well-known/openid-credential-issuer`, deriving any endpoints the
//!    issuer omitted.
//! 4. *Token exchange*: [`TokenRequest`] posts the pre-authorized code (and
//!    transaction code, when the issuer demands one) to the token endpoint.
//!
//! [`IssuerMetadata::fetch`]: crate::core::metadata::IssuerMetadata::fetch
//! [`TokenRequest`]: crate::core::token::TokenRequest
//!
//! ## Credential
//!
//! 5. *Credential request*: [`CredentialRequest`] posts the requested
//!    configuration id with the access token.
//! 6. *Persistence*: the response payload is stored verbatim as a
//!    [`StoredCredential`] in the wallet's [`CredentialStore`].
//!
//! [`CredentialRequest`]: crate::core::credential::CredentialRequest
//! [`StoredCredential`]: crate::holder::store::StoredCredential
//! [`CredentialStore`]: crate::holder::store::CredentialStore

pub mod agent;
pub mod config;
pub mod core;
pub mod holder;
pub mod testing;
pub mod utils;

pub use openid4vci_frontend as frontend;
