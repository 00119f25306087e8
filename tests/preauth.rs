use std::sync::Arc;

use http::StatusCode;
use openid4vci::core::credential_format::CredentialFormat;
use openid4vci::holder::session::{Outcome, Status};
use openid4vci::holder::store::{CredentialStore, MemoryCredentialStore};
use openid4vci::holder::{Holder, IssuanceError};
use openid4vci::testing::StaticHttpClient;
use serde_json::json;

const ISSUER: &str = "https://issuer.example.com";
const CONFIGURATION_ID: &str = "org.example.AccessCredential";
const PRE_AUTHORIZED_CODE: &str = "oaKazRN8I0IbtZ0C7JuMn5";

fn offer_object(with_grant: bool) -> serde_json::Value {
    let mut offer = json!({
        "credential_issuer": ISSUER,
        "credential_configuration_ids": [CONFIGURATION_ID],
    });
    if with_grant {
        offer["grants"] = json!({
            "urn:ietf:params:oauth:grant-type:pre-authorized_code": {
                "pre-authorized_code": PRE_AUTHORIZED_CODE
            }
        });
    }
    offer
}

fn offer_url(with_grant: bool) -> String {
    format!(
        "openid-credential-offer://?{}",
        serde_urlencoded::to_string([("credential_offer", offer_object(with_grant).to_string())])
            .unwrap()
    )
}

fn issuer_metadata() -> serde_json::Value {
    // No token_endpoint: the holder must derive <issuer>/token itself.
    json!({
        "credential_issuer": ISSUER,
        "credential_endpoint": format!("{ISSUER}/credential"),
        "credential_configurations_supported": {
            CONFIGURATION_ID: {
                "format": "jwt_vc_json",
                "display": [{"name": "Access Credential", "locale": "en-US"}]
            }
        }
    })
}

fn issuer_routes() -> StaticHttpClient {
    StaticHttpClient::new()
        .with(
            "/.well-known/openid-credential-issuer",
            StatusCode::OK,
            issuer_metadata(),
        )
        .with(
            "/token",
            StatusCode::OK,
            json!({
                "access_token": "czZCaGRSa3F0MzpnWDFmQmF0M2JW",
                "token_type": "bearer",
                "expires_in": 86400,
                "c_nonce": "tZignsnFbp"
            }),
        )
        .with(
            "/credential",
            StatusCode::OK,
            json!({
                "credential": "eyJhbGciOiJFUzI1NiJ9..sig",
                "format": "jwt_vc_json"
            }),
        )
}

fn holder(http: Arc<StaticHttpClient>, store: Arc<MemoryCredentialStore>) -> Holder {
    Holder::builder()
        .with_http_client(http)
        .with_credential_store(store)
        .build()
        .unwrap()
}

#[tokio::test]
async fn pre_authorized_flow_end_to_end() {
    let http = Arc::new(issuer_routes());
    let store = Arc::new(MemoryCredentialStore::default());
    let holder = holder(http.clone(), store.clone());

    let credential = holder.receive_credential(&offer_url(true)).await.unwrap();

    assert_eq!(credential.format, CredentialFormat::JwtVcJson);
    assert_eq!(credential.credential_configuration_id, CONFIGURATION_ID);
    assert_eq!(credential.issuer.as_str(), "https://issuer.example.com/");
    assert_eq!(credential.raw_credential, r#""eyJhbGciOiJFUzI1NiJ9..sig""#);

    assert_eq!(store.all().await.unwrap(), vec![credential.clone()]);
    assert_eq!(
        holder.credential(credential.id).await.unwrap(),
        Some(credential)
    );

    // One linear pass: metadata, token, credential.
    let requests = http.requests().await;
    let paths: Vec<_> = requests.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        ["/.well-known/openid-credential-issuer", "/token", "/credential"]
    );

    let token_body = String::from_utf8(requests[1].body.clone()).unwrap();
    assert!(token_body
        .contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Apre-authorized_code"));
    assert!(token_body.contains(&format!("pre-authorized_code={PRE_AUTHORIZED_CODE}")));

    assert_eq!(
        requests[2].authorization.as_deref(),
        Some("Bearer czZCaGRSa3F0MzpnWDFmQmF0M2JW")
    );
}

#[tokio::test]
async fn split_flow_reports_terminal_status() {
    let http = Arc::new(issuer_routes());
    let holder = holder(http, Arc::new(MemoryCredentialStore::default()));

    let session_id = holder.begin(&offer_url(true)).await.unwrap();
    assert_eq!(
        holder.poll_status(session_id).await.unwrap(),
        Status::OfferReceived
    );

    let credential = holder.accept(session_id, None).await.unwrap();

    match holder.poll_status(session_id).await.unwrap() {
        Status::Complete(Outcome::Success { credential_id }) => {
            assert_eq!(credential_id, credential.id)
        }
        status => panic!("unexpected status: {status:?}"),
    }
}

#[tokio::test]
async fn offer_by_reference_is_fetched() {
    let http = Arc::new(issuer_routes().with(
        "/offers/1",
        StatusCode::OK,
        offer_object(true),
    ));
    let store = Arc::new(MemoryCredentialStore::default());
    let holder = holder(http.clone(), store.clone());

    let url = format!(
        "https://wallet.example.com/redeem?{}",
        serde_urlencoded::to_string([(
            "credential_offer_uri",
            format!("{ISSUER}/offers/1")
        )])
        .unwrap()
    );

    holder.receive_credential(&url).await.unwrap();

    assert_eq!(store.all().await.unwrap().len(), 1);
    assert_eq!(http.requests().await[0].path, "/offers/1");
}

#[tokio::test]
async fn offer_without_pre_authorized_grant_is_refused() {
    let http = Arc::new(issuer_routes());
    let holder = holder(http.clone(), Arc::new(MemoryCredentialStore::default()));

    let session_id = holder.begin(&offer_url(false)).await.unwrap();
    let err = holder.accept(session_id, None).await.unwrap_err();
    assert!(matches!(err, IssuanceError::UnsupportedGrant));

    // Refused before any token exchange.
    assert!(http.requests().await.iter().all(|r| r.path != "/token"));

    assert!(matches!(
        holder.poll_status(session_id).await.unwrap(),
        Status::Complete(Outcome::Error { .. })
    ));
}

#[tokio::test]
async fn token_rejection_surfaces_and_completes_session() {
    let http = Arc::new(
        StaticHttpClient::new()
            .with(
                "/.well-known/openid-credential-issuer",
                StatusCode::OK,
                issuer_metadata(),
            )
            .with(
                "/token",
                StatusCode::BAD_REQUEST,
                json!({"error": "invalid_grant"}),
            ),
    );
    let store = Arc::new(MemoryCredentialStore::default());
    let holder = holder(http, store.clone());

    let session_id = holder.begin(&offer_url(true)).await.unwrap();
    let err = holder.accept(session_id, None).await.unwrap_err();
    assert!(matches!(err, IssuanceError::Token(_)));
    assert!(err.to_string().contains("invalid_grant"));

    assert!(store.all().await.unwrap().is_empty());
    assert!(matches!(
        holder.poll_status(session_id).await.unwrap(),
        Status::Complete(Outcome::Error { .. })
    ));
}

#[tokio::test]
async fn missing_credential_in_response_is_an_error() {
    let http = Arc::new(
        StaticHttpClient::new()
            .with(
                "/.well-known/openid-credential-issuer",
                StatusCode::OK,
                issuer_metadata(),
            )
            .with("/token", StatusCode::OK, json!({"access_token": "t"}))
            .with("/credential", StatusCode::OK, json!({"c_nonce": "n"})),
    );
    let holder = holder(http, Arc::new(MemoryCredentialStore::default()));

    let err = holder.receive_credential(&offer_url(true)).await.unwrap_err();
    assert!(matches!(err, IssuanceError::MissingCredential));
}
