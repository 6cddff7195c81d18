#![allow(clippy::unwrap_used)]
// Integration tests for the login handshakes and SDDC discovery.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ovaflow_api::auth::{CSP_AUTH_HEADER, VSPHERE_SESSION_HEADER};
use ovaflow_api::{
    Error, TransportConfig, VmcClient, exchange_refresh_token, session_client, vsphere_login,
};

fn secret(s: &str) -> SecretString {
    s.to_string().into()
}

// ── vCenter session ─────────────────────────────────────────────────

#[tokio::test]
async fn test_vsphere_login_sets_session_header() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/session"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!("session-abc")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/vcenter/datastore"))
        .and(header(VSPHERE_SESSION_HEADER, "session-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let rest = vsphere_login(
        &base_url,
        "cloudadmin@vmc.local",
        &secret("pw"),
        &TransportConfig::default(),
    )
    .await
    .unwrap();

    let datastores: Vec<serde_json::Value> = rest.get("api/vcenter/datastore").await.unwrap();
    assert!(datastores.is_empty());
}

#[tokio::test]
async fn test_vsphere_login_rejected() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error_type": "UNAUTHENTICATED",
            "messages": []
        })))
        .mount(&server)
        .await;

    let result = vsphere_login(
        &base_url,
        "cloudadmin@vmc.local",
        &secret("wrong"),
        &TransportConfig::default(),
    )
    .await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

// ── CSP token exchange ──────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_token_exchange() {
    let server = MockServer::start().await;
    let csp_url = Url::parse(&server.uri()).unwrap();

    Mock::given(method("POST"))
        .and(path("/csp/gateway/am/api/auth/api-tokens/authorize"))
        .and(body_string_contains("refresh_token=refresh-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-xyz",
            "expires_in": 1799,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = exchange_refresh_token(&csp_url, &secret("refresh-123"), &TransportConfig::default())
        .await
        .unwrap();

    assert_eq!(token.token.expose_secret(), "access-xyz");
    assert_eq!(token.expires_in_secs, Some(1799));
}

#[tokio::test]
async fn test_refresh_token_rejected() {
    let server = MockServer::start().await;
    let csp_url = Url::parse(&server.uri()).unwrap();

    Mock::given(method("POST"))
        .and(path("/csp/gateway/am/api/auth/api-tokens/authorize"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "invalid_grant: refresh token is expired"
        })))
        .mount(&server)
        .await;

    let result =
        exchange_refresh_token(&csp_url, &secret("stale"), &TransportConfig::default()).await;

    match result {
        Err(Error::Authentication { message }) => assert!(message.contains("invalid_grant")),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

// ── SDDC discovery ──────────────────────────────────────────────────

#[tokio::test]
async fn test_sddc_lookup_reads_resource_config() {
    let server = MockServer::start().await;
    let vmc_url = Url::parse(&server.uri()).unwrap();

    Mock::given(method("GET"))
        .and(path("/vmc/api/orgs/org-1/sddcs/sddc-1"))
        .and(header(CSP_AUTH_HEADER, "access-xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sddc-1",
            "name": "prod",
            "resource_config": {
                "vc_url": "https://vcenter.sddc-1.vmwarevmc.com/",
                "cloud_username": "cloudadmin@vmc.local",
                "cloud_password": "generated",
                "nsx_api_public_endpoint_url": "https://nsx-1.rp.vmwarevmc.com/vmc/reverse-proxy/api/orgs/org-1/sddcs/sddc-1/sks-nsxt-manager"
            }
        })))
        .mount(&server)
        .await;

    let rest = session_client(
        &vmc_url,
        CSP_AUTH_HEADER,
        &secret("access-xyz"),
        &TransportConfig::default(),
    )
    .unwrap();
    let sddc = VmcClient::new(rest).sddc("org-1", "sddc-1").await.unwrap();

    assert_eq!(sddc.vc_url.host_str(), Some("vcenter.sddc-1.vmwarevmc.com"));
    assert_eq!(sddc.cloud_username, "cloudadmin@vmc.local");
    assert_eq!(sddc.cloud_password.expose_secret(), "generated");
    assert!(sddc.nsx_url.is_some());
}

#[tokio::test]
async fn test_sddc_without_config_is_invalid() {
    let server = MockServer::start().await;
    let vmc_url = Url::parse(&server.uri()).unwrap();

    Mock::given(method("GET"))
        .and(path("/vmc/api/orgs/org-1/sddcs/sddc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "sddc-1" })))
        .mount(&server)
        .await;

    let rest = session_client(
        &vmc_url,
        CSP_AUTH_HEADER,
        &secret("access-xyz"),
        &TransportConfig::default(),
    )
    .unwrap();
    let result = VmcClient::new(rest).sddc("org-1", "sddc-1").await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}
