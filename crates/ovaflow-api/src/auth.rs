// Authentication handshakes
//
// vCenter: POST /api/session with HTTP basic auth returns a session token
// sent back as `vmware-api-session-id`.
// Cloud: a CSP refresh token is exchanged for a short-lived access token
// sent back as `csp-auth-token` to both the VMC and NSX endpoints.

use reqwest::header::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::http::{RestClient, handle_empty, parse_error, sensitive_header};
use crate::transport::TransportConfig;

pub const VSPHERE_SESSION_HEADER: &str = "vmware-api-session-id";
pub const CSP_AUTH_HEADER: &str = "csp-auth-token";

/// Public CSP endpoint.
pub const DEFAULT_CSP_URL: &str = "https://console.cloud.vmware.com";

const CSP_AUTHORIZE_PATH: &str = "csp/gateway/am/api/auth/api-tokens/authorize";

/// Short-lived token returned by the CSP exchange.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub expires_in_secs: Option<u64>,
}

#[derive(Deserialize)]
struct AuthorizeResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

fn join(base: &Url, path: &str) -> Result<Url, Error> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let p = format!("{}/", base.path());
        base.set_path(&p);
    }
    Ok(base.join(path)?)
}

// ── vCenter session ──────────────────────────────────────────────────

/// Log in to vCenter and return a client that carries the session header.
pub async fn vsphere_login(
    base_url: &Url,
    username: &str,
    password: &SecretString,
    transport: &TransportConfig,
) -> Result<RestClient, Error> {
    let http = transport.build_client()?;
    let url = join(base_url, "api/session")?;
    debug!("logging in at {url}");

    let resp = http
        .post(url)
        .basic_auth(username, Some(password.expose_secret()))
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Authentication {
            message: format!("vCenter login failed (HTTP {status}): {body}"),
        });
    }

    let token: SecretString = resp.json::<String>().await?.into();
    debug!("vCenter session established");
    session_client(base_url, VSPHERE_SESSION_HEADER, &token, transport)
}

/// End a vCenter session.
pub async fn vsphere_logout(client: &RestClient) -> Result<(), Error> {
    let url = client.url("api/session")?;
    debug!("logging out at {url}");
    let resp = client.http().delete(url).send().await?;
    handle_empty(resp).await
}

// ── CSP token exchange ───────────────────────────────────────────────

/// Exchange a CSP refresh token for an access token.
pub async fn exchange_refresh_token(
    csp_url: &Url,
    refresh_token: &SecretString,
    transport: &TransportConfig,
) -> Result<AccessToken, Error> {
    let http = transport.build_client()?;
    let url = join(csp_url, CSP_AUTHORIZE_PATH)?;
    debug!("exchanging refresh token at {url}");

    let resp = http
        .post(url)
        .form(&[("refresh_token", refresh_token.expose_secret())])
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(match parse_error(status, resp).await {
            Error::Api { message, .. } => Error::Authentication {
                message: format!("refresh token rejected (HTTP {status}): {message}"),
            },
            other => other,
        });
    }

    let body: AuthorizeResponse = resp.json().await?;
    Ok(AccessToken {
        token: SecretString::from(body.access_token),
        expires_in_secs: body.expires_in,
    })
}

// ── Authenticated clients ────────────────────────────────────────────

/// A `RestClient` rooted at `base_url` that sends `token` in `header`.
pub fn session_client(
    base_url: &Url,
    header: &'static str,
    token: &SecretString,
    transport: &TransportConfig,
) -> Result<RestClient, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(header, sensitive_header(token.expose_secret())?);
    let http = transport.build_client_with_headers(headers)?;
    Ok(RestClient::new(http, base_url))
}
