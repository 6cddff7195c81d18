// JSON-over-HTTP plumbing shared by every endpoint client.
//
// Wraps a pre-authenticated `reqwest::Client` (auth headers are default
// headers) and a base URL. Non-success responses are parsed into
// `Error::Api` using whichever error shape the endpoint returned.

use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::Error;

/// Header carrying a client-chosen idempotency token on create calls.
pub const CLIENT_TOKEN_HEADER: &str = "client_token";

// ── Error response shapes ────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorMessage {
    #[serde(default)]
    default_message: Option<String>,
}

/// Union of the vSphere, NSX, VMC and CSP error bodies.
#[derive(Deserialize)]
struct ErrorResponse {
    // vSphere: {"error_type": "...", "messages": [{"default_message": "..."}]}
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    messages: Vec<ErrorMessage>,
    // NSX: {"error_code": 600, "error_message": "..."}
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    error_code: Option<serde_json::Value>,
    // VMC: {"error_messages": ["..."]}
    #[serde(default)]
    error_messages: Vec<String>,
    // CSP: {"message": "..."}
    #[serde(default)]
    message: Option<String>,
}

impl ErrorResponse {
    fn message(self) -> Option<String> {
        self.messages
            .into_iter()
            .find_map(|m| m.default_message)
            .or(self.error_message)
            .or_else(|| self.error_messages.into_iter().next())
            .or(self.message)
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Base URL plus an HTTP client that already carries auth headers.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// `base_url` is normalized to end with `/` so relative joins append.
    pub fn new(http: reqwest::Client, base_url: &Url) -> Self {
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"api/content/library"`) onto the base URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        handle_response(resp).await
    }

    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        handle_response(resp).await
    }

    /// POST with optional query params (e.g. `action=find`) and an optional
    /// idempotency token header.
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: &B,
        client_token: Option<Uuid>,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url} params={params:?}");

        let mut req = self.http.post(url).query(params).json(body);
        if let Some(token) = client_token {
            req = req.header(CLIENT_TOKEN_HEADER, token.to_string());
        }
        handle_response(req.send().await?).await
    }

    /// POST whose response body is ignored.
    pub async fn post_no_response<B: Serialize + Sync>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url} params={params:?}");

        let mut req = self.http.post(url).query(params);
        if let Some(body) = body {
            req = req.json(body);
        }
        handle_empty(req.send().await?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        handle_response(resp).await
    }

    /// PATCH; NSX answers with an empty 200 body.
    pub async fn patch<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("PATCH {url}");

        let resp = self.http.patch(url).json(body).send().await?;
        handle_empty(resp).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        handle_empty(resp).await
    }
}

// ── Response handling ────────────────────────────────────────────────

pub(crate) async fn handle_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, Error> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    } else {
        Err(parse_error(status, resp).await)
    }
}

pub(crate) async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(parse_error(status, resp).await)
    }
}

pub(crate) async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorResponse>(&raw) {
        Ok(err) => {
            let code = err
                .error_type
                .clone()
                .or_else(|| err.error_code.as_ref().map(ToString::to_string));
            Error::Api {
                status: status.as_u16(),
                message: err.message().unwrap_or_else(|| status.to_string()),
                code,
            }
        }
        Err(_) => Error::Api {
            status: status.as_u16(),
            message: if raw.is_empty() {
                status.to_string()
            } else {
                raw
            },
            code: None,
        },
    }
}

/// A header value that is never printed by `Debug`.
pub(crate) fn sensitive_header(value: &str) -> Result<HeaderValue, Error> {
    let mut header = HeaderValue::from_str(value).map_err(|e| Error::Authentication {
        message: format!("invalid token header value: {e}"),
    })?;
    header.set_sensitive(true);
    Ok(header)
}
