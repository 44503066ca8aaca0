//! Core HTTP transport
//!
//! Every call re-reads settings from the provider immediately before sending,
//! so base URL and credential edits take effect on the next request without
//! any shared mutable client state. The transport never retries.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::multipart::Form;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::constants::auth::API_KEY_HEADER;
use crate::errors::{snippet, TransportError, TransportResult};
use crate::settings::{Settings, SettingsProvider};

/// Request payload variants supported by the transport
#[derive(Debug, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// JSON document
    Json(serde_json::Value),
    /// URL-encoded form fields
    Form(Vec<(String, String)>),
    /// Multipart form, typically carrying a file
    Multipart(Form),
}

impl RequestBody {
    /// Serialize any value into a JSON body
    pub fn json<T: Serialize>(value: &T) -> TransportResult<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

/// Unparsed response, returned for any status
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body bytes
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body decoded as JSON
    pub fn json<T: DeserializeOwned>(&self) -> TransportResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-2xx response into a typed error
    pub fn error_for_status(self) -> TransportResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                status: self.status,
                body: self.text(),
            })
        }
    }
}

/// Authenticated HTTP transport against the configured base URL
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    settings: Arc<dyn SettingsProvider>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates a transport from a built client and a settings provider
    pub fn new(client: Client, settings: Arc<dyn SettingsProvider>) -> Self {
        Self { client, settings }
    }

    /// Settings provider consulted before every request
    pub fn settings(&self) -> &Arc<dyn SettingsProvider> {
        &self.settings
    }

    /// Sends a request and returns the response for any status
    ///
    /// `headers` are applied last and override the settings-derived ones,
    /// e.g. an explicit `X-API-Key` for a single call.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` on missing configuration, invalid URL or
    /// header values, and network/TLS failures. Non-2xx is not an error here.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        headers: &[(&str, &str)],
    ) -> TransportResult<RawResponse> {
        let settings = self.settings.load().await?;
        let url = resolve_url(&settings, path)?;
        let header_map = build_headers(&settings, headers)?;

        tracing::debug!(
            "{} {} (token: {}, api key: {})",
            method,
            url,
            settings.bearer_token().is_some(),
            settings.api_key().is_some()
        );

        let mut request = self.client.request(method.clone(), url.clone()).headers(header_map);
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Form(fields) => request.form(&fields),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());

        Ok(RawResponse { status, body })
    }

    /// Sends a request and fails on non-2xx with status and body
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        headers: &[(&str, &str)],
    ) -> TransportResult<RawResponse> {
        let response = self.send(method.clone(), path, body, headers).await?;
        if !response.is_success() {
            tracing::warn!(
                "{} {} failed with HTTP {}: {}",
                method,
                path,
                response.status,
                snippet(&response.text())
            );
        }
        response.error_for_status()
    }

    /// GET returning the raw response, for callers that interpret the status
    pub async fn get_raw(&self, path: &str) -> TransportResult<RawResponse> {
        self.send(Method::GET, path, RequestBody::Empty, &[]).await
    }

    /// GET decoding a JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> TransportResult<T> {
        self.request(Method::GET, path, RequestBody::Empty, &[])
            .await?
            .json()
    }

    /// POST a JSON body and decode a JSON response
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> TransportResult<T> {
        self.request(Method::POST, path, RequestBody::json(body)?, &[])
            .await?
            .json()
    }

    /// POST URL-encoded form fields and decode a JSON response
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: Vec<(String, String)>,
    ) -> TransportResult<T> {
        self.request(Method::POST, path, RequestBody::Form(fields), &[])
            .await?
            .json()
    }

    /// PUT a multipart form and decode a JSON response
    pub async fn put_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
        headers: &[(&str, &str)],
    ) -> TransportResult<T> {
        self.request(Method::PUT, path, RequestBody::Multipart(form), headers)
            .await?
            .json()
    }
}

/// Joins the normalized base URL and a relative path
pub fn resolve_url(settings: &Settings, path: &str) -> TransportResult<Url> {
    if !settings.has_base_url() {
        return Err(TransportError::MissingBaseUrl);
    }

    let joined = format!(
        "{}/{}",
        settings.normalized_base_url(),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| TransportError::InvalidUrl {
        url: joined.clone(),
        error: e.to_string(),
    })
}

fn build_headers(settings: &Settings, extra: &[(&str, &str)]) -> TransportResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(token) = settings.bearer_token() {
        headers.insert(AUTHORIZATION, header_value("Authorization", &format!("Bearer {}", token))?);
    }
    if let Some(key) = settings.api_key() {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            header_value(API_KEY_HEADER, key)?,
        );
    }

    for (name, value) in extra {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| TransportError::InvalidHeader {
                name: name.to_string(),
            })?;
        headers.insert(header_name, header_value(name, value)?);
    }

    Ok(headers)
}

fn header_value(name: &str, value: &str) -> TransportResult<HeaderValue> {
    let mut value = HeaderValue::from_str(value).map_err(|_| TransportError::InvalidHeader {
        name: name.to_string(),
    })?;
    value.set_sensitive(true);
    Ok(value)
}
