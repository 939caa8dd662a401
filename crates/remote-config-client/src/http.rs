// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client for the remote configuration API.
//!
//! This module owns header construction, status classification and the error
//! taxonomy shared by the configuration and public-key fetches. Every request
//! carries the same identity headers, fixed when the client is built, and
//! every fetch resolves to exactly one [`FetchOutcome`].

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::models::Config;
use crate::public_key::PublicKeyFetcher;

/// Header carrying the subscription key, prefixed with `ras-`.
pub const API_KEY_HEADER: &str = "apikey";
/// Header carrying the application identifier.
pub const APP_ID_HEADER: &str = "ras-app-id";
/// Header carrying the device model.
pub const DEVICE_MODEL_HEADER: &str = "ras-device-model";
/// Header carrying the operating system version.
pub const OS_VERSION_HEADER: &str = "ras-os-version";
/// Header carrying the SDK name.
pub const SDK_NAME_HEADER: &str = "ras-sdk-name";
/// Header carrying the SDK version.
pub const SDK_VERSION_HEADER: &str = "ras-sdk-version";
/// Header carrying the host application name.
pub const APP_NAME_HEADER: &str = "ras-app-name";
/// Header carrying the host application version.
pub const APP_VERSION_HEADER: &str = "ras-app-version";
/// Response header holding the configuration signature.
pub const SIGNATURE_HEADER: &str = "signature";

/// Value reported in the SDK name header.
const SDK_NAME: &str = "Remote Config";
/// Prefix prepended to the subscription key in the API key header.
const API_KEY_PREFIX: &str = "ras-";

/// Result of a single fetch: exactly one of success or failure.
pub type FetchOutcome<T> = Result<T, FetchError>;

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server could not be reached or rejected the request.
    Transport,
    /// The server answered but the payload is unusable.
    Validation,
    /// The client itself was misconfigured.
    Configuration,
}

/// Errors produced by the configuration and public-key fetches.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-2xx status.
    #[error("bad response: status {0}")]
    Status(u16),
    /// The response body is not valid JSON.
    #[error("failed to parse response body: {0}")]
    Parse(#[source] serde_json::Error),
    /// The response body is JSON but misses or mistypes a required field.
    #[error("invalid response payload: {0}")]
    Validation(String),
    /// The base URL uses plaintext HTTP without an explicit opt-in.
    #[error("insecure base url requires explicit opt-in: {0}")]
    InsecureUrl(String),
    /// A configured value cannot be carried in the named header.
    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),
}

impl FetchError {
    /// Returns the coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Status(_) => ErrorKind::Transport,
            Self::Parse(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::InsecureUrl(_) | Self::InvalidHeader(_) => ErrorKind::Configuration,
        }
    }

    /// `true` when the server was unreachable or rejected the request.
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// `true` when the server answered with an unusable payload.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// HTTP status of the rejected response, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

/// Identity and transport settings fixed for the lifetime of a client.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Scheme and host of the remote configuration API, optionally with a path prefix.
    pub base_url: String,
    /// Application identifier scoping the configuration resource.
    pub app_id: String,
    /// Subscription key sent in the API key header.
    pub subscription_key: String,
    /// Device model reported to the backend.
    pub device_model: String,
    /// Operating system version reported to the backend.
    pub os_version: String,
    /// Host application name.
    pub app_name: String,
    /// Host application version.
    pub app_version: String,
    /// Version of this SDK.
    pub sdk_version: String,
    /// Whether plaintext (HTTP) endpoints are allowed.
    pub allow_plaintext: bool,
    /// Optional transport timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
}

/// Unclassified response to a GET on an API path.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Status returned by the server.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Fully buffered response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Fails with [`FetchError::Status`] unless the status is 2xx.
    pub fn ensure_success(&self) -> Result<(), FetchError> {
        classify_status(self.status)
    }

    /// Returns a header value as a string when present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Issues a GET for a path relative to the API base URL.
///
/// Implementations attach the identity headers but do not classify the
/// status; callers decide what a non-2xx answer means.
#[async_trait]
pub trait PathFetcher: Send + Sync {
    async fn fetch_path(&self, path: &str) -> Result<RawResponse, FetchError>;
}

/// Client for the remote configuration API.
///
/// Cloning is cheap: clones share the connection pool and the immutable
/// header map, so concurrent fetches never share in-flight state.
#[derive(Debug, Clone)]
pub struct ConfigApiClient {
    /// Underlying HTTP client (shared across requests).
    client: Client,
    /// Base URL without a trailing slash.
    base_url: String,
    /// Application identifier used in the configuration path.
    app_id: String,
    /// Identity headers attached to every request.
    headers: HeaderMap,
}

impl ConfigApiClient {
    /// Builds a client from the supplied settings.
    ///
    /// Fails when the base URL is plaintext without `allow_plaintext`, or when
    /// a setting cannot be encoded as a header value.
    pub fn new(settings: ClientSettings) -> Result<Self, FetchError> {
        if !settings.allow_plaintext && settings.base_url.starts_with("http://") {
            return Err(FetchError::InsecureUrl(settings.base_url));
        }

        let headers = identity_headers(&settings)?;

        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            app_id: settings.app_id,
            headers,
        })
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the application identifier scoping the configuration resource.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Fetches and decodes the configuration document for this application.
    ///
    /// The `Signature` response header, when present, is attached to the
    /// returned [`Config`] so it can be verified against the public key named
    /// by [`Config::key_id`].
    pub async fn fetch_config(&self) -> FetchOutcome<Config> {
        let response = self.fetch_path(&config_path(&self.app_id)).await?;
        response.ensure_success()?;
        let mut config: Config = decode_document(&response.body)?;
        config.signature = response.header(SIGNATURE_HEADER).map(str::to_string);
        Ok(config)
    }

    /// Fetches the public key registered under `key_id`.
    pub async fn fetch_public_key(&self, key_id: &str) -> FetchOutcome<String> {
        PublicKeyFetcher::new(self).fetch(key_id).await
    }

    /// Runs [`Self::fetch_config`] on `runtime` without blocking the caller.
    pub fn spawn_fetch_config(&self, runtime: &Handle) -> JoinHandle<FetchOutcome<Config>> {
        let client = self.clone();
        runtime.spawn(async move { client.fetch_config().await })
    }

    /// Runs [`Self::fetch_public_key`] on `runtime` without blocking the caller.
    pub fn spawn_fetch_public_key(
        &self,
        runtime: &Handle,
        key_id: impl Into<String>,
    ) -> JoinHandle<FetchOutcome<String>> {
        let client = self.clone();
        let key_id = key_id.into();
        runtime.spawn(async move { client.fetch_public_key(&key_id).await })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl PathFetcher for ConfigApiClient {
    async fn fetch_path(&self, path: &str) -> Result<RawResponse, FetchError> {
        let method = Method::GET;
        let url = self.url_for(path);
        tracing::debug!(
            method = %method,
            url = %url,
            headers = ?redact_headers(&self.headers),
            "remote-config HTTP request"
        );

        let response = self
            .client
            .request(method.clone(), url.as_str())
            .headers(self.headers.clone())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        if status.is_success() {
            tracing::debug!(
                method = %method,
                url = %url,
                status = %status,
                content_length = body.len(),
                "remote-config HTTP response"
            );
        } else {
            tracing::debug!(
                method = %method,
                url = %url,
                status = %status,
                content_length = body.len(),
                body = %body_preview(&body),
                "remote-config HTTP response"
            );
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Path of the configuration resource for `app_id`.
pub fn config_path(app_id: &str) -> String {
    format!("app/{app_id}/config")
}

/// Maps a non-2xx status to [`FetchError::Status`].
fn classify_status(status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status(status.as_u16()))
    }
}

/// Decodes a JSON object in two steps so malformed JSON and structurally
/// invalid JSON surface as different errors.
pub(crate) fn decode_document<T: DeserializeOwned>(body: &[u8]) -> Result<T, FetchError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(FetchError::Parse)?;
    if !value.is_object() {
        return Err(FetchError::Validation("expected a JSON object".to_string()));
    }
    serde_json::from_value(value).map_err(|err| FetchError::Validation(err.to_string()))
}

fn identity_headers(settings: &ClientSettings) -> Result<HeaderMap, FetchError> {
    let api_key = format!("{API_KEY_PREFIX}{}", settings.subscription_key);
    let pairs: [(&'static str, &str); 8] = [
        (API_KEY_HEADER, &api_key),
        (APP_ID_HEADER, &settings.app_id),
        (DEVICE_MODEL_HEADER, &settings.device_model),
        (OS_VERSION_HEADER, &settings.os_version),
        (SDK_NAME_HEADER, SDK_NAME),
        (SDK_VERSION_HEADER, &settings.sdk_version),
        (APP_NAME_HEADER, &settings.app_name),
        (APP_VERSION_HEADER, &settings.app_version),
    ];

    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(name))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}

/// Returns a redacted view of request headers suitable for debug logging.
fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    const SENSITIVE_HEADERS: [&str; 2] = [API_KEY_HEADER, "authorization"];

    headers
        .iter()
        .map(|(name, value)| {
            let lower = name.as_str().to_ascii_lowercase();
            let display = if SENSITIVE_HEADERS.contains(&lower.as_str()) {
                "<redacted>".to_string()
            } else {
                value
                    .to_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| "<non-utf8>".to_string())
            };
            (lower, display)
        })
        .collect()
}

/// Returns a bounded, lossy text preview of a response body for logging.
fn body_preview(body: &[u8]) -> String {
    truncate_preview_text(String::from_utf8_lossy(body))
}

fn truncate_preview_text(text: Cow<'_, str>) -> String {
    const MAX_CHARS: usize = 1024;
    let mut chars = text.chars();
    let mut preview = String::new();
    for _ in 0..MAX_CHARS {
        match chars.next() {
            Some(ch) => preview.push(ch),
            None => return preview,
        }
    }
    if chars.next().is_some() {
        preview.push('…');
    }
    preview
}
