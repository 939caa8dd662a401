// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Environment-driven client settings.
//!
//! Hosts that do not wire settings programmatically can derive them from the
//! process environment. Identity values that only describe the device fall
//! back to `unknown`; the endpoint, application id and subscription key are
//! required.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::http::ClientSettings;

/// Base URL of the remote configuration API.
const ENV_BASE_URL: &str = "RC_BASE_URL";
/// Application identifier.
const ENV_APP_ID: &str = "RC_APP_ID";
/// Subscription key sent in the API key header.
const ENV_SUBSCRIPTION_KEY: &str = "RC_SUBSCRIPTION_KEY";
/// Device model reported to the backend.
const ENV_DEVICE_MODEL: &str = "RC_DEVICE_MODEL";
/// Operating system version reported to the backend.
const ENV_OS_VERSION: &str = "RC_OS_VERSION";
/// Host application name.
const ENV_APP_NAME: &str = "RC_APP_NAME";
/// Host application version.
const ENV_APP_VERSION: &str = "RC_APP_VERSION";
/// Requested polling interval in seconds.
const ENV_POLL_INTERVAL: &str = "RC_POLL_INTERVAL_SECONDS";
/// Allows `http://` base URLs.
const ENV_ALLOW_PLAINTEXT: &str = "RC_ALLOW_PLAINTEXT";
/// Optional transport timeout in seconds.
const ENV_REQUEST_TIMEOUT: &str = "RC_REQUEST_TIMEOUT_SECONDS";

/// Placeholder reported for device metadata that was not configured.
const UNKNOWN: &str = "unknown";
/// Polling interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL_SECONDS: i64 = 60;

/// Errors raised when required settings are absent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
}

/// Settings captured from the environment.
#[derive(Debug, Clone)]
pub struct ClientEnv {
    pub base_url: Option<String>,
    pub app_id: Option<String>,
    pub subscription_key: Option<String>,
    pub device_model: String,
    pub os_version: String,
    pub app_name: String,
    pub app_version: String,
    /// Requested interval; the poller clamps it.
    pub poll_interval_seconds: i64,
    pub allow_plaintext: bool,
    pub request_timeout: Option<Duration>,
}

impl ClientEnv {
    /// Builds settings from the current process environment.
    pub fn from_os_env() -> Self {
        Self::from_env_iter(env::vars())
    }

    /// Builds settings from an iterator of key/value pairs (typically for tests).
    pub fn from_env_iter<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |name: &str| map.get(name).and_then(|value| sanitize_non_empty(value));
        let or_unknown = |name: &str| get(name).unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            base_url: get(ENV_BASE_URL),
            app_id: get(ENV_APP_ID),
            subscription_key: get(ENV_SUBSCRIPTION_KEY),
            device_model: or_unknown(ENV_DEVICE_MODEL),
            os_version: or_unknown(ENV_OS_VERSION),
            app_name: or_unknown(ENV_APP_NAME),
            app_version: or_unknown(ENV_APP_VERSION),
            poll_interval_seconds: get(ENV_POLL_INTERVAL)
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS),
            allow_plaintext: parse_bool(get(ENV_ALLOW_PLAINTEXT).as_deref(), false),
            request_timeout: get(ENV_REQUEST_TIMEOUT)
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|seconds| *seconds > 0)
                .map(Duration::from_secs),
        }
    }

    /// Converts the captured values into [`ClientSettings`].
    pub fn to_settings(&self) -> Result<ClientSettings, ConfigError> {
        let required = |value: &Option<String>, name: &'static str| {
            value.clone().ok_or(ConfigError::Missing(name))
        };
        Ok(ClientSettings {
            base_url: required(&self.base_url, ENV_BASE_URL)?,
            app_id: required(&self.app_id, ENV_APP_ID)?,
            subscription_key: required(&self.subscription_key, ENV_SUBSCRIPTION_KEY)?,
            device_model: self.device_model.clone(),
            os_version: self.os_version.clone(),
            app_name: self.app_name.clone(),
            app_version: self.app_version.clone(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            allow_plaintext: self.allow_plaintext,
            request_timeout: self.request_timeout,
        })
    }
}

/// Helper trimming whitespace and discarding empty values.
fn sanitize_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses boolean values from strings, falling back to the provided default.
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|s| s.trim().to_ascii_lowercase()) {
        Some(ref v) if ["1", "true", "t", "yes", "y"].contains(&v.as_str()) => true,
        Some(ref v) if ["0", "false", "f", "no", "n"].contains(&v.as_str()) => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_BASE_URL, "https://config.example.com"),
            (ENV_APP_ID, "app-1"),
            (ENV_SUBSCRIPTION_KEY, " sub-key \n"),
        ]
    }

    #[test]
    fn client_env_defaults() {
        let env = ClientEnv::from_env_iter::<Vec<(String, String)>, _, _>(vec![]);
        assert!(env.base_url.is_none());
        assert_eq!(env.device_model, UNKNOWN);
        assert_eq!(env.app_version, UNKNOWN);
        assert_eq!(env.poll_interval_seconds, DEFAULT_POLL_INTERVAL_SECONDS);
        assert!(!env.allow_plaintext);
        assert!(env.request_timeout.is_none());
    }

    #[test]
    fn client_env_honours_overrides() {
        let mut vars = required_vars();
        vars.extend([
            (ENV_DEVICE_MODEL, "pixel-8"),
            (ENV_OS_VERSION, "14"),
            (ENV_APP_NAME, "demo"),
            (ENV_APP_VERSION, "2.1.0"),
            (ENV_POLL_INTERVAL, "300"),
            (ENV_ALLOW_PLAINTEXT, "yes"),
            (ENV_REQUEST_TIMEOUT, "15"),
        ]);
        let settings = ClientEnv::from_env_iter(vars)
            .to_settings()
            .expect("settings should build");
        assert_eq!(settings.base_url, "https://config.example.com");
        assert_eq!(settings.subscription_key, "sub-key");
        assert_eq!(settings.device_model, "pixel-8");
        assert_eq!(settings.os_version, "14");
        assert_eq!(settings.app_name, "demo");
        assert_eq!(settings.app_version, "2.1.0");
        assert_eq!(settings.sdk_version, env!("CARGO_PKG_VERSION"));
        assert!(settings.allow_plaintext);
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn poll_interval_keeps_negative_values_for_the_poller_to_clamp() {
        let env = ClientEnv::from_env_iter([(ENV_POLL_INTERVAL, "-5")]);
        assert_eq!(env.poll_interval_seconds, -5);

        let env = ClientEnv::from_env_iter([(ENV_POLL_INTERVAL, "soon")]);
        assert_eq!(env.poll_interval_seconds, DEFAULT_POLL_INTERVAL_SECONDS);
    }

    #[test]
    fn to_settings_reports_missing_required_values() {
        for missing in [ENV_BASE_URL, ENV_APP_ID, ENV_SUBSCRIPTION_KEY] {
            let vars = required_vars()
                .into_iter()
                .map(|(k, v)| if k == missing { (k, "  ") } else { (k, v) });
            let err = ClientEnv::from_env_iter(vars)
                .to_settings()
                .expect_err("blank value counts as missing");
            assert_eq!(err, ConfigError::Missing(missing));
        }
    }

    #[test]
    fn parse_bool_permits_common_variants() {
        assert!(parse_bool(Some("true"), false));
        assert!(parse_bool(Some("Yes"), false));
        assert!(!parse_bool(Some("0"), true));
        assert!(parse_bool(Some("maybe"), true));
        assert!(!parse_bool(None, false));
    }
}
