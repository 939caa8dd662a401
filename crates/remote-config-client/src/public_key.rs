// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Public key resolution.
//!
//! The configuration document names the key that signed it; this module
//! fetches `keys/{key_id}` and validates the key description strictly on its
//! required fields while tolerating anything else the server adds.

use serde::Deserialize;
use tracing::warn;

use crate::http::{decode_document, FetchError, FetchOutcome, PathFetcher};

/// Validated public key description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyRecord {
    /// Identifier of the key.
    pub id: String,
    /// Key material, passed through verbatim.
    pub key: String,
    /// Creation timestamp as sent by the server.
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Path of the key description for `key_id`.
pub fn key_path(key_id: &str) -> String {
    format!("keys/{key_id}")
}

/// Fetches and validates public key descriptions through a [`PathFetcher`].
pub struct PublicKeyFetcher<'a, F: PathFetcher + ?Sized> {
    client: &'a F,
}

impl<'a, F: PathFetcher + ?Sized> PublicKeyFetcher<'a, F> {
    /// Wraps a client that issues the key lookups.
    pub fn new(client: &'a F) -> Self {
        Self { client }
    }

    /// Returns the `key` field of the description registered under `key_id`.
    pub async fn fetch(&self, key_id: &str) -> FetchOutcome<String> {
        self.fetch_record(key_id).await.map(|record| record.key)
    }

    /// Returns the full validated description registered under `key_id`.
    ///
    /// Non-2xx answers fail with [`FetchError::Status`] whatever the body
    /// says. A body that is not JSON fails with [`FetchError::Parse`]; JSON
    /// without a string `id`, `key` or `createdAt` fails with
    /// [`FetchError::Validation`].
    pub async fn fetch_record(&self, key_id: &str) -> FetchOutcome<KeyRecord> {
        let response = self.client.fetch_path(&key_path(key_id)).await?;
        response.ensure_success()?;
        decode_document(&response.body).inspect_err(|err: &FetchError| {
            warn!(key_id, error = %err, "remote-config: rejected public key response");
        })
    }
}
